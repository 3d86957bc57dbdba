//! Canonical on-disk layout under a project root.

use std::path::{Path, PathBuf};

use crate::core::expected;
use crate::core::tree_doc::TreeKind;

/// All canonical paths for a project root.
#[derive(Debug, Clone)]
pub struct GatePaths {
    pub root: PathBuf,
    pub bootstrap_dir: PathBuf,
    pub steps_dir: PathBuf,
    pub expected_dir: PathBuf,
    pub scratchpad_dir: PathBuf,
    pub lock_dir: PathBuf,
    pub questions_path: PathBuf,
    pub inconsistencies_path: PathBuf,
    pub lock_path: PathBuf,
    pub pointer_path: PathBuf,
    pub ledger_path: PathBuf,
    pub command_log_path: PathBuf,
    pub config_path: PathBuf,
}

impl GatePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let scratchpad_dir = root.join("scratchpad");
        let lock_dir = root.join("lock");
        Self {
            bootstrap_dir: root.join("bootstrap"),
            steps_dir: root.join("steps"),
            expected_dir: root.join("expected"),
            questions_path: scratchpad_dir.join("model_thoughts_todo.md"),
            inconsistencies_path: scratchpad_dir.join("inconsistencies_pending.md"),
            lock_path: lock_dir.join(".model_push_lock"),
            pointer_path: lock_dir.join(".current_step.lock"),
            ledger_path: root.join(".checklist_hash_log"),
            command_log_path: root.join("cli").join("command_log.txt"),
            config_path: root.join("stepgate.toml"),
            scratchpad_dir,
            lock_dir,
            root,
        }
    }

    pub fn tree_path(&self, kind: TreeKind) -> PathBuf {
        self.bootstrap_dir.join(kind.file_name())
    }

    pub fn step_path(&self, reference: &str) -> PathBuf {
        self.steps_dir.join(reference)
    }

    pub fn expected_path(&self, number: &str) -> PathBuf {
        self.expected_dir.join(expected::file_name_for(number))
    }

    /// Path relative to the root for display, or the path itself.
    pub fn display_relative<'a>(&self, path: &'a Path) -> std::path::Display<'a> {
        path.strip_prefix(&self.root).unwrap_or(path).display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted() {
        let paths = GatePaths::new("/work");
        assert_eq!(
            paths.tree_path(TreeKind::Maintenance),
            PathBuf::from("/work/bootstrap/000_BOOTSTRAP_FIX_INIT.md")
        );
        assert_eq!(
            paths.expected_path("04"),
            PathBuf::from("/work/expected/EXPECTED_OUTPUT_04.json")
        );
        assert_eq!(paths.lock_path, PathBuf::from("/work/lock/.model_push_lock"));
        assert_eq!(
            paths.display_relative(&paths.step_path("STEP_01__A.md")).to_string(),
            "steps/STEP_01__A.md"
        );
    }
}
