//! Test-only helpers: scratch workspaces, document builders and fake
//! collaborators.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::tree_doc::{TREE_HEADING, TreeKind};
use crate::io::config::GateConfig;
use crate::io::git::{PublishReport, StatusEntry, VersionControl};
use crate::io::process::{CommandOutput, ProcessRunner};
use crate::session::Session;

/// A tempdir-backed project root with an open session.
pub struct TestWorkspace {
    _temp: TempDir,
    session: Session,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    pub fn with_config(config: GateConfig) -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let session = Session::with_config(temp.path(), config);
        Self {
            _temp: temp,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn root(&self) -> &Path {
        self.session.root()
    }

    /// Write (or overwrite) the tree document of `kind`.
    pub fn write_tree(&self, kind: TreeKind, entries: &[(bool, &str)]) {
        write(&self.session.paths().tree_path(kind), &tree_document(entries));
    }

    pub fn write_step(&self, name: &str, body: &str) -> PathBuf {
        let path = self.session.paths().step_path(name);
        write(&path, body);
        path
    }

    pub fn write_expected(&self, number: &str, json: &str) -> PathBuf {
        let path = self.session.paths().expected_path(number);
        write(&path, json);
        path
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write file");
}

/// Render a tree document with the given `(checked, reference)` entries.
pub fn tree_document(entries: &[(bool, &str)]) -> String {
    let mut text = format!("# Project bootstrap\n\nRead every step in order.\n\n{TREE_HEADING}\n\n");
    for (checked, reference) in entries {
        let mark = if *checked { 'x' } else { ' ' };
        text.push_str(&format!("- [{mark}] {reference}\n"));
    }
    text.push_str("\n## 📎 Notes\n- [ ] not a step\n");
    text
}

/// Render an open step document.
///
/// `items` are `(text, checked)` pairs; `children` are linked as `[ref](./ref)`.
pub fn step_document(items: &[(&str, bool)], children: &[&str], open_question: bool) -> String {
    let mut text = String::from("# STEP 01: Build\n**Parent:** `000_BOOTSTRAP_FIX_INIT.md`\n**Status:** ☐ In Progress\n\n## 📋 Checklist\n");
    for (item, checked) in items {
        let mark = if *checked { 'x' } else { ' ' };
        text.push_str(&format!("- [{mark}] {item}\n"));
    }
    if !children.is_empty() {
        text.push_str("\n## ⬇️ Child steps\n");
        for child in children {
            text.push_str(&format!("- [{child}](./{child})\n"));
        }
    }
    if open_question {
        text.push_str("\n## 📎 Notes\n- ❓ Which database do we target?\n");
    }
    text
}

/// Process runner that succeeds unless the command is listed as failing.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    failing: Vec<String>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn passing() -> Self {
        Self::default()
    }

    pub fn failing(commands: &[&str]) -> Self {
        Self {
            failing: commands.iter().map(ToString::to_string).collect(),
            calls: RefCell::default(),
        }
    }

    /// Every command line run so far, argv joined with spaces.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn respond(&self, command: String) -> CommandOutput {
        let fails = self.failing.contains(&command);
        self.calls.borrow_mut().push(command);
        if fails {
            CommandOutput {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "scripted failure\n".to_string(),
                ..CommandOutput::default()
            }
        } else {
            CommandOutput {
                exit_code: Some(0),
                stdout: "ok\n".to_string(),
                ..CommandOutput::default()
            }
        }
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run_shell(&self, command: &str, _workdir: &Path) -> Result<CommandOutput> {
        Ok(self.respond(command.to_string()))
    }

    fn run_argv(&self, argv: &[String], _workdir: &Path) -> Result<CommandOutput> {
        Ok(self.respond(argv.join(" ")))
    }
}

/// Version control double that records publish calls.
#[derive(Debug, Default)]
pub struct FakeVcs {
    dirty: bool,
    publish_error: Option<String>,
    published: RefCell<Vec<String>>,
}

impl FakeVcs {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn dirty() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    pub fn failing_publish(message: &str) -> Self {
        Self {
            publish_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Commit messages of every successful publish.
    pub fn published(&self) -> Vec<String> {
        self.published.borrow().clone()
    }
}

impl VersionControl for FakeVcs {
    fn uncommitted_changes(&self) -> Result<Vec<StatusEntry>> {
        if self.dirty {
            return Ok(vec![StatusEntry {
                code: " M".to_string(),
                path: "src/lib.rs".to_string(),
            }]);
        }
        Ok(Vec::new())
    }

    fn publish(&self, message: &str) -> Result<PublishReport> {
        if let Some(error) = &self.publish_error {
            return Err(anyhow!("{error}"));
        }
        self.published.borrow_mut().push(message.to_string());
        Ok(PublishReport {
            committed: self.dirty,
            push_output: "Everything up-to-date\n".to_string(),
        })
    }
}
