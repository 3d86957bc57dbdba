//! Session context: one project root and handles to its shared resources.
//!
//! Every component takes a `&Session` instead of reaching for process-wide
//! paths. Nothing here caches document contents; components re-read the
//! store on every operation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::io::command_log::CommandLog;
use crate::io::config::{GateConfig, load_config};
use crate::io::ledger::HashLedger;
use crate::io::lock::LockManager;
use crate::io::paths::GatePaths;
use crate::io::scratchpad::Scratchpad;

#[derive(Debug, Clone)]
pub struct Session {
    paths: GatePaths,
    config: GateConfig,
    locks: LockManager,
    ledger: HashLedger,
    scratchpad: Scratchpad,
    command_log: CommandLog,
}

impl Session {
    /// Open `root`, loading `stepgate.toml` if present.
    pub fn open(root: &Path) -> Result<Self> {
        let root = absolute_root(root)?;
        let config = load_config(&GatePaths::new(&root).config_path)?;
        Ok(Self::with_config(root, config))
    }

    pub fn with_config(root: impl Into<PathBuf>, config: GateConfig) -> Self {
        let paths = GatePaths::new(root);
        debug!(root = %paths.root.display(), "opening session");
        Self {
            locks: LockManager::new(&paths.lock_path, &paths.pointer_path),
            ledger: HashLedger::new(&paths.ledger_path, config.integrity.ignore_missing_paths),
            scratchpad: Scratchpad::new(&paths.questions_path, &paths.inconsistencies_path),
            command_log: CommandLog::new(&paths.command_log_path),
            paths,
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.paths.root
    }

    pub fn paths(&self) -> &GatePaths {
        &self.paths
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn ledger(&self) -> &HashLedger {
        &self.ledger
    }

    pub fn scratchpad(&self) -> &Scratchpad {
        &self.scratchpad
    }

    pub fn command_log(&self) -> &CommandLog {
        &self.command_log
    }

    /// Path relative to the root, for messages and scratchpad entries.
    pub fn relative(&self, path: &Path) -> String {
        self.paths.display_relative(path).to_string()
    }
}

fn absolute_root(root: &Path) -> Result<PathBuf> {
    std::path::absolute(root).with_context(|| format!("resolve root {}", root.display()))
}
