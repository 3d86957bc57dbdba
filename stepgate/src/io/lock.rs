//! Lock marker and active-step pointer.
//!
//! The lock marker is advisory: its presence is the whole gate state and the
//! reason text is informational. The pointer names the one step document the
//! actor may mutate.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::error::GateError;
use crate::io::store::{read_optional, write_atomic};
use crate::io::timestamp;

const LOCKED_PREFIX: &str = "Locked: ";
const HALTED_PREFIX: &str = "Halted: ";
const TIMESTAMP_PREFIX: &str = "Timestamp: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    /// Written by a failing gate.
    Locked,
    /// Written on request by the actor.
    Halted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockMarker {
    pub kind: LockKind,
    pub reason: String,
    pub timestamp: Option<String>,
}

impl LockMarker {
    fn parse(text: &str) -> Self {
        let mut lines = text.lines();
        let first = lines.next().unwrap_or_default().trim();
        let (kind, reason) = if let Some(reason) = first.strip_prefix(LOCKED_PREFIX) {
            (LockKind::Locked, reason.to_string())
        } else if let Some(reason) = first.strip_prefix(HALTED_PREFIX) {
            (LockKind::Halted, reason.to_string())
        } else {
            // Hand-written marker: keep its text as the reason.
            (LockKind::Locked, text.trim().to_string())
        };
        let timestamp = lines
            .find_map(|line| line.trim().strip_prefix(TIMESTAMP_PREFIX))
            .map(str::to_string);
        Self {
            kind,
            reason,
            timestamp,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LockManager {
    lock_path: PathBuf,
    pointer_path: PathBuf,
}

impl LockManager {
    pub fn new(lock_path: impl Into<PathBuf>, pointer_path: impl Into<PathBuf>) -> Self {
        Self {
            lock_path: lock_path.into(),
            pointer_path: pointer_path.into(),
        }
    }

    /// Write the marker; last writer wins.
    pub fn lock(&self, reason: &str) -> Result<()> {
        info!(reason, "locking");
        self.write_marker(LOCKED_PREFIX, reason)
    }

    /// Write the marker on the actor's request.
    pub fn halt(&self, reason: &str) -> Result<()> {
        info!(reason, "halting");
        self.write_marker(HALTED_PREFIX, reason)
    }

    fn write_marker(&self, prefix: &str, reason: &str) -> Result<()> {
        let reason = reason.trim().replace('\n', " ");
        write_atomic(
            &self.lock_path,
            &format!("{prefix}{reason}\n{TIMESTAMP_PREFIX}{}\n", timestamp()),
        )
    }

    /// Remove the marker. Returns whether one was present.
    pub fn unlock(&self) -> Result<bool> {
        match fs::remove_file(&self.lock_path) {
            Ok(()) => {
                info!("unlocked");
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| format!("remove {}", self.lock_path.display())),
        }
    }

    pub fn current(&self) -> Result<Option<LockMarker>> {
        Ok(read_optional(&self.lock_path)?.map(|text| LockMarker::parse(&text)))
    }

    pub fn is_locked(&self) -> bool {
        self.lock_path.exists()
    }

    /// Fail with [`GateError::Locked`] while the marker exists.
    pub fn assert_unlocked(&self) -> Result<()> {
        match self.current()? {
            Some(marker) => Err(GateError::Locked {
                reason: marker.reason,
            }
            .into()),
            None => Ok(()),
        }
    }

    pub fn set_active(&self, step: &Path) -> Result<()> {
        let step = absolute(step)?;
        debug!(step = %step.display(), "setting active step");
        write_atomic(&self.pointer_path, &format!("{}\n", step.display()))
    }

    pub fn active(&self) -> Result<Option<PathBuf>> {
        Ok(read_optional(&self.pointer_path)?
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .map(PathBuf::from))
    }

    /// Fail with [`GateError::StateViolation`] unless `step` is the active step.
    pub fn assert_is_active(&self, step: &Path) -> Result<()> {
        let Some(active) = self.active()? else {
            return Err(GateError::state("no current step defined").into());
        };
        if absolute(step)? != absolute(&active)? {
            return Err(GateError::state(format!(
                "{} is not the current step (current: {})",
                step.display(),
                active.display()
            ))
            .into());
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("resolve {}", path.display()))
}
