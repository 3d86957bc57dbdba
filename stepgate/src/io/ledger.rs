//! Append-only hash ledger used for tamper detection.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::core::ledger::{LedgerEntry, content_digest, latest_digests, parse_line};
use crate::error::GateError;
use crate::io::store::read_optional;
use crate::io::timestamp;

/// A ledgered document whose bytes no longer match its latest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub path: PathBuf,
    pub recorded: String,
    /// `None` when the document is gone.
    pub current: Option<String>,
}

impl Mismatch {
    pub fn into_error(self) -> GateError {
        GateError::IntegrityViolation {
            path: self.path,
            recorded: self.recorded,
            current: self.current.unwrap_or_else(|| "missing".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub checked: usize,
    pub skipped_missing: usize,
    pub mismatches: Vec<Mismatch>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct HashLedger {
    path: PathBuf,
    ignore_missing_paths: bool,
}

impl HashLedger {
    pub fn new(path: impl Into<PathBuf>, ignore_missing_paths: bool) -> Self {
        Self {
            path: path.into(),
            ignore_missing_paths,
        }
    }

    /// Hash `document` and append `(now, path, digest)`. Returns the digest.
    pub fn record_hash(&self, document: &Path) -> Result<String> {
        let document = std::path::absolute(document)
            .with_context(|| format!("resolve {}", document.display()))?;
        let bytes = fs::read(&document).with_context(|| format!("read {}", document.display()))?;
        let entry = LedgerEntry {
            timestamp: timestamp(),
            path: document,
            digest: content_digest(&bytes),
        };
        debug!(path = %entry.path.display(), digest = %entry.digest, "recording hash");

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        writeln!(file, "{}", entry.to_line())
            .with_context(|| format!("append {}", self.path.display()))?;
        Ok(entry.digest)
    }

    pub fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let Some(text) = read_optional(&self.path)? else {
            return Ok(Vec::new());
        };
        let mut entries = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let parsed = parse_line(line)
                .map_err(|err| anyhow!("{}:{}: {err}", self.path.display(), index + 1))?;
            entries.extend(parsed);
        }
        Ok(entries)
    }

    /// Compare every ledgered document against its most recent digest.
    ///
    /// All mismatches are collected so the report can list them.
    #[instrument(skip_all)]
    pub fn verify_all(&self) -> Result<IntegrityReport> {
        let mut report = IntegrityReport::default();
        for (path, recorded) in latest_digests(&self.entries()?) {
            let current = match fs::read(&path) {
                Ok(bytes) => Some(content_digest(&bytes)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
                Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
            };
            match current {
                None if self.ignore_missing_paths => {
                    debug!(path = %path.display(), "ledgered document missing; skipped");
                    report.skipped_missing += 1;
                }
                Some(ref digest) if *digest == recorded => report.checked += 1,
                current => {
                    warn!(path = %path.display(), "ledgered document changed");
                    report.checked += 1;
                    report.mismatches.push(Mismatch {
                        path,
                        recorded,
                        current,
                    });
                }
            }
        }
        Ok(report)
    }
}
