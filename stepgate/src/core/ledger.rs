//! Hash ledger line codec and digest helpers.
//!
//! One entry per line: `<timestamp> <path> <hex digest>`. The path is
//! everything between the first and the last space so paths containing
//! spaces survive.

use std::collections::HashMap;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub timestamp: String,
    pub path: PathBuf,
    pub digest: String,
}

impl LedgerEntry {
    pub fn to_line(&self) -> String {
        format!("{} {} {}", self.timestamp, self.path.display(), self.digest)
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Parse one ledger line. Blank and `#` lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<LedgerEntry>, String> {
    let line = line.trim_end();
    if line.trim().is_empty() || line.trim_start().starts_with('#') {
        return Ok(None);
    }
    let (timestamp, rest) = line
        .split_once(' ')
        .ok_or_else(|| format!("malformed ledger line: {line}"))?;
    let (path, digest) = rest
        .rsplit_once(' ')
        .ok_or_else(|| format!("malformed ledger line: {line}"))?;
    if path.is_empty() || digest.is_empty() || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("malformed ledger line: {line}"));
    }
    Ok(Some(LedgerEntry {
        timestamp: timestamp.to_string(),
        path: PathBuf::from(path),
        digest: digest.to_string(),
    }))
}

/// Collapse entries to the most recent digest per path, in first-seen order.
pub fn latest_digests(entries: &[LedgerEntry]) -> Vec<(PathBuf, String)> {
    let mut order: Vec<(PathBuf, String)> = Vec::new();
    let mut index: HashMap<&PathBuf, usize> = HashMap::new();
    for entry in entries {
        match index.get(&entry.path) {
            Some(&slot) => order[slot].1.clone_from(&entry.digest),
            None => {
                index.insert(&entry.path, order.len());
                order.push((entry.path.clone(), entry.digest.clone()));
            }
        }
    }
    order
}
