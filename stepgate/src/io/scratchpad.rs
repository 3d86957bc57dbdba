//! Scratchpad logs on disk. Both must be empty before publishing.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::info;

use crate::core::scratchpad::{LogKind, entries, inconsistency_entry, insert_entry, question_entry};
use crate::io::store::{read_optional, write_atomic};
use crate::io::today;

#[derive(Debug, Clone)]
pub struct Scratchpad {
    questions_path: PathBuf,
    inconsistencies_path: PathBuf,
}

impl Scratchpad {
    pub fn new(questions_path: impl Into<PathBuf>, inconsistencies_path: impl Into<PathBuf>) -> Self {
        Self {
            questions_path: questions_path.into(),
            inconsistencies_path: inconsistencies_path.into(),
        }
    }

    fn path(&self, kind: LogKind) -> &Path {
        match kind {
            LogKind::Questions => &self.questions_path,
            LogKind::Inconsistencies => &self.inconsistencies_path,
        }
    }

    pub fn log_question(&self, question: &str) -> Result<()> {
        let question = question.trim();
        if question.is_empty() {
            bail!("question must not be empty");
        }
        info!(question, "logging question");
        self.append(LogKind::Questions, &question_entry(&today(), question))
    }

    /// Record a failed validation against its originating document.
    pub fn log_inconsistency(&self, file: &str, details: &str) -> Result<()> {
        info!(file, "logging inconsistency");
        self.append(
            LogKind::Inconsistencies,
            &inconsistency_entry(&today(), file, details),
        )
    }

    pub fn pending_questions(&self) -> Result<Vec<String>> {
        self.read(LogKind::Questions)
    }

    pub fn unresolved_inconsistencies(&self) -> Result<Vec<String>> {
        self.read(LogKind::Inconsistencies)
    }

    fn read(&self, kind: LogKind) -> Result<Vec<String>> {
        Ok(read_optional(self.path(kind))?
            .map(|text| entries(&text, kind))
            .unwrap_or_default())
    }

    fn append(&self, kind: LogKind, entry: &str) -> Result<()> {
        let path = self.path(kind);
        let text = read_optional(path)?.unwrap_or_default();
        write_atomic(path, &insert_entry(&text, kind, entry))
    }
}
