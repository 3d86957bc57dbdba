//! Tree document scanner.
//!
//! The ordered execution tree lives under a single heading. Only checkbox
//! lines inside that section are entries; the rest of the document is prose
//! and is never interpreted.

use crate::core::checklist::{check_line, parse_checkbox};
use crate::core::step_ref::StepRef;
use crate::error::GateError;

pub const TREE_HEADING: &str = "## 🗂 Required Execution Tree";

/// The two mutually exclusive kinds of tree document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
    NewInitiative,
    Maintenance,
}

impl TreeKind {
    pub const ALL: [TreeKind; 2] = [TreeKind::NewInitiative, TreeKind::Maintenance];

    pub fn file_name(self) -> &'static str {
        match self {
            TreeKind::NewInitiative => "NEW_PROJECT_INIT.md",
            TreeKind::Maintenance => "000_BOOTSTRAP_FIX_INIT.md",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TreeKind::NewInitiative => "new initiative",
            TreeKind::Maintenance => "fix/maintenance",
        }
    }
}

/// One declared step in tree order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub checked: bool,
    /// Reference exactly as written. Parsed on demand so a malformed entry
    /// only fails the call that needs it.
    pub reference: String,
    /// Zero-based line index in the source document.
    pub line: usize,
}

impl TreeEntry {
    pub fn step_ref(&self) -> Result<StepRef, GateError> {
        StepRef::parse(&self.reference)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeDocument {
    pub entries: Vec<TreeEntry>,
}

impl TreeDocument {
    pub fn parse(text: &str) -> Result<Self, GateError> {
        let mut lines = text.lines().enumerate();
        if !lines
            .by_ref()
            .any(|(_, line)| line.trim_start().starts_with(TREE_HEADING))
        {
            return Err(GateError::format(format!(
                "tree document has no '{TREE_HEADING}' section"
            )));
        }

        let mut entries = Vec::new();
        for (index, line) in lines {
            if line.trim_start().starts_with("##") {
                break;
            }
            let Some(checkbox) = parse_checkbox(line) else {
                continue;
            };
            let Some(reference) = checkbox.text.split_whitespace().next() else {
                continue;
            };
            entries.push(TreeEntry {
                checked: checkbox.checked,
                reference: reference.to_string(),
                line: index,
            });
        }

        Ok(Self { entries })
    }

    pub fn open_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.checked).count()
    }

    pub fn is_complete(&self) -> bool {
        self.open_count() == 0
    }

    pub fn find(&self, reference: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.reference == reference)
    }
}

/// Return `text` with the open tree entry for `reference` flipped to checked.
///
/// Fails when the entry is absent or already checked: a completion must
/// change exactly one line.
pub fn check_entry(text: &str, reference: &str) -> Result<String, GateError> {
    let tree = TreeDocument::parse(text)?;
    let entry = tree.find(reference).ok_or_else(|| {
        GateError::state(format!("'{reference}' is not declared in the tree document"))
    })?;
    if entry.checked {
        return Err(GateError::state(format!(
            "'{reference}' is already checked in the tree document"
        )));
    }

    let target = entry.line;
    let mut out = String::with_capacity(text.len() + 1);
    for (index, line) in text.lines().enumerate() {
        if index == target {
            let flipped = check_line(line).ok_or_else(|| {
                GateError::state(format!("tree entry for '{reference}' is not open"))
            })?;
            out.push_str(&flipped);
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    if !text.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}
