//! Step document scanner: checklist items, status line, open questions and
//! child step links.

use crate::core::checklist::parse_checkbox;
use crate::core::step_ref::StepRef;
use crate::error::GateError;

pub const STATUS_PREFIX: &str = "**Status:**";
pub const OPEN_GLYPH: char = '☐';
pub const COMPLETE_GLYPH: char = '✅';
pub const QUESTION_GLYPH: char = '❓';
pub const COMPLETE_STATUS: &str = "**Status:** ✅ Complete";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Open,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub checked: bool,
    pub text: String,
}

/// Typed view of a step document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDocument {
    pub status: Option<StepStatus>,
    pub items: Vec<ChecklistItem>,
    pub has_open_questions: bool,
    /// Child step references in document order, without duplicates.
    pub children: Vec<StepRef>,
}

impl StepDocument {
    pub fn parse(text: &str) -> Self {
        let mut status = None;
        let mut items = Vec::new();
        for line in text.lines() {
            if status.is_none()
                && let Some(rest) = line.trim_start().strip_prefix(STATUS_PREFIX)
            {
                status = match rest.trim_start().chars().next() {
                    Some(OPEN_GLYPH) => Some(StepStatus::Open),
                    Some(COMPLETE_GLYPH) => Some(StepStatus::Complete),
                    _ => None,
                };
            }
            if let Some(checkbox) = parse_checkbox(line) {
                items.push(ChecklistItem {
                    checked: checkbox.checked,
                    text: checkbox.text.to_string(),
                });
            }
        }

        Self {
            status,
            items,
            has_open_questions: text.contains(QUESTION_GLYPH),
            children: child_links(text),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == Some(StepStatus::Complete)
    }

    pub fn open_items(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.items.iter().filter(|item| !item.checked)
    }

    pub fn all_items_checked(&self) -> bool {
        self.open_items().next().is_none()
    }
}

/// Find `[ref](./ref)` links whose label is a child step reference.
fn child_links(text: &str) -> Vec<StepRef> {
    let mut found: Vec<StepRef> = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        rest = &rest[open + 1..];
        let Some(close) = rest.find(']') else {
            break;
        };
        let label = &rest[..close];
        let after = &rest[close + 1..];
        let links_to_itself = after
            .strip_prefix("(./")
            .and_then(|t| t.strip_prefix(label))
            .is_some_and(|t| t.starts_with(')'));
        if links_to_itself
            && let Ok(step) = StepRef::parse(label)
            && step.is_child()
            && !found.contains(&step)
        {
            found.push(step);
        }
    }
    found
}

/// Return `text` with its open status line replaced by the complete one.
///
/// An already complete document is returned unchanged.
pub fn mark_complete(text: &str) -> Result<String, GateError> {
    let mut out = String::with_capacity(text.len() + 8);
    let mut replaced = false;
    for line in text.lines() {
        let trimmed = line.trim_start();
        if !replaced && let Some(rest) = trimmed.strip_prefix(STATUS_PREFIX) {
            match rest.trim_start().chars().next() {
                Some(COMPLETE_GLYPH) => return Ok(text.to_string()),
                Some(OPEN_GLYPH) => {
                    out.push_str(&line[..line.len() - trimmed.len()]);
                    out.push_str(COMPLETE_STATUS);
                    replaced = true;
                }
                _ => out.push_str(line),
            }
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    if !replaced {
        return Err(GateError::format("step document has no open status line"));
    }
    if !text.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}
