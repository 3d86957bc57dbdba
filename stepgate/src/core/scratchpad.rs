//! Scratchpad log format: dated open questions and unresolved
//! inconsistencies, each kept under its own heading.

pub const QUESTIONS_HEADING: &str = "## Pending Questions";
pub const INCONSISTENCIES_HEADING: &str = "## Unresolved Inconsistencies";

const QUESTION_MARKER: &str = "- ❓ [";
const INCONSISTENCY_MARKER: &str = "- ⚠️ [";

/// Which of the two logs an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Questions,
    Inconsistencies,
}

impl LogKind {
    pub fn heading(self) -> &'static str {
        match self {
            LogKind::Questions => QUESTIONS_HEADING,
            LogKind::Inconsistencies => INCONSISTENCIES_HEADING,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            LogKind::Questions => "# Model Thoughts and Questions",
            LogKind::Inconsistencies => "# Inconsistencies Pending Resolution",
        }
    }

    fn marker(self) -> &'static str {
        match self {
            LogKind::Questions => QUESTION_MARKER,
            LogKind::Inconsistencies => INCONSISTENCY_MARKER,
        }
    }
}

/// Texts of every dated entry of `kind` in `text`.
///
/// Placeholder entries such as `- ❓ [YYYY-MM-DD] ...` are not counted.
pub fn entries(text: &str, kind: LogKind) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let rest = line.trim_start().strip_prefix(kind.marker())?;
            let (date, body) = rest.split_once(']')?;
            is_iso_date(date).then(|| body.trim().to_string())
        })
        .collect()
}

fn is_iso_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

pub fn question_entry(date: &str, question: &str) -> String {
    format!("{QUESTION_MARKER}{date}] {}\n", question.trim())
}

/// Inconsistency entry with the origin file and an indented detail block.
pub fn inconsistency_entry(date: &str, file: &str, details: &str) -> String {
    let mut lines = details.trim_end().lines();
    let mut entry = format!(
        "{INCONSISTENCY_MARKER}{date}] Validation failed\n  - **File:** {file}\n  - **Details:** {}\n",
        lines.next().unwrap_or_default()
    );
    for line in lines {
        entry.push_str("    ");
        entry.push_str(line);
        entry.push('\n');
    }
    entry
}

/// Insert `entry` directly under the heading of `kind`.
///
/// Empty input gets a fresh document; input without the heading gets the
/// heading appended first.
pub fn insert_entry(text: &str, kind: LogKind, entry: &str) -> String {
    let heading = kind.heading();
    if text.trim().is_empty() {
        return format!("{}\n\n{heading}\n{entry}", kind.title());
    }

    let mut out = String::with_capacity(text.len() + entry.len() + heading.len() + 2);
    let mut inserted = false;
    for line in text.split_inclusive('\n') {
        out.push_str(line);
        if !inserted && line.trim_end() == heading {
            if !line.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(entry);
            inserted = true;
        }
    }
    if !inserted {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
        out.push_str(heading);
        out.push('\n');
        out.push_str(entry);
    }
    out
}
