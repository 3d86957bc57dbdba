//! Step reference grammar: `STEP_<digits><SUFFIX>__<description>.<ext>`.
//!
//! Top-level references declared in the tree carry no suffix. Child
//! references carry one or more uppercase letters after the number
//! (`STEP_01A__Write_tests.md`).

use std::fmt;

use crate::error::GateError;

const PREFIX: &str = "STEP_";
const SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepRef {
    number: String,
    suffix: String,
    description: String,
    extension: String,
}

impl StepRef {
    /// Parse a reference such as `STEP_02__Build_core.md`.
    pub fn parse(raw: &str) -> Result<Self, GateError> {
        let invalid = || {
            GateError::format(format!(
                "invalid step reference '{raw}' (expected STEP_<number>__<description>.<ext>)"
            ))
        };

        let rest = raw.strip_prefix(PREFIX).ok_or_else(invalid)?;
        let (head, tail) = rest.split_once(SEPARATOR).ok_or_else(invalid)?;

        let digits_end = head
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(head.len());
        let (number, suffix) = head.split_at(digits_end);
        if number.is_empty() || !suffix.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(invalid());
        }

        let (description, extension) = tail.rsplit_once('.').ok_or_else(invalid)?;
        if description.is_empty()
            || extension.is_empty()
            || !extension.chars().all(|c| c.is_ascii_alphanumeric())
            || description.chars().any(char::is_whitespace)
        {
            return Err(invalid());
        }

        Ok(Self {
            number: number.to_string(),
            suffix: suffix.to_string(),
            description: description.to_string(),
            extension: extension.to_string(),
        })
    }

    /// Zero-padded number exactly as written (`"02"`).
    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Numeric position in the tree; saturates on absurdly long numbers.
    pub fn position(&self) -> u32 {
        self.number.parse().unwrap_or(u32::MAX)
    }

    pub fn is_child(&self) -> bool {
        !self.suffix.is_empty()
    }

    /// Description words with separators rendered as spaces.
    pub fn title(&self) -> String {
        self.description.replace('_', " ")
    }
}

impl fmt::Display for StepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PREFIX}{}{}{SEPARATOR}{}.{}",
            self.number, self.suffix, self.description, self.extension
        )
    }
}
