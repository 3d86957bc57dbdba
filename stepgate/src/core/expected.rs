//! Expected-output specification model (`EXPECTED_OUTPUT_<nn>.json`).

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde::Deserialize;
use serde_json::Value;

const SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/expected_output/v1.schema.json"
));

const FILE_PREFIX: &str = "EXPECTED_OUTPUT_";
const FILE_SUFFIX: &str = ".json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExpectedOutput {
    #[serde(default)]
    pub validation_commands: Vec<String>,
    #[serde(default)]
    pub expected_logs: Vec<String>,
    #[serde(default)]
    expected_return_code: Option<i64>,
    #[serde(default)]
    expected_frame_count: Option<i64>,
}

impl ExpectedOutput {
    /// Parse and schema-check a specification.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("parse expected output json")?;
        let schema: Value = serde_json::from_str(SCHEMA).context("parse expected output schema")?;
        let compiled = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .context("compile expected output schema")?;
        let messages: Vec<String> = compiled
            .iter_errors(&value)
            .map(|err| err.to_string())
            .collect();
        if !messages.is_empty() {
            bail!("expected output schema violation: {}", messages.join("; "));
        }
        serde_json::from_value(value).context("deserialize expected output")
    }

    /// Expected log substrings that do not occur in `log`.
    pub fn missing_logs<'a>(&'a self, log: &str) -> Vec<&'a str> {
        self.expected_logs
            .iter()
            .filter(|needle| !log.contains(needle.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Legacy fields present in the file that carry no gate semantics.
    pub fn ignored_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.expected_return_code.is_some() {
            fields.push("expected_return_code");
        }
        if self.expected_frame_count.is_some() {
            fields.push("expected_frame_count");
        }
        fields
    }
}

pub fn file_name_for(number: &str) -> String {
    format!("{FILE_PREFIX}{number}{FILE_SUFFIX}")
}

/// Step number encoded in a specification file name.
pub fn number_from_file_name(name: &str) -> Option<&str> {
    let number = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    (!number.is_empty() && number.chars().all(|c| c.is_ascii_digit())).then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_default_to_empty() {
        let spec = ExpectedOutput::from_json("{}").expect("parse");
        assert!(spec.validation_commands.is_empty());
        assert!(spec.expected_logs.is_empty());
        assert!(spec.ignored_fields().is_empty());
    }

    #[test]
    fn schema_rejects_wrong_types() {
        let err = ExpectedOutput::from_json(r#"{"validation_commands": "true"}"#)
            .expect_err("string is not an array");
        assert!(err.to_string().contains("schema violation"));
        assert!(ExpectedOutput::from_json("[1, 2]").is_err());
        assert!(ExpectedOutput::from_json("{not json").is_err());
    }

    #[test]
    fn legacy_fields_are_tolerated_but_reported() {
        let spec = ExpectedOutput::from_json(
            r#"{"validation_commands": ["true"], "expected_return_code": 0, "expected_frame_count": 12}"#,
        )
        .expect("parse");
        assert_eq!(spec.validation_commands, vec!["true"]);
        assert_eq!(
            spec.ignored_fields(),
            vec!["expected_return_code", "expected_frame_count"]
        );
    }

    #[test]
    fn missing_logs_lists_absent_substrings() {
        let spec = ExpectedOutput::from_json(r#"{"expected_logs": ["built ok", "42 tests"]}"#)
            .expect("parse");
        assert_eq!(spec.missing_logs("[t] cargo\nSTDOUT:\nbuilt ok\n"), vec!["42 tests"]);
    }

    #[test]
    fn file_names_round_trip_numbers() {
        assert_eq!(file_name_for("03"), "EXPECTED_OUTPUT_03.json");
        assert_eq!(number_from_file_name("EXPECTED_OUTPUT_03.json"), Some("03"));
        assert_eq!(number_from_file_name("EXPECTED_OUTPUT_x.json"), None);
        assert_eq!(number_from_file_name("notes.json"), None);
    }
}
