//! Append-only record of every command run through `exec`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::io::process::CommandOutput;
use crate::io::store::read_optional;
use crate::io::timestamp;

#[derive(Debug, Clone)]
pub struct CommandLog {
    path: PathBuf,
}

impl CommandLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append the header line before the command runs.
    pub fn begin(&self, command: &str) -> Result<()> {
        self.append(&format!("[{}] {command}\n", timestamp()))
    }

    /// Append the captured output and exit code of the command just begun.
    pub fn finish(&self, output: &CommandOutput) -> Result<()> {
        let mut record = String::from("STDOUT:\n");
        record.push_str(&output.stdout);
        if !output.stdout.is_empty() && !output.stdout.ends_with('\n') {
            record.push('\n');
        }
        if !output.stderr.is_empty() {
            record.push_str("STDERR:\n");
            record.push_str(&output.stderr);
            if !output.stderr.ends_with('\n') {
                record.push('\n');
            }
        }
        if output.timed_out {
            record.push_str("Timed out\n");
        }
        record.push_str(&format!("Return code: {}\n\n", output.code_or_negative()));
        self.append(&record)
    }

    /// Append a failure note when the command never produced an exit code.
    pub fn abort(&self, error: &str) -> Result<()> {
        self.append(&format!("Error: {error}\nReturn code: -1\n\n"))
    }

    /// Whole log, empty if nothing was run yet.
    pub fn read(&self) -> Result<String> {
        Ok(read_optional(&self.path)?.unwrap_or_default())
    }

    fn append(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("append {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_command_output_and_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = CommandLog::new(temp.path().join("cli/command_log.txt"));
        assert_eq!(log.read().expect("empty"), "");

        log.begin("cargo test").expect("begin");
        log.finish(&CommandOutput {
            exit_code: Some(101),
            stdout: "running 3 tests".to_string(),
            stderr: "test failed\n".to_string(),
            ..CommandOutput::default()
        })
        .expect("finish");

        let text = log.read().expect("read");
        assert!(text.contains("] cargo test\nSTDOUT:\nrunning 3 tests\nSTDERR:\ntest failed\nReturn code: 101\n\n"));
    }

    #[test]
    fn abort_records_negative_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = CommandLog::new(temp.path().join("command_log.txt"));
        log.begin("nope").expect("begin");
        log.abort("spawn command").expect("abort");
        assert!(log.read().expect("read").ends_with("Error: spawn command\nReturn code: -1\n\n"));
    }
}
