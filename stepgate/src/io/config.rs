//! Gate configuration stored in `<root>/stepgate.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::store::write_atomic;

/// Gate configuration (TOML).
///
/// The file is optional and meant to be edited by humans. Missing tables and
/// fields take the defaults below.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GateConfig {
    pub integrity: IntegrityConfig,
    pub commands: CommandConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IntegrityConfig {
    /// Skip ledger entries whose document no longer exists.
    ///
    /// When false, a missing document counts as an integrity violation.
    pub ignore_missing_paths: bool,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            ignore_missing_paths: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    /// Shell prefix for validation and `exec` commands; the command string is
    /// appended as the last argument.
    pub shell: Vec<String>,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Kill commands running longer than this. Absent means wait forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            shell: vec!["sh".to_string(), "-c".to_string()],
            output_limit_bytes: 100_000,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PublishConfig {
    pub commit_message: String,

    /// Run the output validation gate before publishing.
    pub output_validation: bool,

    /// External validator argv. Empty runs the built-in expected-output sweep.
    pub output_validator: Vec<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            commit_message: "Completed checklist steps".to_string(),
            output_validation: true,
            output_validator: Vec::new(),
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.commands.shell.is_empty() || self.commands.shell[0].trim().is_empty() {
            return Err(anyhow!("commands.shell must be a non-empty array"));
        }
        if self.commands.output_limit_bytes == 0 {
            return Err(anyhow!("commands.output_limit_bytes must be > 0"));
        }
        if self.commands.timeout_secs == Some(0) {
            return Err(anyhow!("commands.timeout_secs must be > 0 when set"));
        }
        if self.publish.commit_message.trim().is_empty() {
            return Err(anyhow!("publish.commit_message must not be empty"));
        }
        if self
            .publish
            .output_validator
            .first()
            .is_some_and(|program| program.trim().is_empty())
        {
            return Err(anyhow!("publish.output_validator must start with a program"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GateConfig::default()`.
pub fn load_config(path: &Path) -> Result<GateConfig> {
    if !path.exists() {
        return Ok(GateConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GateConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &GateConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
