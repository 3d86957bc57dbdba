//! Filesystem, subprocess and version-control side effects.

pub mod command_log;
pub mod config;
pub mod git;
pub mod ledger;
pub mod lock;
pub mod paths;
pub mod process;
pub mod scratchpad;
pub mod store;

use chrono::{Local, SecondsFormat};

/// Local wall-clock time as RFC 3339, the format of every journal line.
pub(crate) fn timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Local date as `YYYY-MM-DD` for scratchpad entries.
pub(crate) fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}
