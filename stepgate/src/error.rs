//! Fatal error kinds.
//!
//! Gate failures are not errors: they come back as
//! [`crate::core::types::GateFailure`] values and leave the lock in place. The
//! kinds below abort the calling flow instead. They travel inside
//! [`anyhow::Error`] and callers recover them with `downcast_ref`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// A ledgered document no longer matches its most recent recorded hash.
    #[error(
        "file hash mismatch: {} (recorded {recorded}, current {current})",
        .path.display()
    )]
    IntegrityViolation {
        path: PathBuf,
        recorded: String,
        current: String,
    },

    /// A step reference or document does not follow the required grammar.
    #[error("format error: {0}")]
    Format(String),

    /// The operation targets something other than the sanctioned state.
    #[error("state violation: {0}")]
    StateViolation(String),

    /// The lock marker is present.
    #[error("operation blocked: {reason}")]
    Locked { reason: String },
}

impl GateError {
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::StateViolation(message.into())
    }
}
