//! Development-time tracing for debugging stepgate.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG`, output to stderr.
//!   Not persisted, not part of the product output.
//!
//! - **Markers ([`crate::render`])**: The one-line `❌`/`🔒`/`✅` lines printed on
//!   stdout for the actor driving the steps. Always printed, unaffected by
//!   `RUST_LOG`.
//!
//! - **Journals (`io/ledger`, `io/command_log`, `io/scratchpad`)**: Product
//!   artifacts on disk that gates read back.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=stepgate=debug stepgate verify
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
