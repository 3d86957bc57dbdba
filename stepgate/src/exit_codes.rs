//! Stable exit codes for stepgate CLI commands.

/// Command succeeded (gate passed, step active, publish done).
pub const OK: i32 = 0;
/// Any failure: gate failure, lock present, integrity violation, or other errors.
pub const FAILED: i32 = 1;
/// `stepgate active` found no open step (tree complete).
pub const COMPLETE: i32 = 2;
