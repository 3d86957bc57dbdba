//! Deterministic, pure logic shared by the stepgate components.
//!
//! Core modules must be free of I/O side effects. They operate on document
//! text and in-memory representations and return deterministic outputs
//! suitable for tests.

pub mod checklist;
pub mod expected;
pub mod ledger;
pub mod scratchpad;
pub mod selector;
pub mod step_doc;
pub mod step_ref;
pub mod templates;
pub mod tree_doc;
pub mod types;
