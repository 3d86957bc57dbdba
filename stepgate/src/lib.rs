//! Lock-gated progression through an ordered tree of checklist steps.
//!
//! A tree document declares the steps of an initiative in execution order. The
//! first unchecked entry is the *active* step: the only one an actor may work
//! on. Completing a step, advancing, and publishing are all gated, and every
//! failing gate leaves a lock marker behind that blocks further mutation until
//! the condition is fixed. The architecture follows a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (reference grammar, document
//!   scanners, ledger codec, template selection). No I/O.
//! - **[`io`]**: Side-effecting operations (documents, lock marker, ledger,
//!   scratchpad logs, processes, git).
//!
//! Orchestration modules ([`registry`], [`verify`], [`publish`], [`outputs`],
//! [`exec`], [`repl`]) compose core logic with I/O through a [`session::Session`]
//! that owns every shared resource.

pub mod core;
pub mod error;
pub mod exec;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod outputs;
pub mod publish;
pub mod registry;
pub mod render;
pub mod repl;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verify;
