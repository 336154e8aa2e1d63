#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Engine-Core
//! Foundational primitives shared by every crate in the order-execution and safety core:
//! the append-only audit log, the [`Snapshot`] wrapper used for consistent reads under a
//! lock, correlation identifiers, and the [`GuardianMode`]/[`ModeProvider`] seam that lets
//! the execution pipeline ask "are we allowed to trade" without depending on the Guardian
//! crate itself.
//!
//! Nothing in this crate reads the wall clock or system randomness: every "now" and every
//! identifier is supplied by the caller, which is what makes deterministic replay possible
//! further up the stack.

/// Append-only JSONL audit writer and reader.
pub mod audit;
/// Deterministic pseudo-randomness, seeded from `run_id`, for replay-safe jitter.
pub mod detrand;
/// Process-lifetime and decision-cycle correlation identifiers.
pub mod ids;
/// The Guardian mode seam: a narrow enum + trait so lower layers can ask "are we tradeable"
/// without depending on the Guardian crate that computes the answer.
pub mod mode;
/// Consistent point-in-time view of mutable state, taken under a lock.
pub mod snapshot;

pub use audit::{AuditLog, AuditWriteError};
pub use ids::{ExecId, RunId};
pub use mode::{FixedMode, GuardianMode, ModeProvider};
pub use snapshot::Snapshot;
