#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! # Engine-Replay
//! Verifies that re-executing a recorded audit log against the same inputs produces a
//! bit-for-bit equivalent event sequence, modulo the handful of timing fields every envelope
//! carries. Canonicalisation (strip excluded fields, sort map keys) plus a SHA-256 digest gives
//! a cheap equality check; on mismatch, a linear scan reports exactly where the two logs
//! diverge.

pub mod canonical;
pub mod verifier;

pub use canonical::{canonicalize, default_excluded_fields};
pub use verifier::{ReplayComparison, ReplayError, ReplayVerifier};
