#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! # Engine-Guardian
//! The system-level supervisor: a five-state FSM over `engine_core::GuardianMode`, four
//! independently-testable anomaly detectors, and a flatten-all planner. Observes a snapshot of
//! quotes, open orders, position drift, and leg imbalance once per tick and hands back coarse
//! actions — never a broker call or an engine mutation of its own.

pub mod action;
pub mod detector;
pub mod flatten;
pub mod guardian;
pub mod state;

pub use action::{AnomalyRecord, GuardianAction, GuardianAuditEvent};
pub use detector::{Anomaly, AnomalyDetector, GuardianSnapshot, LegImbalanceDetector, OrderStuckDetector, OrderSnapshotEntry, PositionDriftDetector, QuoteStaleDetector};
pub use guardian::{Guardian, GuardianConfig};
pub use state::{transition, Trigger};
