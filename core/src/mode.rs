use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The supervisor's current posture, as observed by the execution pipeline.
///
/// Defined here, in the lowest crate of the workspace, so that the execution pipeline's
/// Guardian-Mode gate can depend on this enum and the [`ModeProvider`] trait without depending
/// on the crate that actually computes the mode. The concrete supervisor lives above execution
/// in the dependency graph and implements [`ModeProvider`] for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum GuardianMode {
    /// Starting up; no trading decisions have been validated yet.
    Init,
    /// Normal operation. All gates evaluate as usual.
    Running,
    /// New risk-increasing orders are rejected at the gate; closing orders still pass.
    ReduceOnly,
    /// All new order submissions are rejected at the gate.
    Halted,
    /// An operator has taken direct control; the engine stops issuing orders of its own accord.
    Manual,
}

impl GuardianMode {
    /// Whether an order that would increase or open a position is permitted under this mode.
    pub fn allows_position_increase(&self) -> bool {
        matches!(self, GuardianMode::Running)
    }

    /// Whether an order that only reduces or closes an existing position is permitted.
    pub fn allows_position_decrease(&self) -> bool {
        matches!(self, GuardianMode::Running | GuardianMode::ReduceOnly)
    }
}

/// Narrow seam the execution pipeline uses to query the supervisor's current mode without
/// depending on its crate.
pub trait ModeProvider: Send + Sync {
    fn current_mode(&self) -> GuardianMode;
}

/// A [`ModeProvider`] fixed at a single mode, used in tests and in any wiring that does not
/// (yet) have a live supervisor attached.
#[derive(Debug, Clone, Copy)]
pub struct FixedMode(pub GuardianMode);

impl ModeProvider for FixedMode {
    fn current_mode(&self) -> GuardianMode {
        self.0
    }
}
