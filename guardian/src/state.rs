use engine_core::GuardianMode;
use serde::{Deserialize, Serialize};

/// Every cause that can drive a [`GuardianMode`] transition, carried into the audit trail
/// alongside the transition itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    StartupHealthy,
    QuoteHardStale,
    OrderStuck,
    LegImbalance,
    MarginWarning,
    MarginDanger,
    PositionDriftSevere,
    AuditWriteFailed,
    CooldownElapsedHealthy,
    AnomalyRecurred,
    ManualAcknowledge,
}

/// Pure transition function for the supervisor FSM. `anomaly_active` tells the REDUCE_ONLY →
/// RUNNING edge whether the cooldown window closed clean; `cooldown_elapsed` is evaluated by
/// the caller against wall-clock time, not here, since this function has no notion of "now".
///
/// Returns `None` when `trigger` has no edge defined from `from` — the caller keeps the
/// current mode and simply does not audit a transition.
pub fn transition(from: GuardianMode, trigger: Trigger, cooldown_elapsed: bool, anomaly_active: bool) -> Option<GuardianMode> {
    use GuardianMode::*;
    use Trigger::*;

    match (from, trigger) {
        (Init, StartupHealthy) => Some(Running),

        (Running, QuoteHardStale | OrderStuck | LegImbalance | MarginWarning) => Some(ReduceOnly),
        (Running, PositionDriftSevere | MarginDanger | AuditWriteFailed) => Some(Halted),

        (ReduceOnly, CooldownElapsedHealthy) if cooldown_elapsed && !anomaly_active => Some(Running),
        (ReduceOnly, PositionDriftSevere | MarginDanger | AuditWriteFailed | AnomalyRecurred) => Some(Halted),

        (Halted, ManualAcknowledge) => Some(Manual),
        (Manual, ManualAcknowledge) => Some(Running),

        _ => None,
    }
}
