use engine_core::GuardianMode;
use serde::{Deserialize, Serialize};

use crate::detector::Anomaly;
use crate::state::Trigger;

/// A coarse instruction Guardian hands back to the caller — it never touches the broker or the
/// engine directly, so it stays testable in isolation from both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuardianAction {
    /// Propagate a new mode to the auto-order engine and its gate chain.
    SetMode(GuardianMode),
    /// Cancel every live order; issued alongside a transition into `Halted`.
    CancelAll,
    /// Flatten every open position; the caller plans the actual intents via
    /// [`crate::flatten::plan_flatten`] once it has this instruction in hand.
    FlattenAll,
}

/// Everything Guardian writes to its own audit journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GuardianAuditEvent {
    ModeTransition { from: GuardianMode, to: GuardianMode, trigger: Trigger },
    AnomalyDetected { anomaly: AnomalyRecord },
    ActionIssued { action: GuardianAction },
}

/// Serializable projection of [`Anomaly`] for the audit trail — kept separate from the live
/// enum so detector-internal types never need to implement `Serialize` themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnomalyRecord {
    QuoteStale { symbol: String, age_ms: i64 },
    OrderStuck { local_id: String, stuck_for_ms: i64 },
    PositionDrift { symbol: String, long_delta: String, short_delta: String },
    LegImbalance { pair_exec_id: String, imbalance: String },
    MarginWarning { usage: String },
    MarginDanger { usage: String },
}

impl From<&Anomaly> for AnomalyRecord {
    fn from(anomaly: &Anomaly) -> Self {
        match anomaly {
            Anomaly::QuoteStale { symbol, age_ms } => AnomalyRecord::QuoteStale { symbol: symbol.to_string(), age_ms: *age_ms },
            Anomaly::OrderStuck { local_id, stuck_for_ms } => {
                AnomalyRecord::OrderStuck { local_id: local_id.to_string(), stuck_for_ms: *stuck_for_ms }
            }
            Anomaly::PositionDrift { drift } => AnomalyRecord::PositionDrift {
                symbol: drift.symbol.to_string(),
                long_delta: drift.long_delta().to_string(),
                short_delta: drift.short_delta().to_string(),
            },
            Anomaly::LegImbalance { pair_exec_id, imbalance } => {
                AnomalyRecord::LegImbalance { pair_exec_id: pair_exec_id.to_string(), imbalance: imbalance.to_string() }
            }
            Anomaly::MarginWarning { usage } => AnomalyRecord::MarginWarning { usage: usage.to_string() },
            Anomaly::MarginDanger { usage } => AnomalyRecord::MarginDanger { usage: usage.to_string() },
        }
    }
}
