use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::Rejection,
    ids::{LocalId, PairExecId},
    intent::OrderIntent,
    order::{OrderEvent, OrderState},
};

/// Every record the execution core writes to the append-only audit log. One flat JSON object
/// per line once wrapped in `engine_core::audit::AuditEnvelope`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ExecutionAuditEvent {
    OrderSubmitted { local_id: LocalId, intent: OrderIntent },
    OrderRejected { intent: OrderIntent, rejection: Rejection, gate: &'static str },
    OrderStateTransition { local_id: LocalId, from: OrderState, to: OrderState, trigger: OrderEvent },
    OrderFilled { local_id: LocalId, price: Decimal, qty: Decimal, filled_qty: Decimal },
    OrderGaveUp { local_id: LocalId, retry_count: u32 },
    CancelRequested { local_id: LocalId },
    ActionRejected { order_ref: crate::ids::OrderRef, reason: String },
    CostGateSkipped { local_id: Option<LocalId>, symbol: engine_instrument::Symbol },
    /// One leg of a [`crate::pair::PairExecutor`] submission. `pair_exec_id` is shared by every
    /// leg of the same two-leg (or hedge) execution, independent of the envelope's own `exec_id`.
    PairLegSubmitted { pair_exec_id: PairExecId, local_id: LocalId, leg: &'static str },
}
