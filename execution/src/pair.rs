use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    audit::ExecutionAuditEvent,
    broker::Broker,
    engine::AutoOrderEngine,
    error::Rejection,
    ids::{LocalId, PairExecId},
    intent::OrderIntent,
    order::OrderContext,
};

/// Threshold above which a near/far leg mismatch is escalated to Guardian rather than left to
/// resolve on its own.
pub const DEFAULT_LEG_IMBALANCE_THRESHOLD: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Outcome of a two-leg submission. Both legs sharing a [`PairExecId`] for audit correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PairOutcome {
    /// Both legs accepted by the broker.
    BothAccepted { near: Box<OrderContext>, far: Box<OrderContext> },
    /// Near leg accepted, far leg rejected at the gate or by the broker; a hedge was submitted
    /// for whatever of the near leg had already filled.
    FarRejectedHedged { near: Box<OrderContext>, hedge: Option<Box<OrderContext>> },
    /// Near leg itself never got out — nothing to roll back.
    NearRejected { rejection: Rejection },
}

/// Drives a two-leg spread or calendar-arb submission without assuming the broker offers an
/// atomic multi-leg primitive — CTP and comparable gateways do not. Submission is
/// sequential-plus-rollback: the near leg goes out first; only once it is accepted does the far
/// leg follow; if the far leg is rejected after the near leg has fills, an immediate hedge order
/// closes out the filled portion of the near leg.
#[derive(Debug)]
pub struct PairExecutor {
    pub pair_exec_id: PairExecId,
}

impl PairExecutor {
    pub fn new() -> Self {
        Self { pair_exec_id: PairExecId::generate() }
    }

    /// `near` and `far` are independent [`OrderIntent`]s; the caller decides which leg is near
    /// and which is far (eg/ front-month vs back-month for a calendar spread).
    pub async fn execute<B: Broker>(
        &self,
        engine: &mut AutoOrderEngine<B>,
        near: OrderIntent,
        far: OrderIntent,
        now: DateTime<Utc>,
    ) -> PairOutcome {
        let near_ctx = match engine.submit(near, now).await {
            Ok(ctx) => ctx,
            Err(rejection) => return PairOutcome::NearRejected { rejection },
        };
        engine.audit(now, ExecutionAuditEvent::PairLegSubmitted { pair_exec_id: self.pair_exec_id, local_id: near_ctx.local_id, leg: "near" });

        let far_ctx = match engine.submit(far, now).await {
            Ok(ctx) => ctx,
            Err(_) => {
                let hedge = self.hedge_filled_portion(engine, near_ctx.local_id, now).await;
                return PairOutcome::FarRejectedHedged { near: Box::new(near_ctx), hedge: hedge.map(Box::new) };
            }
        };
        engine.audit(now, ExecutionAuditEvent::PairLegSubmitted { pair_exec_id: self.pair_exec_id, local_id: far_ctx.local_id, leg: "far" });

        PairOutcome::BothAccepted { near: Box::new(near_ctx), far: Box::new(far_ctx) }
    }

    /// Submits an opposing-side order sized to whatever of the near leg has *actually* filled.
    /// Re-reads the live order via `engine.order` rather than trusting the `OrderContext` the
    /// caller captured at submit time, since that clone's `filled_qty` is frozen at zero until
    /// a fill callback lands on it.
    async fn hedge_filled_portion<B: Broker>(
        &self,
        engine: &mut AutoOrderEngine<B>,
        near_local_id: LocalId,
        now: DateTime<Utc>,
    ) -> Option<OrderContext> {
        let hedge_intent = hedge_intent_for(engine.order(near_local_id)?)?;
        let hedge_ctx = engine.submit(hedge_intent, now).await.ok()?;
        engine.audit(now, ExecutionAuditEvent::PairLegSubmitted { pair_exec_id: self.pair_exec_id, local_id: hedge_ctx.local_id, leg: "hedge" });
        Some(hedge_ctx)
    }

    /// `|net_qty(A) - net_qty(B)|`, monitored post-submission; callers compare this against
    /// their own threshold and escalate to Guardian's `cancel_all`/`auto_hedge` above it.
    pub fn leg_imbalance(near: &OrderContext, far: &OrderContext) -> Decimal {
        (near.filled_qty - far.filled_qty).abs()
    }
}

impl Default for PairExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Sizes the rollback hedge off the order's *current* fill, not whatever was captured at submit
/// time. `None` means nothing filled yet, so there is nothing to hedge.
fn hedge_intent_for(live: &OrderContext) -> Option<OrderIntent> {
    if live.filled_qty.is_zero() {
        return None;
    }

    Some(OrderIntent {
        symbol: live.intent.symbol.clone(),
        side: live.intent.side.opposite(),
        offset: engine_instrument::Offset::Close,
        price: live.avg_price(),
        qty: live.filled_qty,
        reason: "pair_leg_hedge".into(),
        strategy_id: live.intent.strategy_id.clone(),
        signal_edge: None,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::ids::StrategyId;
    use engine_instrument::{Offset, Side, Symbol};

    fn fixture_context(filled_qty: Decimal) -> OrderContext {
        let intent = OrderIntent {
            symbol: Symbol::new("rb2410"),
            side: Side::Buy,
            offset: Offset::Open,
            price: dec!(3800),
            qty: dec!(10),
            reason: "test".into(),
            strategy_id: StrategyId::unknown(),
            signal_edge: None,
        };
        let mut ctx = OrderContext::new(crate::ids::LocalId::generate(), intent, Utc::now());
        ctx.filled_qty = filled_qty;
        ctx
    }

    #[test]
    fn leg_imbalance_is_absolute_difference() {
        let near = fixture_context(dec!(8));
        let far = fixture_context(dec!(5));
        assert_eq!(PairExecutor::leg_imbalance(&near, &far), dec!(3));
    }

    #[test]
    fn leg_imbalance_is_symmetric() {
        let near = fixture_context(dec!(3));
        let far = fixture_context(dec!(9));
        assert_eq!(PairExecutor::leg_imbalance(&near, &far), dec!(6));
    }

    #[test]
    fn hedge_intent_for_unfilled_leg_is_none() {
        let ctx = fixture_context(dec!(0));
        assert!(hedge_intent_for(&ctx).is_none(), "an unfilled near leg has nothing to hedge");
    }

    #[test]
    fn hedge_intent_for_filled_leg_sizes_and_flips_side() {
        let ctx = fixture_context(dec!(4));
        let hedge = hedge_intent_for(&ctx).expect("a filled leg must produce a hedge intent");
        assert_eq!(hedge.qty, dec!(4), "the hedge must be sized off the live fill, not a stale zero");
        assert_eq!(hedge.side, Side::Sell, "the hedge closes out the near leg's Buy fill");
        assert_eq!(hedge.offset, Offset::Close);
    }
}
