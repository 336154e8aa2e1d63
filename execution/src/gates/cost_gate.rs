use engine_instrument::Side;

use crate::{
    cost::{edge_gate, CostEstimator, CostEstimatorConfig},
    error::Rejection,
    intent::OrderIntent,
};

use super::{Gate, GateContext};

/// M5: no order passes without positive post-cost expectation. Skipped (not rejected) when the
/// intent carries no `signal_edge` — strategies that don't estimate edge opt out deliberately.
#[derive(Debug)]
pub struct CostGate {
    estimator: CostEstimator,
}

impl Default for CostGate {
    fn default() -> Self {
        Self { estimator: CostEstimator::new(CostEstimatorConfig::default()) }
    }
}

impl CostGate {
    pub fn new(estimator: CostEstimator) -> Self {
        Self { estimator }
    }
}

impl Gate for CostGate {
    fn evaluate(&mut self, intent: &OrderIntent, ctx: &GateContext<'_>) -> Result<(), Rejection> {
        let Some(signal_edge) = intent.signal_edge else {
            tracing::debug!(symbol = %intent.symbol, "cost_gate_skipped: no signal_edge on intent");
            return Ok(());
        };

        let Some(quote) = ctx.quotes.get(&intent.symbol) else {
            return Err(Rejection::Cost);
        };

        let is_aggressive = match intent.side {
            Side::Buy => intent.price >= quote.ask,
            Side::Sell => intent.price <= quote.bid,
        };

        let breakdown = self.estimator.estimate(ctx.instrument, intent, quote, ctx.avg_daily_volume, is_aggressive);
        if edge_gate(signal_edge, &breakdown) {
            Ok(())
        } else {
            Err(Rejection::Cost)
        }
    }

    fn name(&self) -> &'static str {
        "cost"
    }
}
