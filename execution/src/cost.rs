use engine_instrument::{Instrument, Quote};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use crate::intent::OrderIntent;

/// Tunables for [`CostEstimator`]. Defaults follow §6 of the engine's configuration surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimatorConfig {
    /// Slippage coefficient for an aggressive (marketable) order.
    pub k_slip_aggressive: Decimal,
    /// Slippage coefficient for a passive (resting) order.
    pub k_slip_passive: Decimal,
    /// Market-impact coefficient in the square-root-of-participation model.
    pub k_impact: Decimal,
}

impl Default for CostEstimatorConfig {
    fn default() -> Self {
        Self {
            k_slip_aggressive: Decimal::new(5, 1), // 0.5
            k_slip_passive: Decimal::ZERO,
            k_impact: Decimal::new(1, 1), // 0.1, a conservative default
        }
    }
}

/// Breakdown of the estimated round-trip cost of an intent, used by the cost gate's
/// `edge_gate` predicate and surfaced to the audit log on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub fee: Decimal,
    pub slippage: Decimal,
    pub impact: Decimal,
    pub total: Decimal,
}

/// Pure function of `(instrument, intent, quote)`. Never reads shared mutable state, so it is
/// trivially safe to call from both the cost gate and any offline strategy tooling.
#[derive(Debug, Clone, Copy)]
pub struct CostEstimator {
    pub config: CostEstimatorConfig,
}

impl CostEstimator {
    pub fn new(config: CostEstimatorConfig) -> Self {
        Self { config }
    }

    /// `avg_daily_volume` drives the market-impact term; callers typically source it from a
    /// rolling average maintained alongside the quote cache.
    pub fn estimate(
        &self,
        instrument: &Instrument,
        intent: &OrderIntent,
        quote: &Quote,
        avg_daily_volume: Decimal,
        is_aggressive: bool,
    ) -> CostBreakdown {
        let fee = instrument
            .fee_spec
            .fee(intent.offset, intent.price, instrument.multiplier, intent.qty);

        let k_slip = if is_aggressive {
            self.config.k_slip_aggressive
        } else {
            self.config.k_slip_passive
        };
        let slippage = k_slip * instrument.tick_size * intent.qty;

        let impact = if avg_daily_volume.is_zero() {
            Decimal::ZERO
        } else {
            let participation = intent.qty / avg_daily_volume;
            self.config.k_impact * sqrt_decimal(participation) * quote.mid()
        };

        let total = fee + slippage + impact;
        CostBreakdown { fee, slippage, impact, total }
    }
}

fn sqrt_decimal(value: Decimal) -> Decimal {
    value.sqrt().unwrap_or(Decimal::ZERO)
}

/// The M5 cost-first rule: no order passes without positive post-cost expectation.
pub fn edge_gate(signal_edge: Decimal, breakdown: &CostBreakdown) -> bool {
    signal_edge > breakdown.total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engine_instrument::{FeeSpec, Offset, Side};
    use rust_decimal_macros::dec;

    fn instrument() -> Instrument {
        Instrument {
            symbol: "rb2410".into(),
            product: "rb".into(),
            exchange: engine_instrument::ExchangeId::Shfe,
            expire_date: chrono::NaiveDate::from_ymd_opt(2024, 10, 15).unwrap(),
            tick_size: dec!(1),
            multiplier: dec!(10),
            upper_limit_pct: dec!(0.05),
            lower_limit_pct: dec!(0.05),
            margin_rate: dec!(0.1),
            spec_margin_rate: None,
            trading_sessions: vec![],
            max_order_volume: 500,
            position_limit: 2000,
            fee_spec: FeeSpec::ByRate { rate: dec!(0.0001), close_today_rate: None },
        }
    }

    fn quote() -> Quote {
        Quote {
            bid: dec!(3800),
            ask: dec!(3801),
            bid_vol: 10,
            ask_vol: 10,
            last: dec!(3800),
            volume: 100_000,
            open_interest: 50_000,
            last_settle: Some(dec!(3799)),
            ts: Utc::now(),
        }
    }

    fn intent(signal_edge: Option<Decimal>) -> OrderIntent {
        OrderIntent {
            symbol: "rb2410".into(),
            side: Side::Buy,
            offset: Offset::Open,
            price: dec!(3801),
            qty: dec!(10),
            reason: "test".into(),
            strategy_id: crate::ids::StrategyId::unknown(),
            signal_edge,
        }
    }

    #[test]
    fn estimate_sums_fee_slippage_and_impact() {
        let estimator = CostEstimator::new(CostEstimatorConfig::default());
        let breakdown = estimator.estimate(&instrument(), &intent(None), &quote(), dec!(1_000_000), true);
        assert_eq!(breakdown.total, breakdown.fee + breakdown.slippage + breakdown.impact);
        assert!(breakdown.fee > Decimal::ZERO);
    }

    #[test]
    fn edge_gate_requires_edge_to_exceed_cost() {
        let breakdown = CostBreakdown {
            fee: dec!(10),
            slippage: dec!(5),
            impact: dec!(5),
            total: dec!(20),
        };
        assert!(!edge_gate(dec!(15), &breakdown));
        assert!(edge_gate(dec!(25), &breakdown));
    }

    #[test]
    fn zero_avg_daily_volume_yields_zero_impact() {
        let estimator = CostEstimator::new(CostEstimatorConfig::default());
        let breakdown = estimator.estimate(&instrument(), &intent(None), &quote(), Decimal::ZERO, true);
        assert_eq!(breakdown.impact, Decimal::ZERO);
    }
}
