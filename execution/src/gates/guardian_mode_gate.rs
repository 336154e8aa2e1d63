use std::marker::PhantomData;

use engine_core::ModeProvider;

use crate::{error::Rejection, intent::OrderIntent};

use super::{mode_allows, Gate, GateContext};

/// Consults the supervisor's current mode without depending on the Guardian crate itself —
/// only the [`ModeProvider`] seam defined in `engine-core`.
#[derive(Debug)]
pub struct GuardianModeGate<M> {
    provider: std::sync::Arc<M>,
    _marker: PhantomData<M>,
}

impl<M> GuardianModeGate<M> {
    pub fn new(provider: std::sync::Arc<M>) -> Self {
        Self { provider, _marker: PhantomData }
    }
}

impl<M: ModeProvider> Gate for GuardianModeGate<M> {
    fn evaluate(&mut self, intent: &OrderIntent, _ctx: &GateContext<'_>) -> Result<(), Rejection> {
        let mode = self.provider.current_mode();
        if mode_allows(mode, intent.offset.is_close()) {
            Ok(())
        } else {
            Err(Rejection::GuardianMode(format!("mode is {mode}")))
        }
    }

    fn name(&self) -> &'static str {
        "guardian_mode"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use engine_core::{FixedMode, GuardianMode};
    use engine_instrument::{ExchangeId, FeeSpec, Offset, QuoteCache, Side};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::ids::StrategyId;

    fn instrument() -> engine_instrument::Instrument {
        engine_instrument::Instrument {
            symbol: "rb2410".into(),
            product: "rb".into(),
            exchange: ExchangeId::Shfe,
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

    fn intent(offset: Offset) -> OrderIntent {
        OrderIntent {
            symbol: "rb2410".into(),
            side: Side::Buy,
            offset,
            price: dec!(3801),
            qty: dec!(10),
            reason: "test".into(),
            strategy_id: StrategyId::unknown(),
            signal_edge: None,
        }
    }

    fn ctx<'a>(instrument: &'a engine_instrument::Instrument, quotes: &'a QuoteCache) -> GateContext<'a> {
        GateContext {
            instrument,
            quotes,
            now: Utc::now(),
            current_position_qty: Decimal::ZERO,
            margin_usage_ceiling: dec!(1),
            margin_usage_after: Decimal::ZERO,
            avg_daily_volume: dec!(1_000_000),
        }
    }

    #[test]
    fn reduce_only_rejects_opening_order() {
        let instrument = instrument();
        let quotes = QuoteCache::default();
        let mut gate = GuardianModeGate::new(Arc::new(FixedMode(GuardianMode::ReduceOnly)));
        let result = gate.evaluate(&intent(Offset::Open), &ctx(&instrument, &quotes));
        assert!(matches!(result, Err(Rejection::GuardianMode(_))));
    }

    #[test]
    fn reduce_only_allows_closing_order() {
        let instrument = instrument();
        let quotes = QuoteCache::default();
        let mut gate = GuardianModeGate::new(Arc::new(FixedMode(GuardianMode::ReduceOnly)));
        let result = gate.evaluate(&intent(Offset::Close), &ctx(&instrument, &quotes));
        assert!(result.is_ok());
    }

    #[test]
    fn halted_rejects_everything() {
        let instrument = instrument();
        let quotes = QuoteCache::default();
        let mut gate = GuardianModeGate::new(Arc::new(FixedMode(GuardianMode::Halted)));
        assert!(gate.evaluate(&intent(Offset::Close), &ctx(&instrument, &quotes)).is_err());
        assert!(gate.evaluate(&intent(Offset::Open), &ctx(&instrument, &quotes)).is_err());
    }

    #[test]
    fn running_allows_everything() {
        let instrument = instrument();
        let quotes = QuoteCache::default();
        let mut gate = GuardianModeGate::new(Arc::new(FixedMode(GuardianMode::Running)));
        assert!(gate.evaluate(&intent(Offset::Open), &ctx(&instrument, &quotes)).is_ok());
    }
}
