use engine_instrument::{Side, DEFAULT_SOFT_STALE};
use rust_decimal::Decimal;

use crate::{error::Rejection, intent::OrderIntent};

use super::{Gate, GateContext};

#[derive(Debug, Clone, Copy)]
pub struct LiquidityConfig {
    pub max_spread_ticks: Decimal,
    pub min_bid_ask_vol: u32,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            max_spread_ticks: Decimal::from(5),
            min_bid_ask_vol: 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct LiquidityGate {
    pub config: LiquidityConfig,
}

impl LiquidityGate {
    pub fn new(config: LiquidityConfig) -> Self {
        Self { config }
    }
}

impl Gate for LiquidityGate {
    fn evaluate(&mut self, intent: &OrderIntent, ctx: &GateContext<'_>) -> Result<(), Rejection> {
        if ctx.quotes.is_soft_stale(&intent.symbol, ctx.now, DEFAULT_SOFT_STALE) {
            return Err(Rejection::Liquidity("quote is soft-stale".into()));
        }

        let Some(quote) = ctx.quotes.get(&intent.symbol) else {
            return Err(Rejection::Liquidity("no quote available".into()));
        };

        if ctx.instrument.tick_size.is_zero() {
            return Err(Rejection::Liquidity("instrument has zero tick size".into()));
        }
        let spread_ticks = quote.spread() / ctx.instrument.tick_size;
        if spread_ticks > self.config.max_spread_ticks {
            return Err(Rejection::Liquidity(format!(
                "spread {spread_ticks} ticks exceeds max {}",
                self.config.max_spread_ticks
            )));
        }

        let side_volume = match intent.side {
            Side::Buy => quote.ask_vol,
            Side::Sell => quote.bid_vol,
        };
        if side_volume < self.config.min_bid_ask_vol {
            return Err(Rejection::Liquidity(format!(
                "side volume {side_volume} below minimum {}",
                self.config.min_bid_ask_vol
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "liquidity"
    }
}
