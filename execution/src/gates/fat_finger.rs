use rust_decimal::Decimal;

use crate::{error::Rejection, intent::OrderIntent};

use super::{Gate, GateContext};

#[derive(Debug, Clone, Copy)]
pub struct FatFingerConfig {
    pub max_qty: Decimal,
    pub max_notional: Decimal,
    pub max_price_deviation: Decimal,
}

impl Default for FatFingerConfig {
    fn default() -> Self {
        Self {
            max_qty: Decimal::from(200),
            max_notional: Decimal::from(50_000_000),
            max_price_deviation: Decimal::new(2, 2), // 2%
        }
    }
}

#[derive(Debug, Default)]
pub struct FatFingerGate {
    pub config: FatFingerConfig,
}

impl FatFingerGate {
    pub fn new(config: FatFingerConfig) -> Self {
        Self { config }
    }
}

impl Gate for FatFingerGate {
    fn evaluate(&mut self, intent: &OrderIntent, ctx: &GateContext<'_>) -> Result<(), Rejection> {
        if intent.qty > self.config.max_qty {
            return Err(Rejection::FatFinger(format!("qty {} exceeds max {}", intent.qty, self.config.max_qty)));
        }

        let notional = intent.price * ctx.instrument.multiplier * intent.qty;
        if notional > self.config.max_notional {
            return Err(Rejection::FatFinger(format!(
                "notional {notional} exceeds max {}",
                self.config.max_notional
            )));
        }

        if let Some(quote) = ctx.quotes.get(&intent.symbol) {
            let mid = quote.mid();
            if !mid.is_zero() {
                let deviation = (intent.price - mid).abs() / mid;
                if deviation > self.config.max_price_deviation {
                    return Err(Rejection::FatFinger(format!(
                        "price deviates {deviation} from mid, exceeding max {}",
                        self.config.max_price_deviation
                    )));
                }
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "fat_finger"
    }
}
