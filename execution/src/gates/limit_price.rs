use rust_decimal::Decimal;

use crate::{error::Rejection, intent::OrderIntent};

use super::{Gate, GateContext};

/// M13: rejects any order priced outside the exchange's daily limit band, computed from the
/// previous day's settlement price.
#[derive(Debug, Default)]
pub struct LimitPriceGate;

impl Gate for LimitPriceGate {
    fn evaluate(&mut self, intent: &OrderIntent, ctx: &GateContext<'_>) -> Result<(), Rejection> {
        let Some(quote) = ctx.quotes.get(&intent.symbol) else {
            return Err(Rejection::LimitPrice("no quote available to determine limit band".into()));
        };
        let Some(last_settle) = quote.last_settle else {
            return Err(Rejection::LimitPrice("no settlement price available to determine limit band".into()));
        };

        let one = Decimal::from(1);
        let upper = last_settle * (one + ctx.instrument.upper_limit_pct);
        let lower = last_settle * (one - ctx.instrument.lower_limit_pct);

        if intent.price > upper || intent.price < lower {
            return Err(Rejection::LimitPrice(format!(
                "price {} outside limit band [{lower}, {upper}]",
                intent.price
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "limit_price"
    }
}
