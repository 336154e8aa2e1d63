use crate::{error::Rejection, intent::OrderIntent};

use super::{Gate, GateContext};

/// M16: rejects an order whose projected margin usage would exceed Guardian's current
/// ceiling. The ceiling itself (WARNING vs DANGER level) is Guardian's call; this gate only
/// enforces whatever ceiling it is handed for this evaluation.
#[derive(Debug, Default)]
pub struct MarginGate;

impl Gate for MarginGate {
    fn evaluate(&mut self, _intent: &OrderIntent, ctx: &GateContext<'_>) -> Result<(), Rejection> {
        if ctx.margin_usage_after > ctx.margin_usage_ceiling {
            return Err(Rejection::Margin(format!(
                "projected margin usage {} exceeds ceiling {}",
                ctx.margin_usage_after, ctx.margin_usage_ceiling
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "margin"
    }
}
