use engine_instrument::{Offset, Side, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::StrategyId;

/// A request from the strategy layer to trade one contract. Immutable once constructed — the
/// gates and the OSM only ever consume it, never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: Symbol,
    pub side: Side,
    pub offset: Offset,
    pub price: Decimal,
    pub qty: Decimal,
    pub reason: String,
    pub strategy_id: StrategyId,
    /// The strategy's expected edge for this trade, in price terms. Absent when the strategy
    /// did not produce a cost estimate for this particular intent (eg/ a flatten triggered by
    /// Guardian); the cost gate skips itself rather than reject in that case.
    pub signal_edge: Option<Decimal>,
}

impl OrderIntent {
    pub fn notional(&self) -> Decimal {
        self.price * self.qty
    }
}
