use chrono::{DateTime, Utc};
use engine_instrument::{Side, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{LocalId, TradeId};

/// One fill, as delivered by the broker's trade callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub local_id: LocalId,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Decimal,
    pub qty: Decimal,
    pub time_exchange: DateTime<Utc>,
}

impl Trade {
    pub fn notional(&self) -> Decimal {
        self.price * self.qty
    }
}
