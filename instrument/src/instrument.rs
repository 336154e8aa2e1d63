use chrono::{NaiveDate, NaiveTime};
use derive_more::{Constructor, Display};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{exchange::ExchangeId, symbol::Symbol};

/// Whether an order opens new exposure or reduces existing exposure, and — for reductions —
/// whether it closes a position opened earlier today (often fee-favoured) or on a prior day.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Offset {
    Open,
    Close,
    CloseToday,
}

impl Offset {
    pub fn is_close(&self) -> bool {
        matches!(self, Offset::Close | Offset::CloseToday)
    }
}

/// One trading window within a contract's day, eg/ the night session `21:00–23:00`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Constructor, Serialize, Deserialize)]
pub struct TradingSession {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TradingSession {
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time <= self.end
        } else {
            // overnight session wrapping past midnight
            time >= self.start || time <= self.end
        }
    }
}

/// A commission schedule. Exchanges quote commission either as a rate against notional, a flat
/// amount per lot, or whichever of the two is larger — `Mixed` exists because some contracts
/// (index futures close-outs in particular) are billed the larger of the two to discourage
/// wash trading.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeeSpec {
    ByRate {
        rate: Decimal,
        /// `None` ⇒ close-today is billed at the same rate as open/close.
        close_today_rate: Option<Decimal>,
    },
    ByLot {
        yuan_per_lot: Decimal,
        close_today_yuan_per_lot: Option<Decimal>,
    },
    Mixed {
        rate: Decimal,
        yuan_per_lot: Decimal,
        close_today_rate: Option<Decimal>,
        close_today_yuan_per_lot: Option<Decimal>,
    },
}

impl FeeSpec {
    /// Computes the commission for a fill of `qty` lots at `price`, given the contract's
    /// `multiplier` and whether this fill closes a position opened earlier today.
    pub fn fee(&self, offset: Offset, price: Decimal, multiplier: Decimal, qty: Decimal) -> Decimal {
        let closing_today = matches!(offset, Offset::CloseToday);
        match self {
            FeeSpec::ByRate { rate, close_today_rate } => {
                let rate = if closing_today {
                    close_today_rate.unwrap_or(*rate)
                } else {
                    *rate
                };
                rate * price * multiplier * qty
            }
            FeeSpec::ByLot { yuan_per_lot, close_today_yuan_per_lot } => {
                let per_lot = if closing_today {
                    close_today_yuan_per_lot.unwrap_or(*yuan_per_lot)
                } else {
                    *yuan_per_lot
                };
                per_lot * qty
            }
            FeeSpec::Mixed {
                rate,
                yuan_per_lot,
                close_today_rate,
                close_today_yuan_per_lot,
            } => {
                let rate = if closing_today {
                    close_today_rate.unwrap_or(*rate)
                } else {
                    *rate
                };
                let per_lot = if closing_today {
                    close_today_yuan_per_lot.unwrap_or(*yuan_per_lot)
                } else {
                    *yuan_per_lot
                };
                (rate * price * multiplier * qty).max(per_lot * qty)
            }
        }
    }
}

/// Immutable futures contract metadata, loaded once per trading day by the
/// [`InstrumentCache`](crate::cache::InstrumentCache).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: Symbol,
    /// The underlying product code shared by every contract month, eg/ `"rb"` for rebar.
    pub product: Symbol,
    pub exchange: ExchangeId,
    pub expire_date: NaiveDate,
    pub tick_size: Decimal,
    pub multiplier: Decimal,
    pub upper_limit_pct: Decimal,
    pub lower_limit_pct: Decimal,
    pub margin_rate: Decimal,
    /// Falls back to `margin_rate` when absent; used by the near-delivery margin gate.
    pub spec_margin_rate: Option<Decimal>,
    pub trading_sessions: Vec<TradingSession>,
    pub max_order_volume: u32,
    pub position_limit: u32,
    pub fee_spec: FeeSpec,
}

impl Instrument {
    /// The margin rate the margin gate should use, accounting for the near-delivery override.
    pub fn effective_margin_rate(&self) -> Decimal {
        self.spec_margin_rate.unwrap_or(self.margin_rate)
    }

    pub fn is_in_session(&self, time: NaiveTime) -> bool {
        self.trading_sessions.iter().any(|session| session.contains(time))
    }
}
