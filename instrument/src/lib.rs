#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Engine-Instrument
//! Immutable futures contract metadata, fee schedules, and the quote cache the execution core
//! reads when evaluating pre-trade gates.
//!
//! Everything here is either loaded once at startup ([`InstrumentCache`]) or last-write-wins
//! with no further lifecycle ([`QuoteCache`]). Nothing in this crate reads the wall clock:
//! staleness queries take `now` as an argument so replay can drive them deterministically.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Read-only, load-once-per-day contract metadata lookup.
pub mod cache;
/// Identifies the futures exchange a contract trades on.
pub mod exchange;
/// The immutable per-contract record: limits, margin, and commission schedule.
pub mod instrument;
/// Top-of-book snapshot cache with soft/hard staleness queries.
pub mod quote;
/// Cheap, cloneable contract identifier.
pub mod symbol;

pub use cache::{InstrumentCache, InstrumentCacheError};
pub use exchange::ExchangeId;
pub use instrument::{FeeSpec, Instrument, Offset, TradingSession};
pub use quote::{Quote, QuoteCache, DEFAULT_HARD_STALE, DEFAULT_SOFT_STALE};
pub use symbol::Symbol;

/// Side of an order or a position.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Side {
    #[serde(alias = "buy", alias = "BUY", alias = "b")]
    Buy,
    #[serde(alias = "sell", alias = "SELL", alias = "s")]
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Side::Buy => "buy",
                Side::Sell => "sell",
            }
        )
    }
}
