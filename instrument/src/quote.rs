use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::symbol::Symbol;

/// Default soft-staleness threshold: once a quote is older than this, the liquidity gate
/// refuses new opens but existing orders are left alone.
pub const DEFAULT_SOFT_STALE: Duration = Duration::from_millis(3_000);

/// Default hard-staleness threshold: once a quote is this old, Guardian is expected to force
/// `REDUCE_ONLY` regardless of what any single gate decides.
pub const DEFAULT_HARD_STALE: Duration = Duration::from_millis(10_000);

/// Top-of-book snapshot for one contract. Carries no lifecycle beyond last-write-wins: a
/// fresher `ts` always replaces an older quote, but out-of-order arrival (exchanges
/// occasionally resend) is not itself an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
    pub bid_vol: u32,
    pub ask_vol: u32,
    pub last: Decimal,
    pub volume: u64,
    pub open_interest: u64,
    /// Previous day's settlement price, refreshed once per trading day; feeds the limit-price
    /// gate's upper/lower bound calculation.
    pub last_settle: Option<Decimal>,
    pub ts: DateTime<Utc>,
}

impl Quote {
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::from(2)
    }

    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

/// In-memory `symbol -> Quote` map with staleness queries used by the liquidity gate and
/// Guardian's quote-stale anomaly detector.
#[derive(Debug, Default)]
pub struct QuoteCache {
    quotes: HashMap<Symbol, Quote>,
}

impl QuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-write-wins by `ts`; an update with an older timestamp than what's cached is
    /// dropped rather than rejected, since reordering is expected, not exceptional.
    pub fn update(&mut self, symbol: Symbol, quote: Quote) {
        match self.quotes.get(&symbol) {
            Some(existing) if existing.ts > quote.ts => {}
            _ => {
                self.quotes.insert(symbol, quote);
            }
        }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    fn age(&self, symbol: &Symbol, now: DateTime<Utc>) -> Option<Duration> {
        let quote = self.quotes.get(symbol)?;
        (now - quote.ts).to_std().ok()
    }

    pub fn is_soft_stale(&self, symbol: &Symbol, now: DateTime<Utc>, threshold: Duration) -> bool {
        match self.age(symbol, now) {
            Some(age) => age > threshold,
            None => true,
        }
    }

    pub fn is_hard_stale(&self, symbol: &Symbol, now: DateTime<Utc>, threshold: Duration) -> bool {
        match self.age(symbol, now) {
            Some(age) => age > threshold,
            None => true,
        }
    }
}
