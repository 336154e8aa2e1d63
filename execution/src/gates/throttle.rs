use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use engine_instrument::Symbol;

use crate::{error::Rejection, intent::OrderIntent};

use super::{Gate, GateContext};

#[derive(Debug, Clone, Copy)]
pub struct ThrottleConfig {
    pub max_orders_per_minute_global: usize,
    pub max_orders_per_minute_per_symbol: usize,
    pub min_inter_order_interval: Duration,
    /// Regulatory ceiling: report+cancel events in any trailing 5-second window.
    pub regulatory_5s_limit: usize,
    /// Regulatory ceiling: report+cancel events per trading day.
    pub regulatory_daily_limit: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_orders_per_minute_global: 300,
            max_orders_per_minute_per_symbol: 60,
            min_inter_order_interval: Duration::from_millis(100),
            regulatory_5s_limit: 50,
            regulatory_daily_limit: 20_000,
        }
    }
}

/// A circular buffer of timestamps per symbol plus one global deque, per §4.6.1. `record` must
/// be called by the caller once an intent has cleared every gate in the chain (a throttle
/// check itself does not count as an order event).
#[derive(Debug)]
pub struct ThrottleGate {
    config: ThrottleConfig,
    global: VecDeque<DateTime<Utc>>,
    per_symbol: HashMap<Symbol, VecDeque<DateTime<Utc>>>,
    daily_count: usize,
    daily_day: Option<chrono::NaiveDate>,
}

impl Default for ThrottleGate {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

impl ThrottleGate {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            global: VecDeque::new(),
            per_symbol: HashMap::new(),
            daily_count: 0,
            daily_day: None,
        }
    }

    fn config(&self) -> ThrottleConfig {
        self.config
    }

    /// Called once an intent has passed the entire gate chain and a report/cancel event has
    /// actually been sent to the broker.
    pub fn record(&mut self, symbol: &Symbol, now: DateTime<Utc>) {
        self.global.push_back(now);
        self.per_symbol.entry(symbol.clone()).or_default().push_back(now);

        let today = now.date_naive();
        if self.daily_day != Some(today) {
            self.daily_day = Some(today);
            self.daily_count = 0;
        }
        self.daily_count += 1;
    }

    fn evict_older_than(queue: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) {
        while let Some(front) = queue.front() {
            if now.signed_duration_since(*front) > chrono::Duration::from_std(window).unwrap_or_default() {
                queue.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Gate for ThrottleGate {
    fn evaluate(&mut self, intent: &OrderIntent, ctx: &GateContext<'_>) -> Result<(), Rejection> {
        let config = self.config();
        let now = ctx.now;
        let minute = Duration::from_secs(60);
        let five_seconds = Duration::from_secs(5);

        Self::evict_older_than(&mut self.global, now, minute);
        if let Some(last) = self.global.back() {
            let since_last = now.signed_duration_since(*last);
            if since_last < chrono::Duration::from_std(config.min_inter_order_interval).unwrap_or_default() {
                return Err(Rejection::Throttle("minimum inter-order interval not elapsed".into()));
            }
        }
        if self.global.len() >= config.max_orders_per_minute_global {
            return Err(Rejection::Throttle("global per-minute order limit reached".into()));
        }

        let mut global_5s = self.global.clone();
        Self::evict_older_than(&mut global_5s, now, five_seconds);
        if global_5s.len() >= config.regulatory_5s_limit {
            return Err(Rejection::Throttle("regulatory 5-second report+cancel ceiling reached".into()));
        }

        let today = now.date_naive();
        let daily_count = if self.daily_day == Some(today) { self.daily_count } else { 0 };
        if daily_count >= config.regulatory_daily_limit {
            return Err(Rejection::Throttle("regulatory daily report+cancel ceiling reached".into()));
        }

        if let Some(per_symbol) = self.per_symbol.get_mut(&intent.symbol) {
            Self::evict_older_than(per_symbol, now, minute);
            if per_symbol.len() >= config.max_orders_per_minute_per_symbol {
                return Err(Rejection::Throttle(format!(
                    "per-symbol per-minute order limit reached for {}",
                    intent.symbol
                )));
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "throttle"
    }
}
