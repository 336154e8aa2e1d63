use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{
    ids::{LocalId, OrderRef, OrderSysId, RouteId, TradeId},
    intent::OrderIntent,
};

/// The per-contract OSM state.
pub mod state;

pub use state::{OrderEvent, OrderState, TransitionMode, UnhandledTransition};

/// Internal, mutable record of one order's lifetime. Mutated only through
/// [`crate::engine::AutoOrderEngine`]'s state-machine transitions — nothing else is allowed to
/// write `state` or `filled_qty` directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderContext {
    pub local_id: LocalId,
    pub order_ref: Option<OrderRef>,
    pub order_sys_id: Option<OrderSysId>,
    pub route: Option<RouteId>,
    pub intent: OrderIntent,
    pub state: OrderState,
    pub filled_qty: Decimal,
    pub filled_amount: Decimal,
    pub processed_trade_ids: HashSet<TradeId>,
    pub retry_count: u32,
    pub chase_count: u32,
    pub create_ts: DateTime<Utc>,
    pub submit_ts: Option<DateTime<Utc>>,
    pub last_update_ts: DateTime<Utc>,
}

impl OrderContext {
    pub fn new(local_id: LocalId, intent: OrderIntent, now: DateTime<Utc>) -> Self {
        Self {
            local_id,
            order_ref: None,
            order_sys_id: None,
            route: None,
            intent,
            state: OrderState::Created,
            filled_qty: Decimal::ZERO,
            filled_amount: Decimal::ZERO,
            processed_trade_ids: HashSet::new(),
            retry_count: 0,
            chase_count: 0,
            create_ts: now,
            submit_ts: None,
            last_update_ts: now,
        }
    }

    /// `0` while unfilled, per the data model contract.
    pub fn avg_price(&self) -> Decimal {
        if self.filled_qty.is_zero() {
            Decimal::ZERO
        } else {
            self.filled_amount / self.filled_qty
        }
    }

    pub fn qty_remaining(&self) -> Decimal {
        self.intent.qty - self.filled_qty
    }

    /// Records a fill if `trade_id` has not already been applied to this order (I4);
    /// returns whether the fill event should be treated as a full or partial fill.
    pub fn apply_trade(&mut self, trade_id: TradeId, price: Decimal, qty: Decimal, now: DateTime<Utc>) -> Option<FillOutcome> {
        if self.processed_trade_ids.contains(&trade_id) {
            return None;
        }
        self.processed_trade_ids.insert(trade_id);
        self.filled_qty += qty;
        self.filled_amount += price * qty;
        self.last_update_ts = now;

        Some(if self.filled_qty >= self.intent.qty {
            FillOutcome::Full
        } else {
            FillOutcome::Partial
        })
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FillOutcome {
    Partial,
    Full,
}
