use chrono::{DateTime, Utc};
use engine_instrument::Instrument;
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::{
    error::BrokerError,
    ids::{LocalId, OrderRef, OrderSysId, RouteId},
    intent::OrderIntent,
    order::OrderState,
};

/// Raw broker status codes, translated via [`translate_status`] into [`crate::order::OrderEvent`]
/// before reaching the state machine — the OSM itself never sees a wire-level code.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BrokerStatus {
    PendingQueue,
    Queued,
    PartialInQueue,
    Filled,
    Cancelled,
    PartialOutOfQueue,
    NotInQueue,
}

pub fn translate_status(status: BrokerStatus) -> crate::order::OrderEvent {
    use crate::order::OrderEvent as E;
    match status {
        BrokerStatus::PendingQueue => E::RtnPending,
        BrokerStatus::Queued => E::RtnAccepted,
        BrokerStatus::PartialInQueue => E::RtnPartialFilled,
        BrokerStatus::Filled => E::RtnFilled,
        BrokerStatus::Cancelled => E::RtnCancelled,
        BrokerStatus::PartialOutOfQueue => E::RtnPartialCancelled,
        BrokerStatus::NotInQueue => E::RtnNotInQueue,
    }
}

/// An order-status callback, correlated to an order via `order_ref`/`order_sys_id`/[`RouteId`].
#[derive(Debug, Clone)]
pub struct OrderField {
    pub order_ref: OrderRef,
    pub order_sys_id: Option<OrderSysId>,
    pub route: RouteId,
    pub status: BrokerStatus,
    pub time_exchange: DateTime<Utc>,
}

/// A broker-side rejection of a submission or cancellation request, carrying whatever
/// human-readable reason the broker supplied.
#[derive(Debug, Clone)]
pub struct RspInfo {
    pub order_ref: OrderRef,
    pub reason: String,
}

/// Opaque broker capability. The wire protocol, transport, and specific vendor SDK are out of
/// scope for this core — this trait is the seam a concrete adapter implements.
pub trait Broker
where
    Self: Send + Sync,
{
    fn place_order(
        &self,
        local_id: LocalId,
        intent: &OrderIntent,
    ) -> impl Future<Output = Result<OrderRef, BrokerError>> + Send;

    fn cancel_order(
        &self,
        order_ref: &OrderRef,
        order_sys_id: Option<&OrderSysId>,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;

    fn query_order(&self, order_ref: &OrderRef) -> impl Future<Output = Result<OrderState, BrokerError>> + Send;

    fn query_positions(&self) -> impl Future<Output = Result<Vec<BrokerPosition>, BrokerError>> + Send;
}

/// A position record as reported by the broker's own books, used by the PositionTracker's
/// reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub symbol: engine_instrument::Symbol,
    pub long_qty: rust_decimal::Decimal,
    pub long_today_qty: rust_decimal::Decimal,
    pub short_qty: rust_decimal::Decimal,
    pub short_today_qty: rust_decimal::Decimal,
}

/// Looks up the contract a trade or intent applies to; kept as a free function rather than a
/// method so the broker trait does not need to depend on a concrete cache implementation.
pub fn require_instrument<'a>(
    cache: &'a engine_instrument::InstrumentCache,
    symbol: &engine_instrument::Symbol,
) -> Option<&'a Instrument> {
    cache.get(symbol)
}
