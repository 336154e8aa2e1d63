use engine_instrument::Symbol;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::LocalId;

/// Why a gate refused to let an intent through. Recoverable: the intent is dropped and
/// audited; the caller may resubmit a different intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum Rejection {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(Symbol),

    #[error("throttle: {0}")]
    Throttle(String),

    #[error("fat-finger: {0}")]
    FatFinger(String),

    #[error("limit-price: {0}")]
    LimitPrice(String),

    #[error("liquidity: {0}")]
    Liquidity(String),

    #[error("margin: {0}")]
    Margin(String),

    #[error("guardian mode forbids this intent: {0}")]
    GuardianMode(String),

    #[error("cost gate: projected edge does not clear estimated cost")]
    Cost,
}

/// Returned by `cancel(local_id)`. Per I7, cancelling an order already in a terminal state is
/// not an error — only a genuinely unknown `local_id` or a transport failure is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum CancelError {
    #[error("no such order: {0}")]
    UnknownOrder(LocalId),

    #[error("broker: {0}")]
    Broker(#[from] BrokerError),
}

/// Mirrors the teacher ecosystem's `ConnectivityError`/`ApiError` split: connectivity failures
/// are transient and retryable, API failures are the broker's considered rejection of the
/// request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum BrokerError {
    #[error("connectivity: {0}")]
    Connectivity(#[from] ConnectivityError),

    #[error("api: {0}")]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ConnectivityError {
    #[error("broker offline")]
    Offline,

    #[error("request timed out")]
    Timeout,

    #[error("transport: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ApiError {
    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("order already cancelled")]
    OrderAlreadyCancelled,

    #[error("order already fully filled")]
    OrderAlreadyFullyFilled,

    #[error("unknown order reference")]
    UnknownOrderRef,
}

/// The handful of failures that are allowed to propagate past a component boundary and
/// terminate the event loop — everything else is absorbed and translated into an audit event.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("audit: {0}")]
    Audit(#[from] engine_core::AuditWriteError),

    #[error("instrument cache corrupted: {0}")]
    CorruptedCache(String),
}
