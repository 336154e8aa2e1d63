use derive_more::{Constructor, Display, From};
use engine_core::ids::ExecId;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use uuid::Uuid;

/// The engine's own identifier for an order, generated once at `submit` time and carried
/// through every OSM transition and audit record for that order's lifetime. Never the same as
/// the broker's own identifiers, which only exist once the broker has acknowledged the order.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Constructor, From, Serialize, Deserialize,
)]
pub struct LocalId(pub Uuid);

impl LocalId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// The strategy decision cycle an order's creation is attributed to, for audit correlation.
pub type StrategyExecId = ExecId;

/// Client-assigned order reference echoed back by the broker on acknowledgement.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, From, Serialize, Deserialize)]
pub struct OrderRef(pub SmolStr);

impl OrderRef {
    pub fn new<S: Into<SmolStr>>(value: S) -> Self {
        Self(value.into())
    }
}

/// Exchange-assigned order identifier, present once the order reaches the matching engine.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, From, Serialize, Deserialize)]
pub struct OrderSysId(pub SmolStr);

impl OrderSysId {
    pub fn new<S: Into<SmolStr>>(value: S) -> Self {
        Self(value.into())
    }
}

/// Routing identifiers a CTP-style gateway uses to correlate callbacks with the session that
/// submitted the order, alongside `OrderRef`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct RouteId {
    pub front_id: i32,
    pub session_id: i32,
}

/// Unique identifier for a single fill, used to de-duplicate broker trade callbacks (I4).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, From, Serialize, Deserialize)]
pub struct TradeId(pub SmolStr);

impl TradeId {
    pub fn new<S: Into<SmolStr>>(value: S) -> Self {
        Self(value.into())
    }
}

/// Groups the events of one two-leg spread submission sharing a single audit correlation id.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Constructor, From, Serialize, Deserialize,
)]
pub struct PairExecId(pub Uuid);

impl PairExecId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Identifies the strategy that produced an [`crate::intent::OrderIntent`], carried through for
/// attribution in the audit trail.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, From, Serialize, Deserialize)]
pub struct StrategyId(pub SmolStr);

impl StrategyId {
    pub fn new<S: Into<SmolStr>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn unknown() -> Self {
        Self(SmolStr::new_static("unknown"))
    }
}
