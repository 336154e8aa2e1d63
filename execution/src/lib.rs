#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Engine-Execution
//! Order state machine, protection gates, and the auto-order engine that drives one broker
//! connection. Takes an [`intent::OrderIntent`] from a strategy, gates it, submits it, and
//! tracks it through to a terminal [`order::OrderState`] — retrying, chasing, or giving up per
//! broker callback and timer, and keeping a local [`position::PositionTracker`] honest against
//! what the broker reports.
//!
//! Deliberately ignorant of what runs above it: no strategy logic, no venue selection, no
//! supervisory mode decisions beyond what it's told through `engine_core::ModeProvider`.

pub mod audit;
pub mod broker;
pub mod cost;
pub mod engine;
pub mod error;
pub mod gates;
pub mod ids;
pub mod intent;
pub mod order;
pub mod pair;
pub mod position;
pub mod trade;

pub use audit::ExecutionAuditEvent;
pub use broker::{Broker, BrokerPosition, BrokerStatus, OrderField, RspInfo};
pub use engine::{AoeMode, AutoOrderEngine, EngineConfig};
pub use error::{BrokerError, CancelError, FatalError, Rejection};
pub use intent::OrderIntent;
pub use order::{OrderContext, OrderEvent, OrderState};
pub use pair::{PairExecutor, PairOutcome};
pub use position::{Position, PositionDrift, PositionTracker};
pub use trade::Trade;
