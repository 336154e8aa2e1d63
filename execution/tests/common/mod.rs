use std::sync::{Arc, Mutex};

use chrono::{NaiveTime, Utc};
use engine_execution::broker::{Broker, BrokerPosition, OrderField, RspInfo};
use engine_execution::error::BrokerError;
use engine_execution::gates::{CostGate, FatFingerConfig, FatFingerGate, GateChain, GuardianModeGate, LiquidityConfig, LiquidityGate, ThrottleConfig, ThrottleGate};
use engine_execution::ids::{LocalId, OrderRef, OrderSysId};
use engine_execution::{AutoOrderEngine, EngineConfig, OrderIntent};
use engine_core::ids::RunId;
use engine_core::{AuditLog, GuardianMode};
use engine_instrument::{ExchangeId, FeeSpec, Instrument, InstrumentCache, Offset, Quote, Side, Symbol, TradingSession};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// In-memory stand-in for a broker connection, grounded on the exchange-simulator shape the
/// teacher's own mock execution client uses: canned per-call responses, no real network I/O,
/// every request and cancellation recorded for assertions.
#[derive(Clone, Default)]
pub struct MockBroker {
    state: Arc<Mutex<MockBrokerState>>,
}

#[derive(Default)]
struct MockBrokerState {
    next_rejects: bool,
    placed: Vec<LocalId>,
    cancelled: Vec<OrderRef>,
    positions: Vec<BrokerPosition>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_next_submission(&self) {
        self.state.lock().unwrap().next_rejects = true;
    }

    pub fn placed_orders(&self) -> Vec<LocalId> {
        self.state.lock().unwrap().placed.clone()
    }

    pub fn cancelled_orders(&self) -> Vec<OrderRef> {
        self.state.lock().unwrap().cancelled.clone()
    }

    pub fn set_positions(&self, positions: Vec<BrokerPosition>) {
        self.state.lock().unwrap().positions = positions;
    }
}

impl Broker for MockBroker {
    async fn place_order(&self, local_id: LocalId, _intent: &OrderIntent) -> Result<OrderRef, BrokerError> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.next_rejects) {
            return Err(BrokerError::Api(engine_execution::error::ApiError::OrderRejected("no liquidity".into())));
        }
        state.placed.push(local_id);
        Ok(OrderRef::new(local_id.0.to_string()))
    }

    async fn cancel_order(&self, order_ref: &OrderRef, _order_sys_id: Option<&OrderSysId>) -> Result<(), BrokerError> {
        self.state.lock().unwrap().cancelled.push(order_ref.clone());
        Ok(())
    }

    async fn query_order(&self, _order_ref: &OrderRef) -> Result<engine_execution::OrderState, BrokerError> {
        Ok(engine_execution::OrderState::Created)
    }

    async fn query_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
        Ok(self.state.lock().unwrap().positions.clone())
    }
}

pub fn order_field(order_ref: OrderRef, status: engine_execution::broker::BrokerStatus) -> OrderField {
    OrderField { order_ref, order_sys_id: None, route: engine_execution::ids::RouteId { front_id: 1, session_id: 1 }, status, time_exchange: Utc::now() }
}

pub fn rsp_info(order_ref: OrderRef, reason: &str) -> RspInfo {
    RspInfo { order_ref, reason: reason.to_string() }
}

fn fixture_instrument(symbol: &str) -> Instrument {
    Instrument {
        symbol: Symbol::new(symbol),
        product: Symbol::new(symbol.trim_end_matches(|c: char| c.is_ascii_digit())),
        exchange: ExchangeId::Mock,
        expire_date: Utc::now().date_naive() + chrono::Duration::days(90),
        tick_size: dec!(1),
        multiplier: dec!(10),
        upper_limit_pct: dec!(0.1),
        lower_limit_pct: dec!(0.1),
        margin_rate: dec!(0.1),
        spec_margin_rate: None,
        trading_sessions: vec![TradingSession { start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(), end: NaiveTime::from_hms_opt(23, 59, 59).unwrap() }],
        max_order_volume: 1000,
        position_limit: 10_000,
        fee_spec: FeeSpec::ByRate { rate: dec!(0.0001), close_today_rate: None },
    }
}

fn permissive_gates() -> GateChain<engine_execution::engine::SharedMode> {
    GateChain {
        throttle: ThrottleGate::new(ThrottleConfig {
            max_orders_per_minute_global: 10_000,
            max_orders_per_minute_per_symbol: 10_000,
            min_inter_order_interval: std::time::Duration::from_millis(0),
            regulatory_5s_limit: 10_000,
            regulatory_daily_limit: 1_000_000,
        }),
        fat_finger: FatFingerGate::new(FatFingerConfig { max_qty: dec!(10_000), max_notional: dec!(1_000_000_000), max_price_deviation: dec!(1) }),
        limit_price: Default::default(),
        liquidity: LiquidityGate::new(LiquidityConfig { max_spread_ticks: dec!(1000), min_bid_ask_vol: 0 }),
        margin: engine_execution::gates::MarginGate,
        guardian_mode: GuardianModeGate::new(Arc::new(engine_execution::engine::SharedMode::new(GuardianMode::Running))),
        cost: CostGate::new(engine_execution::cost::CostEstimator::new(Default::default())),
    }
}

/// Builds an engine over `broker`, one fixture contract (`"rb2410"`), and a live permissive
/// quote, so submissions clear every gate without the test needing to tune each one.
pub fn fixture_engine(broker: MockBroker, audit_dir: &std::path::Path) -> AutoOrderEngine<MockBroker> {
    fixture_engine_with_gates(broker, audit_dir, permissive_gates())
}

/// Same as [`fixture_engine`] but with a tighter fat-finger quantity cap, for gate-rejection
/// scenarios that would otherwise need to reach past the fixture instrument's own limits.
pub fn fixture_engine_with_max_qty(broker: MockBroker, audit_dir: &std::path::Path, max_qty: Decimal) -> AutoOrderEngine<MockBroker> {
    let mut gates = permissive_gates();
    gates.fat_finger = FatFingerGate::new(FatFingerConfig { max_qty, max_notional: dec!(1_000_000_000), max_price_deviation: dec!(1) });
    fixture_engine_with_gates(broker, audit_dir, gates)
}

/// Same as [`fixture_engine`] but with a tighter minimum inter-order interval, for exercising
/// the throttle gate's `record`-then-reject path.
pub fn fixture_engine_with_min_inter_order_interval(broker: MockBroker, audit_dir: &std::path::Path, interval: std::time::Duration) -> AutoOrderEngine<MockBroker> {
    let mut gates = permissive_gates();
    gates.throttle = ThrottleGate::new(ThrottleConfig { min_inter_order_interval: interval, ..ThrottleConfig::default() });
    fixture_engine_with_gates(broker, audit_dir, gates)
}

fn fixture_engine_with_gates(broker: MockBroker, audit_dir: &std::path::Path, gates: GateChain<engine_execution::engine::SharedMode>) -> AutoOrderEngine<MockBroker> {
    let instruments = InstrumentCache::from_instruments([fixture_instrument("rb2410")]);
    let mode = engine_execution::engine::SharedMode::new(GuardianMode::Running);
    let run_id = RunId::generate();
    let audit = AuditLog::create(audit_dir, Utc::now(), run_id).unwrap();
    let mut engine = AutoOrderEngine::new(broker, instruments, gates, mode, EngineConfig::default(), audit, run_id);
    engine.update_quote(
        Symbol::new("rb2410"),
        Quote { bid: dec!(3500), ask: dec!(3501), bid_vol: 100, ask_vol: 100, last: dec!(3500), volume: 1000, open_interest: 5000, last_settle: Some(dec!(3500)), ts: Utc::now() },
    );
    engine
}

pub fn fixture_intent(side: Side, offset: Offset, qty: Decimal) -> OrderIntent {
    OrderIntent {
        symbol: Symbol::new("rb2410"),
        side,
        offset,
        price: dec!(3500),
        qty,
        reason: "test".into(),
        strategy_id: engine_execution::ids::StrategyId::unknown(),
        signal_edge: None,
    }
}
