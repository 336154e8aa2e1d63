use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use engine_core::{
    audit::AuditEnvelope,
    detrand::DeterministicRng,
    ids::{ExecId, RunId},
    AuditLog, GuardianMode, ModeProvider,
};
use engine_instrument::{InstrumentCache, QuoteCache, Symbol};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::{
    audit::ExecutionAuditEvent,
    broker::{translate_status, Broker, BrokerPosition, OrderField, RspInfo},
    error::{CancelError, Rejection},
    gates::{GateChain, GateContext},
    ids::LocalId,
    intent::OrderIntent,
    order::{FillOutcome, OrderContext, OrderEvent, OrderState, TransitionMode},
    position::PositionTracker,
    trade::Trade,
};

/// Tunables for the recovery policy described in §4.8 of the engine's configuration surface.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub ack_timeout: Duration,
    pub fill_timeout: Duration,
    pub cancel_timeout: Duration,
    pub max_retry_submit: u32,
    pub max_retry_cancel: u32,
    pub max_chase: u32,
    pub chase_tick_offset: Decimal,
    pub retry_backoff_base: Duration,
    pub retry_backoff_max: Duration,
    pub margin_usage_ceiling: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(3),
            fill_timeout: Duration::from_secs(10),
            cancel_timeout: Duration::from_secs(3),
            max_retry_submit: 3,
            max_retry_cancel: 3,
            max_chase: 2,
            chase_tick_offset: Decimal::from(2),
            retry_backoff_base: Duration::from_millis(200),
            retry_backoff_max: Duration::from_secs(5),
            margin_usage_ceiling: Decimal::new(8, 1), // 0.8
        }
    }
}

/// One of the three modes the engine itself is driven through by the supervisor. `Init` and
/// `Manual` are Guardian-only postures; the engine never sets them on itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AoeMode {
    Running,
    ReduceOnly,
    Halted,
}

/// A [`ModeProvider`] the engine and its gate chain share, updated in place by `set_mode`
/// without requiring the engine to depend on whatever concretely computes the mode.
#[derive(Debug, Clone)]
pub struct SharedMode(Arc<RwLock<GuardianMode>>);

impl SharedMode {
    pub fn new(mode: GuardianMode) -> Self {
        Self(Arc::new(RwLock::new(mode)))
    }

    pub fn set(&self, mode: GuardianMode) {
        *self.0.write() = mode;
    }
}

impl ModeProvider for SharedMode {
    fn current_mode(&self) -> GuardianMode {
        *self.0.read()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct OrderTimers {
    ack_deadline: Option<DateTime<Utc>>,
    fill_deadline: Option<DateTime<Utc>>,
    cancel_deadline: Option<DateTime<Utc>>,
    retry_ready_at: Option<DateTime<Utc>>,
}

/// Drives one contract's orders through the state machine end to end: gate evaluation on
/// submit, broker correlation on every callback, and the timeout/retry/chase recovery policy
/// on every `tick`. Owns nothing about market data ingestion or the supervisor's anomaly
/// detection — those are the `QuoteCache` producer and Guardian's job respectively.
pub struct AutoOrderEngine<B> {
    broker: B,
    instruments: InstrumentCache,
    quotes: QuoteCache,
    positions: PositionTracker,
    gates: GateChain<SharedMode>,
    mode: SharedMode,
    aoe_mode: AoeMode,
    orders: HashMap<LocalId, OrderContext>,
    by_order_ref: HashMap<crate::ids::OrderRef, LocalId>,
    timers: HashMap<LocalId, OrderTimers>,
    avg_daily_volume: HashMap<Symbol, Decimal>,
    /// Orders whose cancel was chase-initiated: the next `RtnCancelled` for one of these
    /// local ids resubmits at the shifted price instead of settling into `Cancelled`.
    chase_pending: std::collections::HashSet<LocalId>,
    config: EngineConfig,
    audit: AuditLog,
    run_id: RunId,
    rng: DeterministicRng,
}

impl<B: Broker> AutoOrderEngine<B> {
    pub fn new(
        broker: B,
        instruments: InstrumentCache,
        gates: GateChain<SharedMode>,
        mode: SharedMode,
        config: EngineConfig,
        audit: AuditLog,
        run_id: RunId,
    ) -> Self {
        Self {
            broker,
            instruments,
            quotes: QuoteCache::new(),
            positions: PositionTracker::new(),
            gates,
            mode,
            aoe_mode: AoeMode::Running,
            orders: HashMap::new(),
            by_order_ref: HashMap::new(),
            timers: HashMap::new(),
            avg_daily_volume: HashMap::new(),
            chase_pending: std::collections::HashSet::new(),
            config,
            audit,
            run_id,
            rng: DeterministicRng::from_run_id(run_id),
        }
    }

    pub fn update_quote(&mut self, symbol: Symbol, quote: engine_instrument::Quote) {
        self.quotes.update(symbol, quote);
    }

    pub fn set_avg_daily_volume(&mut self, symbol: Symbol, volume: Decimal) {
        self.avg_daily_volume.insert(symbol, volume);
    }

    pub fn order(&self, local_id: LocalId) -> Option<&OrderContext> {
        self.orders.get(&local_id)
    }

    pub fn positions(&self) -> &PositionTracker {
        &self.positions
    }

    pub fn quotes(&self) -> &QuoteCache {
        &self.quotes
    }

    /// Compares local books against the broker's own; Guardian's position-drift detector reads
    /// the result on its own tick rather than having the engine push anomalies directly.
    pub fn reconcile_positions(&mut self, broker_positions: &[BrokerPosition], now: DateTime<Utc>) -> Vec<crate::position::PositionDrift> {
        self.positions.reconcile(broker_positions, now)
    }

    pub(crate) fn audit(&mut self, now: DateTime<Utc>, event: ExecutionAuditEvent) {
        let envelope = AuditEnvelope::new(now, self.run_id, ExecId::generate(), event);
        let _ = self.audit.append(&envelope);
    }

    /// Sets the engine's own operating mode. `Halted` additionally cancels every live order.
    pub async fn set_mode(&mut self, mode: AoeMode, now: DateTime<Utc>) {
        self.aoe_mode = mode;
        self.mode.set(match mode {
            AoeMode::Running => GuardianMode::Running,
            AoeMode::ReduceOnly => GuardianMode::ReduceOnly,
            AoeMode::Halted => GuardianMode::Halted,
        });
        if mode == AoeMode::Halted {
            self.cancel_all(now).await;
        }
    }

    pub async fn cancel_all(&mut self, now: DateTime<Utc>) {
        let live: Vec<LocalId> = self
            .orders
            .values()
            .filter(|ctx| ctx.state.is_active())
            .map(|ctx| ctx.local_id)
            .collect();
        for local_id in live {
            let _ = self.cancel(local_id, now).await;
        }
    }

    /// Pushes `intent` through the gate chain and, on success, submits it to the broker.
    pub async fn submit(&mut self, intent: OrderIntent, now: DateTime<Utc>) -> Result<OrderContext, Rejection> {
        let Some(instrument) = self.instruments.get(&intent.symbol) else {
            return Err(Rejection::UnknownSymbol(intent.symbol.clone()));
        };

        let current_position_qty = self.positions.get(&intent.symbol).map(|p| p.net_qty()).unwrap_or(Decimal::ZERO);
        let avg_daily_volume = self.avg_daily_volume.get(&intent.symbol).copied().unwrap_or(Decimal::ZERO);
        let ctx = GateContext {
            instrument,
            quotes: &self.quotes,
            now,
            current_position_qty,
            margin_usage_ceiling: self.config.margin_usage_ceiling,
            margin_usage_after: current_position_qty.abs() + intent.qty,
            avg_daily_volume,
        };

        if let Err((rejection, gate)) = self.gates.evaluate(&intent, &ctx) {
            self.audit(now, ExecutionAuditEvent::OrderRejected { intent, rejection: rejection.clone(), gate });
            return Err(rejection);
        }

        let local_id = LocalId::generate();
        let mut order = OrderContext::new(local_id, intent, now);
        order.state = OrderState::Submitting;
        order.submit_ts = Some(now);
        self.audit(now, ExecutionAuditEvent::OrderSubmitted { local_id, intent: order.intent.clone() });

        match self.broker.place_order(local_id, &order.intent).await {
            Ok(order_ref) => {
                self.by_order_ref.insert(order_ref.clone(), local_id);
                order.order_ref = Some(order_ref);
                self.gates.throttle.record(&order.intent.symbol, now);
            }
            Err(_) => {
                order.state = OrderState::Error;
            }
        }

        self.timers.insert(
            local_id,
            OrderTimers { ack_deadline: Some(now + chrono::Duration::from_std(self.config.ack_timeout).unwrap_or_default()), ..Default::default() },
        );
        self.orders.insert(local_id, order.clone());
        Ok(order)
    }

    /// Idempotent on a terminal order per I7.
    pub async fn cancel(&mut self, local_id: LocalId, now: DateTime<Utc>) -> Result<(), CancelError> {
        let Some(order) = self.orders.get(&local_id) else {
            return Err(CancelError::UnknownOrder(local_id));
        };
        if order.state.is_terminal() {
            return Ok(());
        }

        let order_ref = order.order_ref.clone();
        let order_sys_id = order.order_sys_id.clone();
        let symbol = order.intent.symbol.clone();
        self.audit(now, ExecutionAuditEvent::CancelRequested { local_id });

        if let Some(order_ref) = order_ref {
            self.broker.cancel_order(&order_ref, order_sys_id.as_ref()).await?;
        }
        self.gates.throttle.record(&symbol, now);

        self.transition(local_id, OrderEvent::Cancel, now);
        if let Some(timers) = self.timers.get_mut(&local_id) {
            timers.cancel_deadline = Some(now + chrono::Duration::from_std(self.config.cancel_timeout).unwrap_or_default());
        }
        Ok(())
    }

    fn transition(&mut self, local_id: LocalId, event: OrderEvent, now: DateTime<Utc>) {
        let Some(order) = self.orders.get_mut(&local_id) else { return };
        let from = order.state;
        match crate::order::state::transition(from, event, TransitionMode::Tolerant) {
            Ok(to) => {
                order.state = to;
                order.last_update_ts = now;
                if to != from {
                    self.audit(now, ExecutionAuditEvent::OrderStateTransition { local_id, from, to, trigger: event });
                }
            }
            Err(err) => {
                tracing::warn!(%err, "unhandled transition (tolerant mode absorbed it)");
            }
        }
    }

    pub async fn on_order_callback(&mut self, field: OrderField, now: DateTime<Utc>) {
        let Some(&local_id) = self.by_order_ref.get(&field.order_ref) else {
            tracing::warn!(order_ref = %field.order_ref, "order callback for unknown order_ref");
            return;
        };

        if let Some(order) = self.orders.get_mut(&local_id) {
            order.order_sys_id = order.order_sys_id.clone().or(field.order_sys_id.clone());
            order.route = Some(field.route);
        }

        // OrderStatus='4' (not-in-queue) ambiguity: a zero-fill report is an error, not a
        // partial cancel, since nothing of the order ever reached the book.
        let event = if matches!(field.status, crate::broker::BrokerStatus::NotInQueue) {
            let filled_is_zero = self.orders.get(&local_id).map(|o| o.filled_qty.is_zero()).unwrap_or(true);
            if filled_is_zero {
                OrderEvent::GiveUp
            } else {
                OrderEvent::RtnNotInQueue
            }
        } else {
            translate_status(field.status)
        };

        if matches!(event, OrderEvent::GiveUp) {
            if let Some(retry_count) = self.orders.get(&local_id).map(|o| o.retry_count) {
                self.audit(now, ExecutionAuditEvent::OrderGaveUp { local_id, retry_count });
            }
        }

        // A chase-initiated cancel confirmation resubmits at the already-shifted price instead
        // of settling into the generically-tabled terminal CANCELLED state.
        if matches!(event, OrderEvent::RtnCancelled) && self.chase_pending.remove(&local_id) {
            self.resubmit_chase(local_id, now).await;
            return;
        }

        self.transition(local_id, event, now);
        if matches!(event, OrderEvent::RtnAccepted | OrderEvent::RtnPending) {
            if let Some(timers) = self.timers.get_mut(&local_id) {
                timers.ack_deadline = None;
                timers.fill_deadline = Some(now + chrono::Duration::from_std(self.config.fill_timeout).unwrap_or_default());
            }
        }
    }

    pub fn on_trade_callback(&mut self, trade: Trade, now: DateTime<Utc>) {
        let local_id = trade.local_id;
        let Some(order) = self.orders.get_mut(&local_id) else {
            tracing::warn!(local_id = %local_id, "trade callback for unknown order");
            return;
        };

        let Some(outcome) = order.apply_trade(trade.id.clone(), trade.price, trade.qty, now) else {
            return; // duplicate trade_id (I4): silently absorbed
        };

        let (symbol, side, offset, filled_qty) = (order.intent.symbol.clone(), order.intent.side, order.intent.offset, order.filled_qty);
        self.positions.apply_fill(&symbol, side, offset, trade.price, trade.qty);
        self.audit(now, ExecutionAuditEvent::OrderFilled { local_id, price: trade.price, qty: trade.qty, filled_qty });

        let event = match outcome {
            FillOutcome::Full => OrderEvent::RtnFilled,
            FillOutcome::Partial => OrderEvent::RtnPartialFilled,
        };
        self.transition(local_id, event, now);
    }

    pub fn on_insert_rejected(&mut self, rsp: RspInfo, now: DateTime<Utc>) {
        let Some(&local_id) = self.by_order_ref.get(&rsp.order_ref) else {
            tracing::warn!(order_ref = %rsp.order_ref, reason = %rsp.reason, "insert rejection for unknown order_ref");
            return;
        };
        self.transition(local_id, OrderEvent::RtnRejected, now);
    }

    pub fn on_action_rejected(&mut self, rsp: RspInfo, now: DateTime<Utc>) {
        tracing::warn!(order_ref = %rsp.order_ref, reason = %rsp.reason, "cancel/action rejected by broker");
        self.audit(now, ExecutionAuditEvent::ActionRejected { order_ref: rsp.order_ref, reason: rsp.reason });
    }

    /// Drives every timer forward. Call at the main loop's cadence (design target: sub-second).
    pub async fn tick(&mut self, now: DateTime<Utc>) {
        let due: Vec<LocalId> = self
            .timers
            .iter()
            .filter_map(|(local_id, timers)| {
                let expired = [timers.ack_deadline, timers.fill_deadline, timers.cancel_deadline, timers.retry_ready_at]
                    .into_iter()
                    .flatten()
                    .any(|deadline| now >= deadline);
                expired.then_some(*local_id)
            })
            .collect();

        for local_id in due {
            self.handle_timer(local_id, now).await;
        }
    }

    async fn handle_timer(&mut self, local_id: LocalId, now: DateTime<Utc>) {
        let Some(state) = self.orders.get(&local_id).map(|o| o.state) else { return };
        let timers = self.timers.get(&local_id).copied().unwrap_or_default();

        match state {
            OrderState::Submitting if timers.ack_deadline.is_some_and(|d| now >= d) => {
                self.transition(local_id, OrderEvent::TimeoutAck, now);
                self.handle_query_and_retry(local_id, now).await;
            }
            OrderState::Pending if timers.fill_deadline.is_some_and(|d| now >= d) => {
                self.handle_fill_timeout(local_id, now).await;
            }
            OrderState::PartialFilled if timers.fill_deadline.is_some_and(|d| now >= d) => {
                let _ = self.cancel(local_id, now).await;
            }
            OrderState::CancelSubmitting if timers.cancel_deadline.is_some_and(|d| now >= d) => {
                self.transition(local_id, OrderEvent::TimeoutCancel, now);
                self.handle_query_and_retry(local_id, now).await;
            }
            OrderState::RetryPending if timers.retry_ready_at.is_some_and(|d| now >= d) => {
                self.promote_retry(local_id, now).await;
            }
            _ => {}
        }
    }

    /// Queries the broker for an order stuck on an ack or cancel timeout, then moves it to
    /// `RETRY_PENDING` and decides immediately whether a retry is still within budget.
    async fn handle_query_and_retry(&mut self, local_id: LocalId, now: DateTime<Utc>) {
        if let Some(order_ref) = self.orders.get(&local_id).and_then(|o| o.order_ref.clone()) {
            let _ = self.broker.query_order(&order_ref).await;
        }
        self.transition(local_id, OrderEvent::QueryOk, now);
        self.schedule_retry_or_give_up(local_id, now);
    }

    /// Called once an order has reached `RETRY_PENDING`: either schedules the backoff timer
    /// that `tick` will later promote back to `SUBMITTING`, or gives up outright once
    /// `max_retry_submit` is exhausted.
    fn schedule_retry_or_give_up(&mut self, local_id: LocalId, now: DateTime<Utc>) {
        let Some(retry_count) = self.orders.get(&local_id).map(|o| o.retry_count) else { return };
        if retry_count >= self.config.max_retry_submit {
            self.give_up(local_id, now);
            return;
        }

        if let Some(order) = self.orders.get_mut(&local_id) {
            order.retry_count += 1;
        }
        let backoff = exponential_backoff(self.config.retry_backoff_base, self.config.retry_backoff_max, retry_count + 1);
        let jitter = self.rng.jitter(backoff);
        if let Some(timers) = self.timers.get_mut(&local_id) {
            timers.retry_ready_at = Some(now + chrono::Duration::from_std(backoff + jitter).unwrap_or_default());
        }
    }

    async fn promote_retry(&mut self, local_id: LocalId, now: DateTime<Utc>) {
        self.transition(local_id, OrderEvent::Retry, now);
        let Some(intent) = self.orders.get(&local_id).map(|o| o.intent.clone()) else { return };
        match self.broker.place_order(local_id, &intent).await {
            Ok(order_ref) => {
                self.by_order_ref.insert(order_ref.clone(), local_id);
                if let Some(order) = self.orders.get_mut(&local_id) {
                    order.order_ref = Some(order_ref);
                }
                if let Some(timers) = self.timers.get_mut(&local_id) {
                    timers.retry_ready_at = None;
                    timers.ack_deadline = Some(now + chrono::Duration::from_std(self.config.ack_timeout).unwrap_or_default());
                }
                self.chase_pending.remove(&local_id);
            }
            Err(_) => self.give_up(local_id, now),
        }
    }

    /// Shifts `intent.price` toward the market, cancels the live order, and flags it so the
    /// next `RtnCancelled` for this `local_id` resubmits at the chased price via
    /// `resubmit_chase` rather than settling into `Cancelled`.
    async fn handle_fill_timeout(&mut self, local_id: LocalId, now: DateTime<Utc>) {
        let Some((chase_count, side, price, symbol, order_ref)) = self.orders.get(&local_id).map(|o| {
            (o.chase_count, o.intent.side, o.intent.price, o.intent.symbol.clone(), o.order_ref.clone())
        }) else {
            return;
        };

        if chase_count >= self.config.max_chase {
            let _ = self.cancel(local_id, now).await;
            return;
        }

        let tick_size = self.instruments.get(&symbol).map(|i| i.tick_size).unwrap_or(Decimal::ZERO);
        let shift = self.config.chase_tick_offset * tick_size * Decimal::from(chase_count + 1);
        let chased_price = match side {
            engine_instrument::Side::Buy => price + shift,
            engine_instrument::Side::Sell => price - shift,
        };

        if let Some(order_ref) = order_ref {
            let _ = self.broker.cancel_order(&order_ref, None).await;
            self.gates.throttle.record(&symbol, now);
        }
        if let Some(order) = self.orders.get_mut(&local_id) {
            order.chase_count += 1;
            order.intent.price = chased_price;
        }
        self.chase_pending.insert(local_id);
        self.transition(local_id, OrderEvent::Cancel, now);
        if let Some(timers) = self.timers.get_mut(&local_id) {
            timers.fill_deadline = None;
            timers.cancel_deadline = Some(now + chrono::Duration::from_std(self.config.cancel_timeout).unwrap_or_default());
        }
    }

    /// Promotes a chase-initiated cancel confirmation through `CHASE_PENDING` straight back to
    /// `SUBMITTING`, mirroring `promote_retry`'s shape but triggered by the broker's cancel
    /// confirmation rather than a backoff timer.
    async fn resubmit_chase(&mut self, local_id: LocalId, now: DateTime<Utc>) {
        let Some(from) = self.orders.get(&local_id).map(|o| o.state) else { return };
        if let Some(order) = self.orders.get_mut(&local_id) {
            order.state = OrderState::ChasePending;
            order.last_update_ts = now;
        }
        self.audit(now, ExecutionAuditEvent::OrderStateTransition { local_id, from, to: OrderState::ChasePending, trigger: OrderEvent::RtnCancelled });

        self.transition(local_id, OrderEvent::Submit, now);
        let Some(intent) = self.orders.get(&local_id).map(|o| o.intent.clone()) else { return };
        match self.broker.place_order(local_id, &intent).await {
            Ok(order_ref) => {
                self.by_order_ref.insert(order_ref.clone(), local_id);
                if let Some(order) = self.orders.get_mut(&local_id) {
                    order.order_ref = Some(order_ref);
                }
                self.timers.insert(
                    local_id,
                    OrderTimers { ack_deadline: Some(now + chrono::Duration::from_std(self.config.ack_timeout).unwrap_or_default()), ..Default::default() },
                );
                self.gates.throttle.record(&intent.symbol, now);
            }
            Err(_) => self.give_up(local_id, now),
        }
    }

    fn give_up(&mut self, local_id: LocalId, now: DateTime<Utc>) {
        self.chase_pending.remove(&local_id);
        self.transition(local_id, OrderEvent::GiveUp, now);
        if let Some(retry_count) = self.orders.get(&local_id).map(|o| o.retry_count) {
            self.audit(now, ExecutionAuditEvent::OrderGaveUp { local_id, retry_count });
        }
    }

    pub fn close_audit(self) -> Result<(), engine_core::AuditWriteError> {
        self.audit.close()
    }
}

fn exponential_backoff(base: Duration, max: Duration, attempt: u32) -> Duration {
    let multiplier = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(multiplier).min(max)
}
