use std::sync::Arc;

use chrono::{DateTime, Utc};
use engine_core::ids::RunId;
use engine_core::{AuditLog, GuardianMode};
use engine_execution::gates::{CostGate, FatFingerGate, GateChain, GuardianModeGate, LiquidityGate, MarginGate, ThrottleGate};
use engine_execution::{AoeMode, AutoOrderEngine, Broker};
use engine_guardian::{flatten::plan_flatten, Guardian, GuardianAction, GuardianSnapshot};
use engine_instrument::InstrumentCache;

use crate::config::RunConfig;

/// Everything one running process needs, assembled once at startup from a [`RunConfig`].
/// Nothing in here is rebuilt mid-run; the engine and the supervisor each own their half of
/// the mutable state and talk to each other only through [`EngineContext::drive_guardian`].
pub struct EngineContext<B> {
    pub engine: AutoOrderEngine<B>,
    pub guardian: Guardian,
    pub mode: engine_execution::engine::SharedMode,
}

impl<B: Broker> EngineContext<B> {
    pub fn new(broker: B, config: &RunConfig, run_id: RunId, started_at: DateTime<Utc>) -> Result<Self, engine_core::AuditWriteError> {
        let instruments = InstrumentCache::load(&config.instrument_bundle_path)
            .unwrap_or_else(|_| InstrumentCache::from_instruments(std::iter::empty::<engine_instrument::Instrument>()));
        let mode = engine_execution::engine::SharedMode::new(GuardianMode::Init);

        let gates = GateChain {
            throttle: ThrottleGate::new(config.throttle_config()),
            fat_finger: FatFingerGate::new(config.fat_finger_config()),
            limit_price: Default::default(),
            liquidity: LiquidityGate::new(config.liquidity_config()),
            margin: MarginGate,
            guardian_mode: GuardianModeGate::new(Arc::new(mode.clone())),
            cost: CostGate::new(engine_execution::cost::CostEstimator::new(Default::default())),
        };

        let engine_audit = AuditLog::create(&config.audit_dir, started_at, run_id)?;
        let engine = AutoOrderEngine::new(broker, instruments, gates, mode.clone(), config.engine_config(), engine_audit, run_id);

        let guardian_audit = AuditLog::create(&config.audit_dir, started_at, run_id)?;
        let guardian = Guardian::new(config.guardian_config(), guardian_audit, run_id);

        Ok(Self { engine, guardian, mode })
    }

    /// Brings the supervisor online once startup reconciliation succeeds; `Running` only
    /// takes effect once this has been called.
    pub async fn acknowledge_startup_healthy(&mut self, now: DateTime<Utc>) {
        for action in self.guardian.acknowledge_startup_healthy(now) {
            self.apply_action(action, now).await;
        }
    }

    /// Runs one supervisor tick against a snapshot assembled from the engine's own state, and
    /// applies whatever actions it returns.
    pub async fn drive_guardian(&mut self, snapshot: &GuardianSnapshot<'_>, now: DateTime<Utc>) {
        let actions = self.guardian.tick(snapshot, now);
        for action in actions {
            self.apply_action(action, now).await;
        }
    }

    async fn apply_action(&mut self, action: GuardianAction, now: DateTime<Utc>) {
        match action {
            GuardianAction::SetMode(mode) => self.engine.set_mode(to_aoe_mode(mode), now).await,
            GuardianAction::CancelAll => self.engine.cancel_all(now).await,
            GuardianAction::FlattenAll => {
                let intents = plan_flatten(self.engine.positions(), self.engine.quotes());
                for intent in intents {
                    let _ = self.engine.submit(intent, now).await;
                }
            }
        }
    }
}

/// `Init` and `Manual` are postures the engine itself never sets; both collapse to `Halted` so
/// the engine refuses new risk-taking orders while the supervisor is not actively running it.
fn to_aoe_mode(mode: GuardianMode) -> AoeMode {
    match mode {
        GuardianMode::Running => AoeMode::Running,
        GuardianMode::ReduceOnly => AoeMode::ReduceOnly,
        GuardianMode::Init | GuardianMode::Halted | GuardianMode::Manual => AoeMode::Halted,
    }
}
