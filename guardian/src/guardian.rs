use std::time::Duration;

use chrono::{DateTime, Utc};
use engine_core::{audit::AuditEnvelope, ids::RunId, AuditLog, ExecId, GuardianMode};
use rust_decimal::Decimal;

use crate::{
    action::{AnomalyRecord, GuardianAction, GuardianAuditEvent},
    detector::{Anomaly, AnomalyDetector, GuardianSnapshot, LegImbalanceDetector, OrderStuckDetector, PositionDriftDetector, QuoteStaleDetector},
    state::{self, Trigger},
};

/// Tunables named directly after the configuration surface Guardian is specified against.
#[derive(Debug, Clone, Copy)]
pub struct GuardianConfig {
    pub reduce_only_cooldown: Duration,
    pub order_stuck_timeout: Duration,
    pub position_drift_threshold: Decimal,
    pub leg_imbalance_threshold: Decimal,
    pub quote_hard_stale_ms: i64,
    pub margin_warning_level: Decimal,
    pub margin_danger_level: Decimal,
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            reduce_only_cooldown: Duration::from_secs(60),
            order_stuck_timeout: Duration::from_secs(30),
            position_drift_threshold: Decimal::from(5),
            leg_imbalance_threshold: Decimal::from(5),
            quote_hard_stale_ms: 10_000,
            margin_warning_level: Decimal::new(7, 1), // 0.7
            margin_danger_level: Decimal::new(9, 1),  // 0.9
        }
    }
}

/// The system-level supervisor: a small FSM over [`GuardianMode`] driven by four anomaly
/// detectors, each evaluated fresh against a caller-built [`GuardianSnapshot`] on every tick.
/// Issues coarse [`GuardianAction`]s but never touches a broker or engine directly — the caller
/// (typically `exec-core`'s main loop) is the one that turns `SetMode`/`CancelAll`/`FlattenAll`
/// into calls against a live `AutoOrderEngine`.
pub struct Guardian {
    mode: GuardianMode,
    config: GuardianConfig,
    reduce_only_since: Option<DateTime<Utc>>,
    audit: AuditLog,
    run_id: RunId,
}

impl Guardian {
    pub fn new(config: GuardianConfig, audit: AuditLog, run_id: RunId) -> Self {
        Self { mode: GuardianMode::Init, config, reduce_only_since: None, audit, run_id }
    }

    pub fn mode(&self) -> GuardianMode {
        self.mode
    }

    fn audit_event(&mut self, now: DateTime<Utc>, event: GuardianAuditEvent) {
        let envelope = AuditEnvelope::new(now, self.run_id, ExecId::generate(), event);
        let _ = self.audit.append(&envelope);
    }

    fn apply(&mut self, to: Option<GuardianMode>, trigger: Trigger, now: DateTime<Utc>, actions: &mut Vec<GuardianAction>) {
        let Some(to) = to else { return };
        if to == self.mode {
            return;
        }
        let from = self.mode;
        self.mode = to;
        if to == GuardianMode::ReduceOnly {
            self.reduce_only_since = Some(now);
        } else if from == GuardianMode::ReduceOnly {
            self.reduce_only_since = None;
        }
        self.audit_event(now, GuardianAuditEvent::ModeTransition { from, to, trigger });
        actions.push(GuardianAction::SetMode(to));
        if to == GuardianMode::Halted {
            actions.push(GuardianAction::CancelAll);
        }
    }

    /// Call once at startup once the cache is loaded, the broker connected, and positions
    /// reconciled clean; moves `Init` → `Running`.
    pub fn acknowledge_startup_healthy(&mut self, now: DateTime<Utc>) -> Vec<GuardianAction> {
        let mut actions = Vec::new();
        let to = state::transition(self.mode, Trigger::StartupHealthy, false, false);
        self.apply(to, Trigger::StartupHealthy, now, &mut actions);
        actions
    }

    /// A human operator has acted: `Halted` → `Manual`, or `Manual` → `Running`. No-op from any
    /// other mode.
    pub fn acknowledge_manual(&mut self, now: DateTime<Utc>) -> Vec<GuardianAction> {
        let mut actions = Vec::new();
        let to = state::transition(self.mode, Trigger::ManualAcknowledge, false, false);
        self.apply(to, Trigger::ManualAcknowledge, now, &mut actions);
        actions
    }

    /// Runs every detector against `snapshot`, folds the result into at most one mode
    /// transition (the most severe anomaly wins within a single tick), and returns whatever
    /// actions the caller must carry out. Always audits every anomaly it sees, even ones that
    /// do not change the mode.
    pub fn tick(&mut self, snapshot: &GuardianSnapshot<'_>, now: DateTime<Utc>) -> Vec<GuardianAction> {
        let mut actions = Vec::new();

        if !matches!(self.mode, GuardianMode::Running | GuardianMode::ReduceOnly) {
            return actions;
        }

        let quote_stale = QuoteStaleDetector { hard_stale_ms: self.config.quote_hard_stale_ms }.detect(snapshot, now);
        let order_stuck = OrderStuckDetector { stuck_timeout_ms: self.config.order_stuck_timeout.as_millis() as i64 }.detect(snapshot, now);
        let position_drift = PositionDriftDetector { threshold: self.config.position_drift_threshold }.detect(snapshot, now);
        let leg_imbalance = LegImbalanceDetector { threshold: self.config.leg_imbalance_threshold }.detect(snapshot, now);

        let margin_anomaly = if snapshot.margin_usage >= self.config.margin_danger_level {
            Some(Anomaly::MarginDanger { usage: snapshot.margin_usage })
        } else if snapshot.margin_usage >= self.config.margin_warning_level {
            Some(Anomaly::MarginWarning { usage: snapshot.margin_usage })
        } else {
            None
        };

        let all: Vec<Anomaly> = quote_stale.into_iter().chain(order_stuck).chain(position_drift).chain(leg_imbalance).chain(margin_anomaly).collect();

        for anomaly in &all {
            self.audit_event(now, GuardianAuditEvent::AnomalyDetected { anomaly: AnomalyRecord::from(anomaly) });
        }

        // Halted-grade anomalies win outright; otherwise a reduce-only-grade anomaly degrades
        // the mode; otherwise, if currently in reduce-only with nothing outstanding, check the
        // cooldown for recovery.
        let halted_trigger = all.iter().find_map(|anomaly| match anomaly {
            Anomaly::PositionDrift { .. } => Some(Trigger::PositionDriftSevere),
            Anomaly::MarginDanger { .. } => Some(Trigger::MarginDanger),
            _ => None,
        });

        if let Some(trigger) = halted_trigger {
            let to = state::transition(self.mode, trigger, false, false);
            self.apply(to, trigger, now, &mut actions);
            if actions.iter().any(|a| matches!(a, GuardianAction::SetMode(GuardianMode::Halted))) {
                actions.push(GuardianAction::FlattenAll);
            }
            return actions;
        }

        let reduce_trigger = all.iter().find_map(|anomaly| match anomaly {
            Anomaly::QuoteStale { .. } => Some(Trigger::QuoteHardStale),
            Anomaly::OrderStuck { .. } => Some(Trigger::OrderStuck),
            Anomaly::LegImbalance { .. } => Some(Trigger::LegImbalance),
            Anomaly::MarginWarning { .. } => Some(Trigger::MarginWarning),
            _ => None,
        });

        if let Some(trigger) = reduce_trigger {
            let to = state::transition(self.mode, trigger, false, false);
            self.apply(to, trigger, now, &mut actions);
            return actions;
        }

        if self.mode == GuardianMode::ReduceOnly {
            let cooldown_elapsed = self
                .reduce_only_since
                .is_some_and(|since| now - since >= chrono::Duration::from_std(self.config.reduce_only_cooldown).unwrap_or_default());
            let to = state::transition(self.mode, Trigger::CooldownElapsedHealthy, cooldown_elapsed, false);
            self.apply(to, Trigger::CooldownElapsedHealthy, now, &mut actions);
        }

        actions
    }

    /// An `AuditWriteError` anywhere in the system is itself a fatal anomaly — reported by the
    /// caller, since this Guardian instance cannot observe its own audit writer's health without
    /// circularity.
    pub fn on_audit_write_failed(&mut self, now: DateTime<Utc>) -> Vec<GuardianAction> {
        let mut actions = Vec::new();
        let to = state::transition(self.mode, Trigger::AuditWriteFailed, false, false);
        self.apply(to, Trigger::AuditWriteFailed, now, &mut actions);
        if actions.iter().any(|a| matches!(a, GuardianAction::SetMode(GuardianMode::Halted))) {
            actions.push(GuardianAction::FlattenAll);
        }
        actions
    }

    pub fn close_audit(self) -> Result<(), engine_core::AuditWriteError> {
        self.audit.close()
    }
}

#[cfg(test)]
mod tests {
    use engine_instrument::QuoteCache;
    use rust_decimal::Decimal;

    use super::*;
    use crate::detector::GuardianSnapshot;

    fn empty_snapshot(quotes: &QuoteCache) -> GuardianSnapshot<'_> {
        GuardianSnapshot {
            quotes,
            held_symbols: &[],
            open_orders: &[],
            position_drifts: &[],
            leg_imbalances: &[],
            margin_usage: Decimal::ZERO,
        }
    }

    fn guardian() -> (Guardian, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let run_id = RunId::generate();
        let audit = AuditLog::create(dir.path(), Utc::now(), run_id).unwrap();
        (Guardian::new(GuardianConfig::default(), audit, run_id), dir)
    }

    #[test]
    fn starts_in_init_and_moves_to_running_on_startup() {
        let (mut guardian, _dir) = guardian();
        assert_eq!(guardian.mode(), GuardianMode::Init);
        let actions = guardian.acknowledge_startup_healthy(Utc::now());
        assert_eq!(guardian.mode(), GuardianMode::Running);
        assert_eq!(actions, vec![GuardianAction::SetMode(GuardianMode::Running)]);
    }

    #[test]
    fn clean_tick_leaves_running_untouched() {
        let (mut guardian, _dir) = guardian();
        guardian.acknowledge_startup_healthy(Utc::now());
        let quotes = QuoteCache::new();
        let actions = guardian.tick(&empty_snapshot(&quotes), Utc::now());
        assert!(actions.is_empty());
        assert_eq!(guardian.mode(), GuardianMode::Running);
    }

    #[test]
    fn margin_danger_halts_and_flattens() {
        let (mut guardian, _dir) = guardian();
        guardian.acknowledge_startup_healthy(Utc::now());
        let quotes = QuoteCache::new();
        let mut snapshot = empty_snapshot(&quotes);
        snapshot.margin_usage = Decimal::new(95, 2); // 0.95
        let actions = guardian.tick(&snapshot, Utc::now());
        assert_eq!(guardian.mode(), GuardianMode::Halted);
        assert!(actions.contains(&GuardianAction::SetMode(GuardianMode::Halted)));
        assert!(actions.contains(&GuardianAction::CancelAll));
        assert!(actions.contains(&GuardianAction::FlattenAll));
    }
}
