use chrono::{DateTime, Utc};
use engine_execution::ids::{LocalId, PairExecId};
use engine_execution::order::OrderState;
use engine_execution::position::PositionDrift;
use engine_instrument::{QuoteCache, Symbol};
use rust_decimal::Decimal;

/// One non-terminal order the engine is currently tracking, as Guardian needs to see it —
/// nothing more than what the order-stuck detector requires.
#[derive(Debug, Clone)]
pub struct OrderSnapshotEntry {
    pub local_id: LocalId,
    pub state: OrderState,
    pub last_update_ts: DateTime<Utc>,
}

/// A read-only view of engine state assembled fresh each `Guardian::tick`. Deliberately
/// decoupled from `AutoOrderEngine` itself so each detector is testable against a
/// hand-built snapshot without constructing a live engine or broker.
#[derive(Debug, Clone, Copy)]
pub struct GuardianSnapshot<'a> {
    pub quotes: &'a QuoteCache,
    pub held_symbols: &'a [Symbol],
    pub open_orders: &'a [OrderSnapshotEntry],
    pub position_drifts: &'a [PositionDrift],
    pub leg_imbalances: &'a [(PairExecId, Decimal)],
    pub margin_usage: Decimal,
}

/// One detected anomaly, tagged with enough detail to audit without re-deriving it from the
/// snapshot later.
#[derive(Debug, Clone, PartialEq)]
pub enum Anomaly {
    QuoteStale { symbol: Symbol, age_ms: i64 },
    OrderStuck { local_id: LocalId, stuck_for_ms: i64 },
    PositionDrift { drift: PositionDrift },
    LegImbalance { pair_exec_id: PairExecId, imbalance: Decimal },
    MarginWarning { usage: Decimal },
    MarginDanger { usage: Decimal },
}

pub trait AnomalyDetector {
    fn detect(&self, snapshot: &GuardianSnapshot<'_>, now: DateTime<Utc>) -> Vec<Anomaly>;

    fn name(&self) -> &'static str;
}

/// Flags any held symbol whose freshest quote has aged past `hard_stale_ms` — the AOE can no
/// longer trust a price it would gate or chase against.
#[derive(Debug, Clone, Copy)]
pub struct QuoteStaleDetector {
    pub hard_stale_ms: i64,
}

impl AnomalyDetector for QuoteStaleDetector {
    fn detect(&self, snapshot: &GuardianSnapshot<'_>, now: DateTime<Utc>) -> Vec<Anomaly> {
        snapshot
            .held_symbols
            .iter()
            .filter_map(|symbol| {
                let quote = snapshot.quotes.get(symbol)?;
                let age_ms = (now - quote.ts).num_milliseconds();
                (age_ms >= self.hard_stale_ms).then_some(Anomaly::QuoteStale { symbol: symbol.clone(), age_ms })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "quote_stale"
    }
}

/// Flags any non-terminal order whose `last_update_ts` has not moved in `stuck_timeout_ms` —
/// a broker callback that never arrived, or an engine that lost track of a retry.
#[derive(Debug, Clone, Copy)]
pub struct OrderStuckDetector {
    pub stuck_timeout_ms: i64,
}

impl AnomalyDetector for OrderStuckDetector {
    fn detect(&self, snapshot: &GuardianSnapshot<'_>, now: DateTime<Utc>) -> Vec<Anomaly> {
        snapshot
            .open_orders
            .iter()
            .filter_map(|order| {
                let stuck_for_ms = (now - order.last_update_ts).num_milliseconds();
                (stuck_for_ms >= self.stuck_timeout_ms).then_some(Anomaly::OrderStuck { local_id: order.local_id, stuck_for_ms })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "order_stuck"
    }
}

/// `PositionTracker`'s own reconciliation already tolerates a one-lot blip before reporting a
/// [`PositionDrift`] at all; this detector applies Guardian's own, coarser threshold on top —
/// a drift that cleared the tracker's tolerance but hasn't yet crossed `threshold` lots is
/// logged but not escalated to `Halted`.
#[derive(Debug, Clone, Copy)]
pub struct PositionDriftDetector {
    pub threshold: Decimal,
}

impl AnomalyDetector for PositionDriftDetector {
    fn detect(&self, snapshot: &GuardianSnapshot<'_>, _now: DateTime<Utc>) -> Vec<Anomaly> {
        snapshot
            .position_drifts
            .iter()
            .filter(|drift| drift.long_delta() > self.threshold || drift.short_delta() > self.threshold)
            .cloned()
            .map(|drift| Anomaly::PositionDrift { drift })
            .collect()
    }

    fn name(&self) -> &'static str {
        "position_drift"
    }
}

/// Flags any in-flight pair whose leg imbalance has crossed `threshold` lots.
#[derive(Debug, Clone, Copy)]
pub struct LegImbalanceDetector {
    pub threshold: Decimal,
}

impl AnomalyDetector for LegImbalanceDetector {
    fn detect(&self, snapshot: &GuardianSnapshot<'_>, _now: DateTime<Utc>) -> Vec<Anomaly> {
        snapshot
            .leg_imbalances
            .iter()
            .filter(|(_, imbalance)| *imbalance > self.threshold)
            .map(|(pair_exec_id, imbalance)| Anomaly::LegImbalance { pair_exec_id: *pair_exec_id, imbalance: *imbalance })
            .collect()
    }

    fn name(&self) -> &'static str {
        "leg_imbalance"
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use engine_instrument::Quote;
    use rust_decimal_macros::dec;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn quote_at(ts: DateTime<Utc>) -> Quote {
        Quote {
            bid: dec!(100),
            ask: dec!(101),
            bid_vol: 1,
            ask_vol: 1,
            last: dec!(100),
            volume: 1,
            open_interest: 1,
            last_settle: None,
            ts,
        }
    }

    #[test]
    fn quote_stale_detector_flags_aged_quote() {
        let symbol: Symbol = "rb2410".into();
        let mut quotes = QuoteCache::new();
        quotes.update(symbol.clone(), quote_at(now() - chrono::Duration::seconds(20)));
        let held = vec![symbol];
        let snapshot = GuardianSnapshot {
            quotes: &quotes,
            held_symbols: &held,
            open_orders: &[],
            position_drifts: &[],
            leg_imbalances: &[],
            margin_usage: Decimal::ZERO,
        };
        let detector = QuoteStaleDetector { hard_stale_ms: 10_000 };
        assert_eq!(detector.detect(&snapshot, now()).len(), 1);
    }

    #[test]
    fn quote_stale_detector_ignores_fresh_quote() {
        let symbol: Symbol = "rb2410".into();
        let mut quotes = QuoteCache::new();
        quotes.update(symbol.clone(), quote_at(now()));
        let held = vec![symbol];
        let snapshot = GuardianSnapshot {
            quotes: &quotes,
            held_symbols: &held,
            open_orders: &[],
            position_drifts: &[],
            leg_imbalances: &[],
            margin_usage: Decimal::ZERO,
        };
        let detector = QuoteStaleDetector { hard_stale_ms: 10_000 };
        assert!(detector.detect(&snapshot, now()).is_empty());
    }

    #[test]
    fn leg_imbalance_detector_only_flags_above_threshold() {
        let quotes = QuoteCache::new();
        let leg_imbalances = vec![(PairExecId::generate(), dec!(1)), (PairExecId::generate(), dec!(10))];
        let snapshot = GuardianSnapshot {
            quotes: &quotes,
            held_symbols: &[],
            open_orders: &[],
            position_drifts: &[],
            leg_imbalances: &leg_imbalances,
            margin_usage: Decimal::ZERO,
        };
        let detector = LegImbalanceDetector { threshold: dec!(5) };
        let anomalies = detector.detect(&snapshot, now());
        assert_eq!(anomalies.len(), 1);
    }
}
