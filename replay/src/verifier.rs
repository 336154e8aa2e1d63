use std::collections::HashSet;

use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::canonical::{canonicalize, default_excluded_fields};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read audit log: {0}")]
    Read(#[from] engine_core::AuditWriteError),
}

/// Outcome of comparing a recorded run's audit log against a re-executed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayComparison {
    pub matches: bool,
    pub recorded_hash: String,
    pub replayed_hash: String,
    /// Index of the first event whose canonical form differs, or whose log ran out first.
    pub first_diff_index: Option<usize>,
    /// Pretty-printed canonical JSON of both sides at `first_diff_index`, when present.
    pub diff: Option<String>,
}

/// Compares two event logs for deterministic equivalence: same canonical content, modulo the
/// time-like fields every envelope carries. Equal hashes is the fast path; on mismatch, a
/// linear scan over the shorter log locates exactly where they diverge.
#[derive(Debug, Clone)]
pub struct ReplayVerifier {
    exclude_fields: HashSet<String>,
}

impl Default for ReplayVerifier {
    fn default() -> Self {
        Self { exclude_fields: default_excluded_fields() }
    }
}

impl ReplayVerifier {
    pub fn new(exclude_fields: HashSet<String>) -> Self {
        Self { exclude_fields }
    }

    fn canonical_events(&self, events: &[Value]) -> Vec<Value> {
        events.iter().map(|event| canonicalize(event, &self.exclude_fields)).collect()
    }

    fn hash(&self, canonical: &[Value]) -> String {
        let mut hasher = Sha256::new();
        for event in canonical {
            hasher.update(event.to_string().as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn compare(&self, recorded: &[Value], replayed: &[Value]) -> ReplayComparison {
        let recorded_canon = self.canonical_events(recorded);
        let replayed_canon = self.canonical_events(replayed);

        let recorded_hash = self.hash(&recorded_canon);
        let replayed_hash = self.hash(&replayed_canon);

        if recorded_hash == replayed_hash {
            return ReplayComparison { matches: true, recorded_hash, replayed_hash, first_diff_index: None, diff: None };
        }

        let first_diff_index = recorded_canon
            .iter()
            .zip(replayed_canon.iter())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| recorded_canon.len().min(replayed_canon.len()));

        let diff = Some(format!(
            "recorded[{idx}] = {recorded}\nreplayed[{idx}] = {replayed}",
            idx = first_diff_index,
            recorded = recorded_canon.get(first_diff_index).map(|v| v.to_string()).unwrap_or_else(|| "<end of log>".into()),
            replayed = replayed_canon.get(first_diff_index).map(|v| v.to_string()).unwrap_or_else(|| "<end of log>".into()),
        ));

        ReplayComparison { matches: false, recorded_hash, replayed_hash, first_diff_index: Some(first_diff_index), diff }
    }

    pub fn compare_files(&self, recorded_path: &std::path::Path, replayed_path: &std::path::Path) -> Result<ReplayComparison, ReplayError> {
        let recorded = engine_core::audit::read_events(recorded_path)?;
        let replayed = engine_core::audit::read_events(replayed_path)?;
        Ok(self.compare(&recorded, &replayed))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn identical_logs_modulo_timestamps_match() {
        let recorded = vec![json!({"ts": 1.0, "event_type": "order_submitted", "local_id": "a"})];
        let replayed = vec![json!({"ts": 2.0, "event_type": "order_submitted", "local_id": "a"})];
        let verifier = ReplayVerifier::default();
        let result = verifier.compare(&recorded, &replayed);
        assert!(result.matches);
        assert_eq!(result.recorded_hash, result.replayed_hash);
    }

    #[test]
    fn divergent_logs_report_first_diff_index() {
        let recorded = vec![
            json!({"ts": 1.0, "event_type": "a"}),
            json!({"ts": 1.0, "event_type": "b"}),
        ];
        let replayed = vec![
            json!({"ts": 1.0, "event_type": "a"}),
            json!({"ts": 1.0, "event_type": "c"}),
        ];
        let verifier = ReplayVerifier::default();
        let result = verifier.compare(&recorded, &replayed);
        assert!(!result.matches);
        assert_eq!(result.first_diff_index, Some(1));
        assert!(result.diff.is_some());
    }

    #[test]
    fn shorter_log_diverges_at_its_own_length() {
        let recorded = vec![json!({"event_type": "a"}), json!({"event_type": "b"})];
        let replayed = vec![json!({"event_type": "a"})];
        let verifier = ReplayVerifier::default();
        let result = verifier.compare(&recorded, &replayed);
        assert!(!result.matches);
        assert_eq!(result.first_diff_index, Some(1));
    }
}
