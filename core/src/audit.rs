use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ids::{ExecId, RunId};

/// Every audit record is wrapped in this envelope before being serialised. `payload` carries
/// the event-specific fields and is flattened into the same JSON object, per §3's "Subtype
/// specific fields are documented in §3 and §4" contract: consumers see one flat object per
/// line, never a nested `payload` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEnvelope<T> {
    /// Seconds since the Unix epoch, supplied by the caller (never read from the wall clock
    /// inside this module, to keep the writer itself replay-agnostic).
    pub ts: f64,
    pub run_id: RunId,
    pub exec_id: ExecId,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> AuditEnvelope<T> {
    pub fn new(ts: DateTime<Utc>, run_id: RunId, exec_id: ExecId, payload: T) -> Self {
        Self {
            ts: ts.timestamp_millis() as f64 / 1_000.0,
            run_id,
            exec_id,
            payload,
        }
    }
}

/// Fatal: the caller must treat this as an infrastructure failure. Per the error taxonomy,
/// an `AuditWriteError` escaping this module should drive the Guardian to `HALTED`.
#[derive(Debug, Error)]
pub enum AuditWriteError {
    #[error("failed to open audit file at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write audit line: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to fsync audit file: {0}")]
    Sync(#[source] std::io::Error),
    #[error("failed to serialise audit event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to close audit file (rename {tmp} -> {target}): {source}")]
    Close {
        tmp: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Builds the canonical audit file name for a trading day and run, per §3: one file per
/// trading day, with the run_id folded in so a restarted process on the same day doesn't
/// clobber the previous run's log.
pub fn file_name(day: DateTime<Utc>, run_id: RunId) -> String {
    format!("audit_{}_{}.jsonl", day.format("%Y%m%d"), run_id.0)
}

/// Append-only JSONL audit writer.
///
/// Writes to a `.tmp`-suffixed file; every `append` is immediately flushed and fsynced, so a
/// crash after `append` returns never loses that line. `close` performs the final flush and
/// renames the `.tmp` file to its permanent name — only a cleanly closed log loses the suffix,
/// which lets a supervising process tell a complete log from one that was mid-write when the
/// process died.
#[derive(Debug)]
pub struct AuditLog {
    file: File,
    tmp_path: PathBuf,
    final_path: PathBuf,
}

impl AuditLog {
    /// Creates (or appends to, if restarting onto the same run) the audit file at
    /// `dir/file_name(day, run_id)`.
    pub fn create(dir: &Path, day: DateTime<Utc>, run_id: RunId) -> Result<Self, AuditWriteError> {
        let final_path = dir.join(file_name(day, run_id));
        let tmp_path = final_path.with_extension("jsonl.tmp");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&tmp_path)
            .map_err(|source| AuditWriteError::Open {
                path: tmp_path.clone(),
                source,
            })?;
        Ok(Self {
            file,
            tmp_path,
            final_path,
        })
    }

    /// Serialises `envelope`, appends it as one line, then flushes and fsyncs before
    /// returning. On any failure this also emits a `tracing::error!` so operators see the
    /// failure in logs even before the supervisor finishes its halt transition.
    pub fn append<T: Serialize>(&mut self, envelope: &AuditEnvelope<T>) -> Result<(), AuditWriteError> {
        let result = self.append_inner(envelope);
        if let Err(ref err) = result {
            tracing::error!(error = %err, path = %self.tmp_path.display(), "audit write failed");
        }
        result
    }

    fn append_inner<T: Serialize>(&mut self, envelope: &AuditEnvelope<T>) -> Result<(), AuditWriteError> {
        let mut line = serde_json::to_vec(envelope)?;
        line.push(b'\n');
        self.file.write_all(&line).map_err(AuditWriteError::Write)?;
        self.file.flush().map_err(AuditWriteError::Write)?;
        self.file.sync_data().map_err(AuditWriteError::Sync)?;
        Ok(())
    }

    /// Flushes one last time and atomically renames the `.tmp` file to its permanent name.
    pub fn close(self) -> Result<(), AuditWriteError> {
        self.file.sync_all().map_err(AuditWriteError::Sync)?;
        fs::rename(&self.tmp_path, &self.final_path).map_err(|source| AuditWriteError::Close {
            tmp: self.tmp_path.clone(),
            target: self.final_path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.tmp_path
    }
}

/// Reads an audit file line by line, parsing each line as a loose JSON [`Value`] (callers
/// decide which concrete envelope/payload type a given `event_type` deserialises into). A
/// truncated or unparsable final line — the expected signature of an unclean shutdown — is
/// dropped rather than treated as an error.
pub fn read_events(path: &Path) -> Result<Vec<Value>, AuditWriteError> {
    let file = File::open(path).map_err(|source| AuditWriteError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    let mut lines: Vec<String> = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(AuditWriteError::Write)?;
        if !line.is_empty() {
            lines.push(line);
        }
    }

    let mut events = Vec::with_capacity(lines.len());
    let last_index = lines.len().saturating_sub(1);
    for (i, line) in lines.into_iter().enumerate() {
        match serde_json::from_str(&line) {
            Ok(value) => events.push(value),
            Err(err) if i == last_index => {
                tracing::warn!(%err, "dropping truncated final audit line");
            }
            Err(err) => return Err(AuditWriteError::Serialize(err)),
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(tag = "event_type", rename_all = "snake_case")]
    enum TestPayload {
        Ping { n: u32 },
    }

    #[test]
    fn append_then_close_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let run_id = RunId::generate();
        let day = Utc::now();
        let mut log = AuditLog::create(dir.path(), day, run_id).unwrap();

        for n in 0..3 {
            let envelope = AuditEnvelope::new(Utc::now(), run_id, ExecId::generate(), TestPayload::Ping { n });
            log.append(&envelope).unwrap();
        }
        let final_path = dir.path().join(file_name(day, run_id));
        log.close().unwrap();

        assert!(final_path.exists());
        let events = read_events(&final_path).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1]["n"], 1);
        assert_eq!(events[0]["run_id"], run_id.0.to_string());
    }

    #[test]
    fn read_events_tolerates_truncated_final_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit_truncated.jsonl");
        fs::write(&path, b"{\"ts\":1.0,\"run_id\":\"abc\",\"exec_id\":\"def\",\"n\":1}\n{\"ts\":2.0,\"run_id\":\"abc").unwrap();
        let events = read_events(&path).unwrap();
        assert_eq!(events.len(), 1);
    }
}
