use derive_more::{Constructor, Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one replay run end-to-end: generated once when the engine starts (or supplied by
/// the replay harness when re-driving a captured event log) and stamped onto every audit record
/// produced during that run.
///
/// Never generated inside decision logic — only at the edge where a run is started.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Constructor, From, Serialize, Deserialize,
)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generates a fresh, random run identifier. Callers outside the edges of the system
    /// (order intake, process startup) are the only legitimate callers of this.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Identifies a single order's local lifetime, independent of whatever identifier the broker
/// assigns it. Generated once per order at submission time and carried through every OSM
/// transition and audit record for that order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Constructor, From, Serialize, Deserialize,
)]
pub struct ExecId(pub Uuid);

impl ExecId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}
