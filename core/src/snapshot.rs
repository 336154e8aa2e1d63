use derive_more::{Constructor, From};
use serde::{Deserialize, Serialize};

/// A consistent point-in-time view of some mutable state, taken under a lock. Wrapping a value
/// in `Snapshot` documents at the type level that it was read atomically and won't change
/// underneath the caller, as opposed to a live reference into a `parking_lot::Mutex` guard.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Deserialize,
    Serialize,
    Constructor,
    From,
)]
pub struct Snapshot<T>(pub T);

impl<T> Snapshot<T> {
    pub fn as_ref(&self) -> Snapshot<&T> {
        let Self(item) = self;
        Snapshot(item)
    }

    pub fn map<F, N>(self, op: F) -> Snapshot<N>
    where
        F: Fn(T) -> N,
    {
        let Self(item) = self;
        Snapshot(op(item))
    }
}
