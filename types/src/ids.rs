use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SETTLABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique tag for a settlable value.
///
/// Only used for log fields and `Debug` output. Two handles refer to the same
/// value when they share storage, not when their ids happen to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SettlableId(u64);

impl SettlableId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocate the next id from the process-wide counter.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SETTLABLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SettlableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
