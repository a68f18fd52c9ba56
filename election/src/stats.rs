//! Process-local counters for vote casting.
//!
//! Purely operational: nothing in the cast protocol reads them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::{ElectionError, ErrorKind};

#[derive(Debug, Default)]
pub struct EngineStats {
    attempted: AtomicU64,
    committed: AtomicU64,
    rejected: AtomicU64,
    retryable: AtomicU64,
    cancelled: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CastStats {
    pub attempted: u64,
    pub committed: u64,
    /// Failed permanently: a precondition, bad input, or a store that cannot take the write.
    pub rejected: u64,
    /// Lost a race or hit a transient store failure.
    pub retryable: u64,
    pub cancelled: u64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, outcome: &Result<(), ElectionError>) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            Ok(()) => &self.committed,
            Err(e) if e.is_retryable() => &self.retryable,
            Err(e) if e.kind() == ErrorKind::Cancelled => &self.cancelled,
            Err(_) => &self.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CastStats {
        CastStats {
            attempted: self.attempted.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            retryable: self.retryable.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}
