//! Caller-supplied deadlines and cancellation.
//!
//! Every store-touching operation takes a [`Deadline`]. Operations check it
//! before opening a transaction, between mutation steps and right before
//! commit. A failed check drops the open transaction, which rolls it back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ElectionError;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An optional expiry instant plus an optional cancellation token.
#[derive(Clone, Debug, Default)]
pub struct Deadline {
    expires_at: Option<Instant>,
    token: Option<CancelToken>,
}

impl Deadline {
    /// No expiry, no token.
    pub fn none() -> Self {
        Self::default()
    }

    /// Expire `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Instant::now().checked_add(timeout),
            token: None,
        }
    }

    pub fn at(instant: Instant) -> Self {
        Self {
            expires_at: Some(instant),
            token: None,
        }
    }

    /// Also fail once `token` is cancelled.
    pub fn with_token(mut self, token: CancelToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Time left before expiry, `None` if there is no expiry.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Fail with `Cancelled` or `DeadlineExceeded` if the caller gave up.
    pub fn check(&self) -> Result<(), ElectionError> {
        if self.token.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(ElectionError::Cancelled);
        }
        if self.expires_at.is_some_and(|at| Instant::now() >= at) {
            return Err(ElectionError::DeadlineExceeded);
        }
        Ok(())
    }
}
