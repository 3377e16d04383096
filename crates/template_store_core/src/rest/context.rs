//! Request-scoped deadline and cancellation.
//!
//! # Invariants
//! - Every backend call is preceded by `RequestContext::check`.
//! - Cancellation is shared: cancelling one clone cancels all of them.

use super::error::{StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Per-request scope: target namespace plus deadline/cancellation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    namespace: String,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Creates a context without a deadline.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            deadline: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Fails when the request was cancelled or its deadline has passed.
    pub fn check(&self) -> StorageResult<()> {
        if self.cancellation.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(StorageError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}
