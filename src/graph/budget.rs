use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Result, VendorGraphError};

/// Shared flag a caller flips to abort a running traversal.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Deadline and cancellation checked between frontier-state expansions.
#[derive(Debug, Clone, Default)]
pub struct TraversalBudget {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl TraversalBudget {
    /// No deadline, no cancellation.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fail with `TraversalBudgetExceeded` once cancelled or past the deadline.
    pub fn check(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(VendorGraphError::TraversalBudgetExceeded(
                "traversal cancelled".to_string(),
            ));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(VendorGraphError::TraversalBudgetExceeded(
                    "traversal deadline reached".to_string(),
                ));
            }
        }
        Ok(())
    }
}
