//! Caller-driven cancellation for long simulations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::error::BacktestError;

/// Shared cancellation flag with an optional deadline.
///
/// Clones share the same flag, so one token can be handed to every parallel
/// run of a comparison or portfolio.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Relaxed) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    pub fn check(&self) -> Result<(), BacktestError> {
        if self.is_cancelled() {
            Err(BacktestError::Cancelled)
        } else {
            Ok(())
        }
    }
}
