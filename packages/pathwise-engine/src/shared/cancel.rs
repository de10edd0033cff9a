//! Cooperative cancellation
//!
//! A token checked at analysis step boundaries. Tokens are cheap to clone
//! and share one stop flag, so cancelling a parent stops every walk spawned
//! under it; a deadline can additionally bound one walk without affecting
//! its siblings.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::{EngineError, Result};

/// Shared stop flag plus an optional per-token deadline
#[derive(Debug, Clone)]
pub struct CancelToken {
    stop: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that only stops when `cancel` is called
    pub fn unbounded() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// A token that stops after `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// A child sharing this token's stop flag, with its own deadline
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        Self {
            stop: Arc::clone(&self.stop),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Signals every token sharing this stop flag
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return true;
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Errors with a timeout when the token has fired
    pub fn check(&self, what: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(EngineError::timeout(what))
        } else {
            Ok(())
        }
    }
}
