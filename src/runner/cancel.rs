//! External cancellation, checked between stages.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Trait for cancellation checks during a run.
#[async_trait]
pub trait CancelSignal: Send + Sync {
    /// Check if the run should stop before its next stage.
    async fn should_stop(&self, run_id: &str) -> bool;
}

/// Never cancels.
pub struct NoOpCancelSignal;

#[async_trait]
impl CancelSignal for NoOpCancelSignal {
    async fn should_stop(&self, _run_id: &str) -> bool {
        false
    }
}

/// Shared flag; cloning hands out another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
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

#[async_trait]
impl CancelSignal for CancelFlag {
    async fn should_stop(&self, _run_id: &str) -> bool {
        self.is_cancelled()
    }
}
