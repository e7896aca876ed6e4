//! Per-call timeout for any reasoner.
//!
//! The loop cannot preempt an in-flight call, so the bound lives here.

use async_trait::async_trait;
use std::time::Duration;

use super::{Reasoner, ReasonerError, ReasonerRequest, ReasonerResponse};

/// Wraps a reasoner and fails calls that take longer than `timeout`
pub struct TimeoutReasoner<R> {
    inner: R,
    timeout: Duration,
}

impl<R: Reasoner> TimeoutReasoner<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

}

#[async_trait]
impl<R: Reasoner> Reasoner for TimeoutReasoner<R> {
    async fn invoke(&self, request: ReasonerRequest) -> Result<ReasonerResponse, ReasonerError> {
        let task = request.kind();
        match tokio::time::timeout(self.timeout, self.inner.invoke(request)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("Reasoner call for {} timed out after {:?}", task, self.timeout);
                Err(ReasonerError::Timeout(self.timeout))
            }
        }
    }
}
