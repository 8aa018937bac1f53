//! Caller-side retry with exponential backoff

use crate::core::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// How often, and how patiently, a failed call is repeated
///
/// Only errors for which [`GatewayError::is_retryable`] holds are retried.
/// The delay before attempt `n` (0-based retry count) is
/// `base_delay_ms * 2^n`, capped at `max_delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Idempotent reads: three retries
    pub fn reads() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }

    /// Mutations: a single retry
    pub fn mutations() -> Self {
        Self {
            max_retries: 1,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }

    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of retries
    pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        self.run_with_backoff(label, operation, |delay| async move {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }

    /// Like [`run`](Self::run), waiting out each delay through `backoff`
    ///
    /// An error from `backoff` ends the loop, so a cancellable wait such as
    /// [`RequestGateway::backoff`](crate::gateway::RequestGateway::backoff)
    /// stops the retries.
    pub async fn run_with_backoff<T, F, Fut, B, BFut>(
        &self,
        label: &str,
        mut operation: F,
        mut backoff: B,
    ) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
        B: FnMut(Duration) -> BFut,
        BFut: Future<Output = Result<(), GatewayError>>,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retry < self.max_retries => {
                    let delay = self.delay_for(retry);
                    tracing::warn!(
                        operation = %label,
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying failed request"
                    );
                    backoff(delay).await?;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
