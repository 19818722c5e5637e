//! Bounded Retry
//!
//! Retries retryable failures with capped exponential backoff plus a small random
//! jitter: 150ms, 300ms, 600ms ... capped at 1200ms. The default bound is 3 attempts.
//! Backoff sleeps are raced against the caller's cancellation token.

use super::error::FetchError;
use super::{PartitionLister, RecordFetcher};
use crate::cancel::CancelToken;
use crate::jitter::jitter_delay;
use crate::partition::filter::Filter;
use crate::partition::types::{PartitionId, Record};

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(150),
            max_backoff: Duration::from_millis(1200),
            max_jitter: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Same bound, no waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the attempt
    /// bound is reached. Exhausting the bound yields `FetchError::Exhausted`.
    pub async fn run<T, F, Fut>(&self, cancel: &CancelToken, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut delay = self.initial_backoff;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };

            if attempt == max_attempts {
                tracing::warn!("Giving up after {} attempts: {}", attempt, err);
                return Err(FetchError::Exhausted {
                    attempts: attempt,
                    last: err.to_string(),
                });
            }

            let pause = delay + jitter_delay(self.max_jitter);
            tracing::debug!(
                "Attempt {}/{} failed ({}), retrying in {:?}",
                attempt,
                max_attempts,
                err,
                pause
            );

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            }
            delay = (delay * 2).min(self.max_backoff);
        }

        Err(FetchError::Exhausted {
            attempts: max_attempts,
            last: "retry attempts exhausted".to_string(),
        })
    }
}

/// Decorator adding [`RetryPolicy`] to any lister or fetcher.
pub struct Retrying<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> Retrying<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<T: RecordFetcher> RecordFetcher for Retrying<T> {
    async fn fetch(
        &self,
        partition: &PartitionId,
        filter: &Filter,
        cancel: &CancelToken,
    ) -> Result<Vec<Record>, FetchError> {
        self.policy
            .run(cancel, || self.inner.fetch(partition, filter, cancel))
            .await
    }
}

#[async_trait]
impl<T: PartitionLister> PartitionLister for Retrying<T> {
    async fn list(&self, home: &PartitionId) -> Result<Vec<PartitionId>, FetchError> {
        let cancel = CancelToken::new();
        self.policy.run(&cancel, || self.inner.list(home)).await
    }
}
