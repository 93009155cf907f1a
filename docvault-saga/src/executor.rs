//! Durable executor seam.
//!
//! A saga is a plain async function of the stores. Whatever runs it (inline,
//! behind a retry loop, from a queue consumer) sits behind
//! [`DurableExecutor`]. Each invocation of the saga closure is one complete,
//! independent saga run.

use async_trait::async_trait;
use docvault_core::{DocVaultResult, RetryConfig, SagaKind};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// Runs a saga closure under some retry policy.
#[async_trait]
pub trait DurableExecutor: Send + Sync {
    async fn execute<T, F, Fut>(&self, saga: SagaKind, op: F) -> DocVaultResult<T>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = DocVaultResult<T>> + Send;
}

/// Runs the saga exactly once.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

#[async_trait]
impl DurableExecutor for InlineExecutor {
    async fn execute<T, F, Fut>(&self, _saga: SagaKind, mut op: F) -> DocVaultResult<T>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = DocVaultResult<T>> + Send,
    {
        op().await
    }
}

/// Re-runs a failed saga with exponential backoff.
///
/// Only errors for which [`docvault_core::DocVaultError::is_retryable`]
/// holds are retried. Not-found and validation errors end the run at once.
#[derive(Debug, Default)]
pub struct RetryingExecutor {
    config: RetryConfig,
    retries: AtomicU64,
}

impl RetryingExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            retries: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Total re-runs performed since creation.
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DurableExecutor for RetryingExecutor {
    async fn execute<T, F, Fut>(&self, saga: SagaKind, mut op: F) -> DocVaultResult<T>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = DocVaultResult<T>> + Send,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let backoff = self.config.backoff_for(attempt);
                    tracing::warn!(
                        target: "docvault::executor",
                        saga = %saga,
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Saga failed, retrying"
                    );
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault_core::{DocVaultError, DocumentId, StorageError, StoreOp};
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    fn transient() -> DocVaultError {
        StorageError::failed(StoreOp::BlobUpload, DocumentId::nil(), "timeout").into()
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig::default()
            .with_max_attempts(max_attempts)
            .with_initial_backoff(Duration::from_millis(1))
            .with_max_backoff(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_inline_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: DocVaultResult<()> = InlineExecutor
            .execute(SagaKind::Save, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retrying_recovers_from_transient_failure() {
        let executor = RetryingExecutor::new(fast_retry(3));
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = executor
            .execute(SagaKind::Save, move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(transient())
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(executor.retries(), 1);
    }

    #[tokio::test]
    async fn test_retrying_gives_up_after_max_attempts() {
        let executor = RetryingExecutor::new(fast_retry(3));
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: DocVaultResult<()> = executor
            .execute(SagaKind::Delete, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;
        assert_eq!(result, Err(transient()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_never_retried() {
        let executor = RetryingExecutor::new(fast_retry(5));
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: DocVaultResult<()> = executor
            .execute(SagaKind::Delete, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DocVaultError::DocumentNotFound {
                    id: DocumentId::nil(),
                })
            })
            .await;
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(executor.retries(), 0);
    }

    #[tokio::test]
    async fn test_default_policy_is_single_attempt() {
        let executor = RetryingExecutor::default();
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let _: DocVaultResult<()> = executor
            .execute(SagaKind::Save, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
