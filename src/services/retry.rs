use std::future::Future;
use std::time::Duration;

use crate::api::errors::ApiError;

/// Transient-conflict retries for coordinated operations: up to 3 attempts
/// beyond the first, exponential backoff starting at 10 ms.
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 10;

pub(crate) fn is_serialization_failure(err: &sqlx::Error) -> bool {
    matches!(
        err.as_database_error().and_then(|db| db.code()).as_deref(),
        Some("40001") | Some("40P01")
    )
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().and_then(|db| db.code()).as_deref() == Some("23505")
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS << (attempt - 1).min(6))
}

/// Re-run `op` while it fails with a retryable serialization conflict.
/// Everything else, including domain-level 409s, returns immediately.
pub(crate) async fn with_conflict_retry<T, F, Fut>(mut op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Err(err) if err.is_retryable_conflict() && attempt < MAX_RETRIES => {
                attempt += 1;
                tracing::debug!(attempt, "retrying after serialization conflict");
                tokio::time::sleep(backoff(attempt)).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_conflicts_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_conflict_retry(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(ApiError::Conflict("simulated serialization failure".to_string()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), ApiError> = with_conflict_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::Conflict("still conflicting".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1 + MAX_RETRIES);
    }

    #[tokio::test]
    async fn domain_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), ApiError> = with_conflict_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::CapacityExceeded("group is full".to_string(), None)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_is_exponential_from_10ms() {
        assert_eq!(backoff(1), Duration::from_millis(10));
        assert_eq!(backoff(2), Duration::from_millis(20));
        assert_eq!(backoff(3), Duration::from_millis(40));
    }
}
