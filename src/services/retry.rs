use crate::error::AppResult;
use std::future::Future;
use std::time::Duration;

const BASE_DELAY: Duration = Duration::from_millis(50);
const MAX_DELAY: Duration = Duration::from_secs(5);

/// Exponential backoff: 50ms, 100ms, 200ms ... capped at 5s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    BASE_DELAY.saturating_mul(factor).min(MAX_DELAY)
}

/// Runs `op` again after a transient store error, up to `attempts` tries in total.
///
/// Only wrap operations that are safe to repeat: reads, and writes guarded by a
/// uniqueness constraint.
pub async fn retry_transient<T, F, Fut>(label: &str, attempts: u32, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Err(e) if e.is_transient() && attempt + 1 < attempts => {
                let delay = backoff_delay(attempt);
                tracing::warn!(
                    "{} failed with transient error (attempt {}/{}), retrying in {:?}: {}",
                    label,
                    attempt + 1,
                    attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> AppError {
        AppError::Database(sea_orm::DbErr::Conn(sea_orm::RuntimeErr::Internal(
            "connection reset".into(),
        )))
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(50));
        assert_eq!(backoff_delay(1), Duration::from_millis(100));
        assert_eq!(backoff_delay(3), Duration::from_millis(400));
        assert_eq!(backoff_delay(20), MAX_DELAY);
        assert_eq!(backoff_delay(64), MAX_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_transient("op", 5, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = retry_transient("op", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn business_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = retry_transient("op", 5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::DuplicateLedgerEntry) }
        })
        .await;
        assert!(matches!(result, Err(AppError::DuplicateLedgerEntry)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
