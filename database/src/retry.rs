use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Runs `operation` up to `max_retries + 1` times, doubling the delay after
/// each failure. The last error is returned unchanged.
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    max_retries: usize,
    initial_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = initial_delay;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                tracing::warn!(
                    "Attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );
                sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result: Result<&str, String> = retry_with_backoff(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(format!("busy {n}"))
                    } else {
                        Ok("connected")
                    }
                }
            },
            3,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(result, Ok("connected"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), String> = retry_with_backoff(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {n}")) }
            },
            2,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(result, Err("failure 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
