// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use gulabo_core::GulaboError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Retry policy: `max_attempts` total tries, sleeping `base_delay × 2ⁿ`
/// before retry `n` (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay slept after failed attempt `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }

    /// Run `op` until it succeeds, fails terminally, or attempts run out.
    ///
    /// `op` receives the 0-based attempt number. Errors for which
    /// [`GulaboError::is_retryable`] is false are returned as-is. Exhaustion
    /// returns [`GulaboError::RetriesExhausted`] wrapping the last error.
    pub async fn run<T, F, Fut>(
        &self,
        provider: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, GulaboError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GulaboError>>,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(GulaboError::Cancelled);
            }

            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if attempt + 1 >= self.max_attempts {
                return Err(GulaboError::RetriesExhausted {
                    provider: provider.to_string(),
                    attempts: self.max_attempts,
                    source: Box::new(err),
                });
            }

            let delay = self.delay_for_attempt(attempt);
            warn!(
                provider,
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "provider call failed, backing off"
            );
            metrics::counter!("gulabo_provider_retries_total", "provider" => provider.to_string())
                .increment(1);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GulaboError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn policy(max: u32) -> RetryPolicy {
        RetryPolicy::new(max, Duration::from_millis(100))
    }

    #[test]
    fn delays_double() {
        let p = RetryPolicy::new(5, Duration::from_secs(1));
        assert_eq!(p.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(p.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(p.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(p.delay_for_attempt(3), Duration::from_secs(8));
    }

    #[test]
    fn zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = policy(3)
            .run("test", &CancellationToken::new(), |_| {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(GulaboError::provider("flaky"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn each_backoff_is_logged_with_provider() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let _ = policy(2)
            .run("deepgram", &CancellationToken::new(), |_| {
                c.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(GulaboError::provider("503")) }
            })
            .await;

        assert!(logs_contain("provider call failed, backing off"));
        assert!(logs_contain("deepgram"));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let start = Instant::now();
        let err = policy(3)
            .run("groq", &CancellationToken::new(), |_| {
                c.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(GulaboError::provider("down")) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            GulaboError::RetriesExhausted { provider, attempts, .. } => {
                assert_eq!(provider, "groq");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        // 100ms + 200ms of backoff, none after the last attempt.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(400), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let err = policy(5)
            .run("test", &CancellationToken::new(), |_| {
                c.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(GulaboError::Config("bad key".into())) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GulaboError::Config(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_stops_without_another_attempt() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = RetryPolicy::new(3, Duration::from_secs(10))
            .run("test", &cancel, |_| {
                c.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(GulaboError::provider("x")) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GulaboError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn already_cancelled_never_calls() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);
        let err = policy(3)
            .run("test", &cancel, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, GulaboError>(()) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GulaboError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
