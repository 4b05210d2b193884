//! Resilience wrapper for vision providers
//!
//! Bounded retry with linear backoff on transient transport failures, plus a
//! circuit breaker that opens after a run of consecutive upstream failures
//! and half-opens again after a cooldown. Non-2xx responses are hard
//! failures: they trip the breaker but are never retried.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::vision::provider::{VisionError, VisionProvider};

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Default)]
struct BreakerState {
    failure_count: u32,
    open_until: Option<Instant>,
}

/// Retry + circuit-breaker policy applied in front of any provider
pub struct ResilientVision<P> {
    inner: P,
    max_retries: u32,
    breaker_threshold: u32,
    breaker_cooldown: Duration,
    breaker: Mutex<BreakerState>,
}

impl<P: VisionProvider> ResilientVision<P> {
    pub fn new(inner: P, max_retries: u32, breaker_threshold: u32, cooldown: Duration) -> Self {
        Self {
            inner,
            max_retries,
            breaker_threshold,
            breaker_cooldown: cooldown,
            breaker: Mutex::new(BreakerState::default()),
        }
    }

    /// Reject fast while the breaker is open; half-open after the cooldown
    async fn check_breaker(&self) -> Result<(), VisionError> {
        let mut state = self.breaker.lock().await;
        if let Some(until) = state.open_until {
            if Instant::now() < until {
                return Err(VisionError::Unavailable(
                    "circuit breaker open".to_string(),
                ));
            }
            // Cooldown elapsed: allow one probe attempt through
            state.open_until = None;
        }
        Ok(())
    }

    async fn record_failure(&self, correlation_id: &str) {
        let mut state = self.breaker.lock().await;
        state.failure_count += 1;
        if state.failure_count >= self.breaker_threshold {
            state.open_until = Some(Instant::now() + self.breaker_cooldown);
            log::warn!(
                "{} circuit breaker opened after {} consecutive failures",
                correlation_id,
                state.failure_count
            );
        }
    }

    async fn record_success(&self) {
        let mut state = self.breaker.lock().await;
        state.failure_count = 0;
        state.open_until = None;
    }

    pub async fn breaker_is_open(&self) -> bool {
        let state = self.breaker.lock().await;
        state
            .open_until
            .map(|until| Instant::now() < until)
            .unwrap_or(false)
    }
}

#[async_trait]
impl<P: VisionProvider> VisionProvider for ResilientVision<P> {
    async fn analyze_image(
        &self,
        image: &[u8],
        correlation_id: &str,
    ) -> Result<String, VisionError> {
        self.check_breaker().await?;

        let mut attempt = 0;
        loop {
            match self.inner.analyze_image(image, correlation_id).await {
                Ok(text) => {
                    self.record_success().await;
                    return Ok(text);
                }
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.max_retries {
                        self.record_failure(correlation_id).await;
                        return Err(err);
                    }
                    attempt += 1;
                    log::warn!(
                        "{} transport retry {}/{} after transient failure: {}",
                        correlation_id,
                        attempt,
                        self.max_retries,
                        err
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Provider that fails a configurable number of times before succeeding
    struct FlakyProvider {
        calls: AtomicU32,
        failures_before_success: u32,
        error: VisionError,
    }

    impl FlakyProvider {
        fn transient(failures: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures_before_success: failures,
                error: VisionError::Unavailable("connection reset".to_string()),
            }
        }

        fn rejecting(status: u16) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures_before_success: u32::MAX,
                error: VisionError::Rejected {
                    status,
                    body: "upstream error".to_string(),
                },
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VisionProvider for FlakyProvider {
        async fn analyze_image(&self, _: &[u8], _: &str) -> Result<String, VisionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(self.error.clone())
            } else {
                Ok("{}".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_to_success() {
        let resilient = ResilientVision::new(
            FlakyProvider::transient(2),
            2,
            5,
            Duration::from_secs(60),
        );

        let result = resilient.analyze_image(b"img", "corr").await;
        assert!(result.is_ok());
        assert_eq!(resilient.inner.call_count(), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let resilient = ResilientVision::new(
            FlakyProvider::transient(u32::MAX),
            2,
            10,
            Duration::from_secs(60),
        );

        let result = resilient.analyze_image(b"img", "corr").await;
        assert!(matches!(result, Err(VisionError::Unavailable(_))));
        // Initial attempt plus two retries
        assert_eq!(resilient.inner.call_count(), 3);
    }

    #[tokio::test]
    async fn test_non_2xx_is_never_retried() {
        let resilient = ResilientVision::new(
            FlakyProvider::rejecting(500),
            3,
            10,
            Duration::from_secs(60),
        );

        let result = resilient.analyze_image(b"img", "corr").await;
        assert!(matches!(result, Err(VisionError::Rejected { status: 500, .. })));
        assert_eq!(resilient.inner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_breaker_opens_after_consecutive_failures() {
        let resilient = ResilientVision::new(
            FlakyProvider::rejecting(503),
            0,
            3,
            Duration::from_secs(60),
        );

        for _ in 0..3 {
            let _ = resilient.analyze_image(b"img", "corr").await;
        }
        assert!(resilient.breaker_is_open().await);

        // Open breaker short-circuits without reaching the provider
        let before = resilient.inner.call_count();
        let result = resilient.analyze_image(b"img", "corr").await;
        assert!(matches!(result, Err(VisionError::Unavailable(_))));
        assert_eq!(resilient.inner.call_count(), before);
    }

    #[tokio::test]
    async fn test_breaker_half_opens_after_cooldown_and_success_resets() {
        let resilient = ResilientVision::new(
            FlakyProvider::transient(3),
            0,
            3,
            Duration::from_millis(10),
        );

        for _ in 0..3 {
            let _ = resilient.analyze_image(b"img", "corr").await;
        }
        assert!(resilient.breaker_is_open().await);

        tokio::time::sleep(Duration::from_millis(20)).await;

        // Probe attempt goes through and succeeds, closing the breaker
        let result = resilient.analyze_image(b"img", "corr").await;
        assert!(result.is_ok());
        assert!(!resilient.breaker_is_open().await);
    }
}
