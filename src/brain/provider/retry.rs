//! Exponential backoff for provider calls.

use super::error::Result;
use std::future::Future;
use std::time::Duration;

/// Backoff settings.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(20),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let delay = self.initial_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or retries run out.
pub async fn retry_with_backoff<F, Fut, T>(mut op: F, config: &RetryConfig) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_retries && e.is_retryable() => {
                let delay = config.delay_for(attempt);
                tracing::warn!(
                    "Provider call failed (attempt {}/{}), retrying in {:?}: {}",
                    attempt + 1,
                    config.max_retries + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::provider::ProviderError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = retry_with_backoff(
            || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ProviderError::RateLimitExceeded("busy".into()))
                    } else {
                        Ok(7)
                    }
                }
            },
            &fast(),
        )
        .await;
        assert_eq!(result.expect("ok"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<()> = retry_with_backoff(
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::InvalidApiKey)
                }
            },
            &fast(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_is_capped() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.delay_for(0), Duration::from_millis(500));
        assert_eq!(cfg.delay_for(10), Duration::from_secs(20));
    }
}
