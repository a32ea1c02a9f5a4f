//! Retry with exponential backoff, layered over any metric source
//!
//! The aggregator makes exactly one attempt per adapter. Callers that want
//! retries wrap adapters in a [`RetryingSource`] before handing them over;
//! the aggregator then still calls each (wrapped) adapter once.

use crate::config::MonitorConfig;
use async_trait::async_trait;
use monitor_core::{MetricSource, ProviderRecord, SourceError, SourceId, TimeRange};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// How often, and how patiently, a transient source failure is retried
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// Upper bound for any single wait
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy matching the retry settings of a [`MonitorConfig`]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            initial_backoff: config.retry_backoff_base,
            max_backoff: config.retry_backoff(config.max_retries.saturating_sub(1)),
            backoff_multiplier: 2.0,
        }
    }

    /// A single attempt, no waiting
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Short waits, for tests
    #[cfg(test)]
    pub(crate) fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        }
    }

    /// Wait before the `retry`-th retry; zero for the first attempt
    fn backoff_duration(&self, retry: u32) -> Duration {
        let Some(exponent) = retry.checked_sub(1) else {
            return Duration::ZERO;
        };
        let exponent = i32::try_from(exponent).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Run `fetch` until it succeeds, fails permanently, or attempts run out
    ///
    /// Only [`SourceError::Unavailable`] is retried; invalid data would be
    /// just as invalid on the next attempt.
    pub async fn execute<F, Fut, T>(&self, source: SourceId, mut fetch: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let error = match fetch().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(%source, attempt, "source recovered after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_transient() || attempt >= attempts {
                warn!(%source, attempt, error = %error, "giving up on source");
                return Err(error);
            }

            let backoff = self.backoff_duration(attempt);
            warn!(%source, attempt, ?backoff, error = %error, "source unavailable, retrying");
            sleep(backoff).await;
            attempt += 1;
        }
    }
}

/// A metric source that retries transient failures of the wrapped source
pub struct RetryingSource {
    inner: Arc<dyn MetricSource>,
    policy: RetryPolicy,
}

impl RetryingSource {
    pub fn new(inner: Arc<dyn MetricSource>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl MetricSource for RetryingSource {
    fn id(&self) -> SourceId {
        self.inner.id()
    }

    async fn fetch(&self, range: &TimeRange) -> Result<ProviderRecord, SourceError> {
        self.policy
            .execute(self.inner.id(), || self.inner.fetch(range))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_core::VentureInvestment;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with `error` for the first `failures` calls, then succeeds
    struct Flaky {
        calls: AtomicU32,
        failures: u32,
        error: SourceError,
    }

    #[async_trait]
    impl MetricSource for Flaky {
        fn id(&self) -> SourceId {
            SourceId::VentureData
        }

        async fn fetch(&self, _range: &TimeRange) -> Result<ProviderRecord, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(self.error.clone())
            } else {
                Ok(ProviderRecord::Venture(VentureInvestment::default()))
            }
        }
    }

    fn range() -> TimeRange {
        TimeRange::parse("2024-01-01", "2024-03-31").unwrap()
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(100));
        assert_eq!(policy.max_backoff, Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_duration(0), Duration::ZERO);
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_duration(20), Duration::from_secs(10));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from_config(&MonitorConfig::default());
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_secs(1));
        assert_eq!(policy.max_backoff, Duration::from_secs(4));
    }

    #[test]
    fn test_policy_from_unvalidated_config_does_not_overflow() {
        let config = MonitorConfig {
            max_retries: 40,
            ..MonitorConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_backoff, Duration::MAX);
        assert_eq!(policy.backoff_duration(1), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_retries_unavailable_until_success() {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            failures: 2,
            error: SourceError::unavailable("503"),
        });
        let source = RetryingSource::new(flaky.clone(), RetryPolicy::fast());

        tokio_test::assert_ok!(source.fetch(&range()).await);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_invalid_data() {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            failures: 5,
            error: SourceError::invalid("bad shape"),
        });
        let source = RetryingSource::new(flaky.clone(), RetryPolicy::fast());

        let err = tokio_test::assert_err!(source.fetch(&range()).await);
        assert!(matches!(err, SourceError::DataInvalid(_)));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            failures: 10,
            error: SourceError::unavailable("timeout"),
        });
        let source = RetryingSource::new(flaky.clone(), RetryPolicy::fast());

        tokio_test::assert_err!(source.fetch(&range()).await);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }
}
