//! Retry with back-off.
//!
//! Failures are classified before each decision; only retryable kinds are
//! attempted again. The back-off sleep suspends only the calling task.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::classify::{classify, RawFailure};
use crate::error::{ErrorContext, Result};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default ceiling for any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(10_000);

/// Jitter percentage for back-off (±10%).
const JITTER_PERCENT: f64 = 0.1;

/// Retry configuration.
///
/// Unspecified fields come from `Default`:
///
/// ```rust
/// use dropclaim_core::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig { max_retries: 5, ..Default::default() };
/// assert_eq!(config.base_delay, Duration::from_millis(1000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    #[serde(with = "duration_millis")]
    pub base_delay: Duration,
    #[serde(with = "duration_millis")]
    pub max_delay: Duration,
    /// Double the delay each attempt instead of keeping it constant.
    pub exponential_backoff: bool,
    /// Spread each delay by ±10%.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            exponential_backoff: true,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Raise `max_delay` to at least `base_delay`.
    pub fn validated(mut self) -> Self {
        if self.max_delay < self.base_delay {
            self.max_delay = self.base_delay;
        }
        self
    }

    /// Delay after failed attempt `attempt` (0-indexed), before jitter.
    ///
    /// `min(base_delay * 2^attempt, max_delay)` when exponential, otherwise
    /// `base_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if !self.exponential_backoff {
            return self.base_delay;
        }
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

fn apply_jitter(delay: Duration) -> Duration {
    let jitter = rand::random::<f64>() * JITTER_PERCENT * 2.0 - JITTER_PERCENT;
    delay.mul_f64(1.0 + jitter)
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `config.max_retries` retries are exhausted.
///
/// The returned error is the classification of the last failure, with the
/// attempt index and `max_retries` in its context.
pub async fn with_retry<T, E, F, Fut>(mut operation: F, config: &RetryConfig) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Into<RawFailure>,
{
    let config = config.clone().validated();
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(raw) => {
                let mut context = ErrorContext::new();
                context.insert("attempt".into(), attempt.into());
                context.insert("max_retries".into(), config.max_retries.into());
                let error = classify(raw, context);

                if !error.is_retryable() {
                    debug!(attempt, kind = %error.kind(), "not retrying non-retryable failure");
                    return Err(error);
                }
                if attempt >= config.max_retries {
                    warn!(attempts = attempt + 1, kind = %error.kind(), "retries exhausted");
                    return Err(error);
                }

                let mut delay = config.delay_for_attempt(attempt);
                if config.jitter {
                    delay = apply_jitter(delay);
                }
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    kind = %error.kind(),
                    "attempt failed, backing off"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Serialization for Duration as milliseconds.
pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
