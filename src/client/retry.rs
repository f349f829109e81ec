//! # Retry Logic and Backoff Strategies
//!
//! Bounded retry with exponential backoff for transport failures.
//!
//! Only [`ClientError::Network`] is retried. A non-success status, a
//! malformed payload or a domain error is returned on the first attempt.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cardkeep::client::retry::RetryPolicy;
//! use cardkeep::shared::config::RetrySettings;
//!
//! # async fn example() -> cardkeep::shared::ClientResult<()> {
//! let policy = RetryPolicy::from_settings(&RetrySettings::default());
//! let value = policy.run("GET /api/sets", || async { Ok::<_, cardkeep::shared::ClientError>(1) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::shared::config::RetrySettings;
use crate::shared::error::ClientResult;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Backoff strategy configuration
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed interval between retries
    Fixed {
        interval: Duration,
    },
    /// Exponential backoff with jitter
    Exponential {
        base: Duration,
        max: Duration,
        /// Jitter factor (0.0 to 1.0)
        jitter: f64,
    },
}

/// Retry policy for remote calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            strategy: BackoffStrategy::Exponential {
                base: settings.base_delay,
                max: settings.max_delay,
                jitter: settings.jitter,
            },
        }
    }

    /// Single attempt, no retry
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            strategy: BackoffStrategy::Fixed {
                interval: Duration::ZERO,
            },
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match &self.strategy {
            BackoffStrategy::Fixed { interval } => *interval,
            BackoffStrategy::Exponential { base, max, jitter } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                let delay = base.saturating_mul(factor).min(*max);

                let jitter_ms = (delay.as_millis() as f64 * jitter) as u64;
                if jitter_ms == 0 {
                    delay
                } else {
                    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
                }
            }
        }
    }

    /// Run `op`, retrying transport failures up to `max_retries` times
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "[Http] {} failed ({}), retry {}/{} in {:?}",
                        label,
                        err,
                        attempt,
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
