//! Retry policy with exponential backoff and jitter.
//!
//! Retries live in the transport so adapters issue exactly one logical call
//! per invocation site and never loop themselves. Which statuses count as
//! transient is configurable: the SaaS APIs behind the adapters agree on 429
//! and the 5xx gateway family, and any of them may need more.

use std::time::Duration;

use rand::Rng;

/// Statuses retried by default.
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first call.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff: BackoffStrategy,
    /// Upper bound on a server-provided `Retry-After`; `None` ignores the
    /// header and always backs off.
    pub max_retry_after: Option<Duration>,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff: BackoffStrategy::Exponential {
                factor: 2.0,
                jitter: true,
            },
            max_retry_after: Some(Duration::from_secs(60)),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Stop honouring `Retry-After`.
    pub fn ignore_retry_after(mut self) -> Self {
        self.max_retry_after = None;
        self
    }

    /// Also retry `status`.
    pub fn with_retry_status(mut self, status: u16) -> Self {
        if !self.retry_statuses.contains(&status) {
            self.retry_statuses.push(status);
        }
        self
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    Constant,
    /// `initial * factor^attempt`, plus up to the same again when `jitter`
    /// is set.
    Exponential { factor: f64, jitter: bool },
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (0-based), capped at `max`.
    pub fn delay(&self, attempt: u32, initial: Duration, max: Duration) -> Duration {
        let secs = match *self {
            BackoffStrategy::Constant => initial.as_secs_f64(),
            BackoffStrategy::Exponential { factor, jitter } => {
                let base = initial.as_secs_f64() * factor.powi(attempt as i32);
                if jitter {
                    base + rand::rng().random::<f64>() * base
                } else {
                    base
                }
            }
        };
        Duration::from_secs_f64(secs).min(max)
    }
}

/// Retry state for one logical request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    attempt: u32,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Retries taken so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.config.retries_status(status)
    }

    /// Delay before the next retry, or `None` once retries are used up.
    pub fn next_delay(&mut self, retry_after: Option<Duration>) -> Option<Duration> {
        if self.attempt >= self.config.max_retries {
            return None;
        }
        let delay = match (retry_after, self.config.max_retry_after) {
            (Some(wait), Some(cap)) => wait.min(cap),
            _ => self.config.backoff.delay(
                self.attempt,
                self.config.initial_delay,
                self.config.max_delay,
            ),
        };
        self.attempt += 1;
        Some(delay)
    }
}
