//! Retry with exponential backoff and jitter
//!
//! Used by transport clients for idempotent calls that fail transiently
//! (timeouts, connection resets, 503/429 responses). Features and the
//! listing service never retry on their own.

use std::collections::hash_map::RandomState;
use std::future::Future;
use std::hash::{BuildHasher, Hasher};
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Backoff policy built from a [`RetryConfig`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// A policy that runs every operation exactly once
    pub fn none() -> Self {
        Self::new(RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Delay before attempt `attempt + 1`, `attempt` counting from 1
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        let base_ms = self.config.initial_backoff_ms.saturating_mul(1u64 << exponent);
        let capped_ms = base_ms.min(self.config.max_backoff_ms);
        Duration::from_millis(capped_ms + jitter(capped_ms, attempt))
    }

    /// Run `operation` until it succeeds, fails with an error that is not
    /// transient, or the attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts() && is_retryable_error(&e) => {
                    let backoff = self.backoff(attempt);
                    tracing::debug!(
                        operation = name,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Retrying after transient error"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// Random extra delay of at most half of `delay_ms`, drawn from a freshly
/// keyed hasher
fn jitter(delay_ms: u64, attempt: u32) -> u64 {
    let spread = delay_ms / 2;
    if spread == 0 {
        return 0;
    }
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u32(attempt);
    hasher.finish() % (spread + 1)
}

/// Check if an error is transient
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Connectivity(msg) => {
            let msg = msg.to_lowercase();
            [
                "timeout",
                "timed out",
                "connection reset",
                "connection refused",
                "503",
                "service unavailable",
                "429",
                "too many requests",
            ]
            .iter()
            .any(|needle| msg.contains(needle))
        }
        Error::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::Interrupted
        ),
        _ => false,
    }
}
