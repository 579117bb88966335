//! Fixed-attempt retry policy
//!
//! [`RetryPolicy`] wraps any fallible async operation; [`RetryingFetcher`]
//! composes it with a [`PageFetcher`].

use crate::crawler::{FetchError, PageFetcher};
use crate::HarvestError;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The final error of an operation that used up all its attempts
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Retries an operation up to a fixed number of attempts
///
/// Every failed attempt is logged at `warn` with its attempt number; the last
/// one is additionally logged at `error` before the failure is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy {
    /// A policy making at most `max_attempts` attempts (at least one)
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::ZERO,
        }
    }

    /// Sleep `delay` between attempts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `op` until it succeeds or the attempts are used up
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        "Retrying {} due to {} (attempt {}/{})",
                        label,
                        e,
                        attempt,
                        self.max_attempts
                    );

                    if attempt >= self.max_attempts {
                        tracing::error!(
                            "Failed {} after {} attempts. Last error: {}",
                            label,
                            attempt,
                            e
                        );
                        return Err(Exhausted {
                            attempts: attempt,
                            last_error: e,
                        });
                    }

                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// A [`PageFetcher`] behind a [`RetryPolicy`]
#[derive(Clone)]
pub struct RetryingFetcher {
    inner: Arc<dyn PageFetcher>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(inner: Arc<dyn PageFetcher>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches `url`, retrying per the policy
    ///
    /// # Errors
    ///
    /// * `HarvestError::RetryExhausted` - every attempt failed; carries the
    ///   last attempt's error
    pub async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        self.policy
            .run(url, |_| self.inner.fetch(url))
            .await
            .map_err(|exhausted: Exhausted<FetchError>| HarvestError::RetryExhausted {
                url: url.to_string(),
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            })
    }
}
