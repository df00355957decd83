//! Page loading with bounded retry
//!
//! The first fetch of a session races backend session bootstrap, which shows
//! up as a transient policy error. Those are retried with linear backoff;
//! every other failure ends the load at once.
//!
//! # Retry Behavior
//!
//! - **Retry on**: `StoreError::Transient` only
//! - **Backoff**: linear, `backoff_base * attempt` (1000ms, 2000ms, ...)
//! - **Attempts**: `max_attempts` in total, the first one included
//! - **Not found**: never retried, reported as `SessionError::NotFound`

use crate::db::{PageStore, StoreError};
use crate::models::{Page, PageIdentifier};
use crate::services::SessionError;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts,
            backoff_base,
        }
    }

    /// Wait after the given 1-based failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

pub struct PageLoader {
    store: Arc<dyn PageStore>,
    policy: RetryPolicy,
}

impl PageLoader {
    pub fn new(store: Arc<dyn PageStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn load(&self, identifier: &PageIdentifier) -> Result<Page, SessionError> {
        self.load_with(identifier, |_, _| {}).await
    }

    /// Load a page, calling `on_retry(attempt, delay)` before each backoff sleep
    pub async fn load_with<F>(
        &self,
        identifier: &PageIdentifier,
        mut on_retry: F,
    ) -> Result<Page, SessionError>
    where
        F: FnMut(u32, Duration) + Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.store.load_page(identifier).await {
                Ok(page) => {
                    if attempt > 1 {
                        tracing::debug!(
                            "Page {} loaded on attempt {}/{}",
                            identifier,
                            attempt,
                            max_attempts
                        );
                    }
                    return Ok(page);
                }

                Err(StoreError::NotFound(_)) => {
                    return Err(SessionError::not_found(identifier));
                }

                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::debug!(
                        "Transient error loading page {} on attempt {}/{}: {}. Retrying in {}ms",
                        identifier,
                        attempt,
                        max_attempts,
                        e,
                        delay.as_millis()
                    );
                    on_retry(attempt, delay);
                    tokio::time::sleep(delay).await;

                    attempt += 1;
                    continue;
                }

                Err(e) => {
                    if e.is_transient() {
                        tracing::warn!(
                            "Max load attempts ({}) exhausted for page {}",
                            max_attempts,
                            identifier
                        );
                    }
                    return Err(SessionError::load_failed(attempt, e));
                }
            }
        }
    }
}
