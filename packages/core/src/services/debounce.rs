//! Debounce Timer
//!
//! A single cancel-and-restart deadline. Every `restart` pushes the deadline
//! out by the full delay, so only a quiet period of `delay` after the last
//! restart lets [`Debounce::elapsed`] resolve. The timer owns no task: the
//! owner polls `elapsed()` from its own `select!` loop, which keeps firing
//! and state changes on one logical thread.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct Debounce {
    label: &'static str,
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(label: &'static str, delay: Duration) -> Self {
        Self {
            label,
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)arm the timer for a full window from now
    pub fn restart(&mut self) {
        let replaced = self.deadline.is_some();
        self.deadline = Some(Instant::now() + self.delay);
        tracing::debug!(
            "{} debounce {} ({}ms)",
            self.label,
            if replaced { "restarted" } else { "armed" },
            self.delay.as_millis()
        );
    }

    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            tracing::debug!("{} debounce cancelled", self.label);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolve once the window settles, disarming the timer
    ///
    /// Never resolves while disarmed. Cancel-safe: dropping the future
    /// before it completes leaves the deadline untouched.
    pub async fn elapsed(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_restart_pushes_deadline_out() {
        let start = Instant::now();
        let mut debounce = Debounce::new("test", Duration::from_millis(1000));

        debounce.restart();
        tokio::time::sleep(Duration::from_millis(400)).await;
        debounce.restart();

        debounce.elapsed().await;
        assert_eq!(start.elapsed(), Duration::from_millis(1400));
        assert!(!debounce.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_timer_never_fires() {
        let mut debounce = Debounce::new("test", Duration::from_millis(10));
        debounce.restart();
        debounce.cancel();

        let fired = tokio::time::timeout(Duration::from_secs(5), debounce.elapsed()).await;
        assert!(fired.is_err());
    }
}
