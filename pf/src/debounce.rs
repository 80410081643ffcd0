//! Single-shot, cancel-and-restart timers
//!
//! A [`Debouncer`] is a scheduled task for one logical operation. Arming it
//! again replaces the pending deadline, so at most one window is ever pending.
//! It holds no callback: the owner awaits [`Debouncer::expired`] inside its
//! event loop and runs the operation itself, which makes cancellation a plain
//! state change with nothing left behind.

use std::future::pending;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::debug;

#[derive(Debug)]
pub struct Debouncer {
    name: &'static str,
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(name: &'static str, window: Duration) -> Self {
        debug!(%name, ?window, "Debouncer::new: called");
        Self {
            name,
            window,
            deadline: None,
        }
    }

    /// Start or restart the quiet period from now
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    /// Drop the pending deadline, if any
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            debug!(name = %self.name, "Debouncer::cancel: pending deadline dropped");
        }
    }

    /// Resolve when the armed deadline passes; never resolves while disarmed
    ///
    /// The caller must [`cancel`](Self::cancel) (or re-arm) after this fires,
    /// otherwise it resolves again immediately.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rearm_restarts_window() {
        let mut timer = Debouncer::new("test", Duration::from_millis(100));
        let start = Instant::now();
        timer.arm();
        tokio::time::advance(Duration::from_millis(80)).await;
        timer.arm();

        timer.expired().await;
        assert!(Instant::now() - start >= Duration::from_millis(180), "re-arming must push the deadline out");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_resolves_after_window() {
        let mut timer = Debouncer::new("test", Duration::from_millis(50));
        timer.arm();
        let start = Instant::now();
        timer.expired().await;
        assert!(Instant::now() - start >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_never_fires() {
        let mut timer = Debouncer::new("test", Duration::from_millis(50));
        timer.arm();
        timer.cancel();
        let fired = tokio::time::timeout(Duration::from_secs(5), timer.expired()).await;
        assert!(fired.is_err());
    }
}
