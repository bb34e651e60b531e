//! The observation window shared by every session and the reporter.

use std::time::Duration;

use tokio::time::Instant;

/// A start instant plus a fixed duration. Copied into every task; never mutated.
///
/// Backed by [`tokio::time::Instant`], so a runtime with paused time drives it
/// deterministically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionClock {
    start: Instant,
    duration: Duration,
}

impl SessionClock {
    /// Starts the window now.
    pub fn start(duration: Duration) -> Self {
        Self::starting_at(Instant::now(), duration)
    }

    pub fn starting_at(start: Instant, duration: Duration) -> Self {
        Self { start, duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn deadline(&self) -> Instant {
        self.start + self.duration
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline()
    }

    /// Sleeps for `tick`, or until the deadline if that comes first.
    pub async fn sleep_tick(&self, tick: Duration) {
        let wake: Instant = (Instant::now() + tick).min(self.deadline());
        tokio::time::sleep_until(wake).await;
    }
}
