//! Cancellable background timers.
//!
//! Every periodic task in the app (countdowns, inactivity sign-out,
//! background refresh) is owned by the view or service that started it and
//! is torn down when that owner is dropped.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

/// A spawned task that is aborted when this handle is dropped.
#[derive(Debug)]
pub struct ScopedTask {
    handle: JoinHandle<()>,
}

impl ScopedTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    /// Abort the task now.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Run `tick` every `period` until the returned task is dropped.
///
/// The first tick fires after one full period.
pub fn spawn_interval<F, Fut>(period: Duration, mut tick: F) -> ScopedTask
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    ScopedTask::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            tick().await;
        }
    })
}

/// Countdown to a fixed deadline, e.g. a staking unlock or payout date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    deadline: DateTime<Utc>,
}

impl Countdown {
    pub fn until(deadline: DateTime<Utc>) -> Self {
        Self { deadline }
    }

    /// Time left at `now`; zero once the deadline has passed.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline - now).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_elapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }

    /// Render the remaining time as `"1d 02:03:04"` (days omitted when zero).
    pub fn display(&self, now: DateTime<Utc>) -> String {
        let total = self.remaining(now).as_secs();
        let days = total / 86_400;
        let hours = (total % 86_400) / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        if days > 0 {
            format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
        } else {
            format!("{hours:02}:{minutes:02}:{seconds:02}")
        }
    }
}
