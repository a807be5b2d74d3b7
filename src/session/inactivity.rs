//! Automatic sign-out after a period without user activity.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

use super::provider::SessionProvider;
use crate::timers::ScopedTask;

/// Watches for user activity and signs the session out once `timeout`
/// passes without a [`touch`](Self::touch). Stops when dropped.
pub struct InactivityMonitor {
    last_activity: Arc<Mutex<Instant>>,
    timeout: Duration,
    _task: ScopedTask,
}

impl InactivityMonitor {
    pub fn spawn(provider: Arc<SessionProvider>, timeout: Duration) -> Self {
        let last_activity = Arc::new(Mutex::new(Instant::now()));
        let check_every = (timeout / 4).clamp(Duration::from_millis(250), Duration::from_secs(30));

        let seen = Arc::clone(&last_activity);
        let task = ScopedTask::spawn(async move {
            let mut interval = tokio::time::interval(check_every);
            loop {
                interval.tick().await;
                let idle = match seen.lock() {
                    Ok(last) => last.elapsed(),
                    Err(poisoned) => poisoned.into_inner().elapsed(),
                };
                if idle < timeout {
                    continue;
                }
                if provider.require_identity().await.is_ok() {
                    info!(idle_secs = idle.as_secs(), "Signing out after inactivity");
                    provider.sign_out().await;
                }
                // Restart the idle window so a later sign-in gets a full timeout.
                if let Ok(mut last) = seen.lock() {
                    *last = Instant::now();
                }
            }
        });

        Self {
            last_activity,
            timeout,
            _task: task,
        }
    }

    /// Record user activity.
    pub fn touch(&self) {
        if let Ok(mut last) = self.last_activity.lock() {
            *last = Instant::now();
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
