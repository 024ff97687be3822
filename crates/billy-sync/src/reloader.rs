//! Leading-edge debounce for full panel reloads.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::locks::lock_or_recover;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome<R = ()> {
    Executed(R),
    /// Dropped by the debounce window or because a reload was running.
    Skipped,
}

impl<R> ReloadOutcome<R> {
    pub fn executed(&self) -> bool {
        matches!(self, ReloadOutcome::Executed(_))
    }
}

/// Runs at most one reload at a time and drops non-forced requests that
/// arrive within `window` of the previous execution's start.
///
/// Nothing is ever queued to run later: a dropped request is simply gone.
pub struct DebouncedReloader {
    window: Duration,
    last_started: Mutex<Option<Instant>>,
    running: tokio::sync::Mutex<()>,
}

impl DebouncedReloader {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_started: Mutex::new(None),
            running: tokio::sync::Mutex::new(()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run `reload` now if allowed.
    ///
    /// `force` waits for a running reload to finish and then always runs.
    /// Otherwise the request is skipped while a reload is running or within
    /// the window.
    pub async fn request<F, Fut, R>(&self, force: bool, reload: F) -> ReloadOutcome<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        let _running = if force {
            self.running.lock().await
        } else {
            match self.running.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!(event = "sync.reload.request_skipped", reason = "in_progress");
                    return ReloadOutcome::Skipped;
                }
            }
        };

        {
            let mut last_started = lock_or_recover(&self.last_started, "reloader");
            let now = Instant::now();
            if !force
                && let Some(previous) = *last_started
                && now.duration_since(previous) < self.window
            {
                debug!(event = "sync.reload.request_skipped", reason = "debounced");
                return ReloadOutcome::Skipped;
            }
            // Stamped before running so a slow or failing reload cannot wedge
            // the window.
            *last_started = Some(now);
        }

        debug!(event = "sync.reload.execute_started", forced = force);
        let result = reload().await;
        debug!(event = "sync.reload.execute_completed");
        ReloadOutcome::Executed(result)
    }
}
