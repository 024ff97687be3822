//! Background status polling with change detection.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use billy_protocol::{Personality, ServiceState, UserRef};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::SnapshotCache;
use crate::errors::ApiError;
use crate::locks::lock_or_recover;
use crate::snapshot::{Snapshot, StatusSnapshot};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Status fields the poller can compare between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchedField {
    ServiceState,
    CurrentUser,
    CurrentPersona,
    CurrentPersonality,
    ProfileList,
    PersonaList,
    ConfigVersion,
    MemoryCount,
}

impl WatchedField {
    pub const ALL: [WatchedField; 8] = [
        WatchedField::ServiceState,
        WatchedField::CurrentUser,
        WatchedField::CurrentPersona,
        WatchedField::CurrentPersonality,
        WatchedField::ProfileList,
        WatchedField::PersonaList,
        WatchedField::ConfigVersion,
        WatchedField::MemoryCount,
    ];
}

/// One field that differs between two consecutive status snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    ServiceState {
        previous: ServiceState,
        current: ServiceState,
    },
    CurrentUser {
        previous: UserRef,
        current: UserRef,
    },
    CurrentPersona {
        previous: Option<String>,
        current: Option<String>,
    },
    CurrentPersonality {
        previous: Option<Personality>,
        current: Option<Personality>,
    },
    ProfileList {
        previous: Vec<String>,
        current: Vec<String>,
    },
    PersonaList {
        previous: Vec<String>,
        current: Vec<String>,
    },
    ConfigVersion {
        previous: Option<String>,
        current: Option<String>,
    },
    MemoryCount {
        previous: u64,
        current: u64,
    },
}

impl StatusChange {
    pub fn field(&self) -> WatchedField {
        match self {
            StatusChange::ServiceState { .. } => WatchedField::ServiceState,
            StatusChange::CurrentUser { .. } => WatchedField::CurrentUser,
            StatusChange::CurrentPersona { .. } => WatchedField::CurrentPersona,
            StatusChange::CurrentPersonality { .. } => WatchedField::CurrentPersonality,
            StatusChange::ProfileList { .. } => WatchedField::ProfileList,
            StatusChange::PersonaList { .. } => WatchedField::PersonaList,
            StatusChange::ConfigVersion { .. } => WatchedField::ConfigVersion,
            StatusChange::MemoryCount { .. } => WatchedField::MemoryCount,
        }
    }
}

/// Compare two snapshots over `watch`, in watch-list order.
///
/// The current user is compared by identity, so a bare id turning into a
/// fully loaded profile of the same user is not a change.
pub fn diff_status(
    previous: &StatusSnapshot,
    current: &StatusSnapshot,
    watch: &[WatchedField],
) -> Vec<StatusChange> {
    watch
        .iter()
        .filter_map(|field| match field {
            WatchedField::ServiceState => (previous.service_state != current.service_state)
                .then(|| StatusChange::ServiceState {
                    previous: previous.service_state,
                    current: current.service_state,
                }),
            WatchedField::CurrentUser => (!previous.current_user.same_user(&current.current_user))
                .then(|| StatusChange::CurrentUser {
                    previous: previous.current_user.clone(),
                    current: current.current_user.clone(),
                }),
            WatchedField::CurrentPersona => (previous.current_persona != current.current_persona)
                .then(|| StatusChange::CurrentPersona {
                    previous: previous.current_persona.clone(),
                    current: current.current_persona.clone(),
                }),
            WatchedField::CurrentPersonality => (previous.current_personality
                != current.current_personality)
                .then(|| StatusChange::CurrentPersonality {
                    previous: previous.current_personality.clone(),
                    current: current.current_personality.clone(),
                }),
            WatchedField::ProfileList => (previous.available_profiles
                != current.available_profiles)
                .then(|| StatusChange::ProfileList {
                    previous: previous.available_profiles.clone(),
                    current: current.available_profiles.clone(),
                }),
            WatchedField::PersonaList => (previous.available_personas
                != current.available_personas)
                .then(|| StatusChange::PersonaList {
                    previous: previous.available_personas.clone(),
                    current: current.available_personas.clone(),
                }),
            WatchedField::ConfigVersion => (previous.config_version != current.config_version)
                .then(|| StatusChange::ConfigVersion {
                    previous: previous.config_version.clone(),
                    current: current.config_version.clone(),
                }),
            WatchedField::MemoryCount => (previous.memory_count != current.memory_count).then(
                || StatusChange::MemoryCount {
                    previous: previous.memory_count,
                    current: current.memory_count,
                },
            ),
        })
        .collect()
}

/// What one poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// First successful cycle: snapshot stored, nothing emitted.
    Baseline,
    /// Snapshot stored, diffing skipped.
    Suppressed,
    /// Snapshot stored, these changes were published.
    Changes(Vec<StatusChange>),
    /// Fetch failed; baseline left untouched.
    Skipped(ApiError),
    /// The poller was restarted while this cycle was fetching; nothing stored.
    Superseded,
}

struct PollState {
    last_known: Option<Arc<Snapshot<StatusSnapshot>>>,
    suppressed_until: Option<Instant>,
    /// Incremented by every `start`. Cycles of an earlier run never touch the baseline.
    run: u64,
}

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodically fetches status and publishes [`StatusChange`]s.
pub struct ChangePoller {
    cache: Arc<SnapshotCache<StatusSnapshot>>,
    interval: Duration,
    watch: Vec<WatchedField>,
    state: Mutex<PollState>,
    task: Mutex<Option<PollTask>>,
    changes: broadcast::Sender<StatusChange>,
}

impl ChangePoller {
    pub fn new(cache: Arc<SnapshotCache<StatusSnapshot>>, interval: Duration) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            cache,
            interval,
            watch: WatchedField::ALL.to_vec(),
            state: Mutex::new(PollState {
                last_known: None,
                suppressed_until: None,
                run: 0,
            }),
            task: Mutex::new(None),
            changes,
        }
    }

    /// Restrict change detection to `watch`.
    pub fn with_watch_list(mut self, watch: Vec<WatchedField>) -> Self {
        self.watch = watch;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.changes.subscribe()
    }

    pub fn last_known(&self) -> Option<Arc<Snapshot<StatusSnapshot>>> {
        lock_or_recover(&self.state, "poller_state").last_known.clone()
    }

    /// Start ticking. The first cycle runs immediately and sets the baseline.
    ///
    /// Each start opens a new run; cycles still in flight from an earlier
    /// run finish as [`PollOutcome::Superseded`].
    pub fn start(self: &Arc<Self>) {
        let mut task = lock_or_recover(&self.task, "poller_task");
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            debug!(event = "sync.poller.start_ignored", reason = "already_running");
            return;
        }

        let run = {
            let mut state = lock_or_recover(&self.state, "poller_state");
            state.run += 1;
            state.last_known = None;
            state.run
        };
        // A fetch still running from a stopped run must not seed the new baseline.
        self.cache.invalidate();

        let cancel = CancellationToken::new();
        let poller = Arc::clone(self);
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poller.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        poller.poll_cycle(run).await;
                    }
                }
            }
            debug!(event = "sync.poller.loop_exited");
        });

        info!(
            event = "sync.poller.start_completed",
            run = run,
            interval_ms = self.interval.as_millis() as u64
        );
        *task = Some(PollTask { cancel, handle });
    }

    /// Stop ticking. A cycle already in progress completes; no further tick runs.
    pub fn stop(&self) {
        if let Some(task) = lock_or_recover(&self.task, "poller_task").take() {
            task.cancel.cancel();
            info!(event = "sync.poller.stop_completed");
        }
    }

    pub fn is_running(&self) -> bool {
        lock_or_recover(&self.task, "poller_task")
            .as_ref()
            .is_some_and(|t| !t.cancel.is_cancelled() && !t.handle.is_finished())
    }

    /// Mute change reactions for `duration`. Never shortens an active window.
    pub fn suppress_for(&self, duration: Duration) {
        let until = Instant::now() + duration;
        let mut state = lock_or_recover(&self.state, "poller_state");
        state.suppressed_until = Some(match state.suppressed_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
        debug!(
            event = "sync.poller.suppressed",
            duration_ms = duration.as_millis() as u64
        );
    }

    pub fn is_suppressed(&self) -> bool {
        lock_or_recover(&self.state, "poller_state")
            .suppressed_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Run one poll cycle as part of the current run.
    pub async fn poll_once(&self) -> PollOutcome {
        let run = lock_or_recover(&self.state, "poller_state").run;
        self.poll_cycle(run).await
    }

    async fn poll_cycle(&self, run: u64) -> PollOutcome {
        let read = self.cache.get(true).await;
        if let Some(error) = read.error() {
            debug!(event = "sync.poller.cycle_skipped", error = %error);
            return PollOutcome::Skipped(error.clone());
        }
        let snapshot = read.into_snapshot();

        let (previous, suppressed) = {
            let mut state = lock_or_recover(&self.state, "poller_state");
            if state.run != run {
                debug!(
                    event = "sync.poller.cycle_superseded",
                    run = run,
                    current_run = state.run
                );
                return PollOutcome::Superseded;
            }
            let previous = state.last_known.replace(Arc::clone(&snapshot));
            let suppressed = state
                .suppressed_until
                .is_some_and(|until| Instant::now() < until);
            (previous, suppressed)
        };

        let Some(previous) = previous else {
            debug!(event = "sync.poller.baseline_stored");
            return PollOutcome::Baseline;
        };
        if suppressed {
            debug!(event = "sync.poller.cycle_suppressed");
            return PollOutcome::Suppressed;
        }

        let changes = diff_status(&previous, &snapshot, &self.watch);
        for change in &changes {
            info!(event = "sync.poller.change_detected", field = ?change.field());
            if self.changes.send(change.clone()).is_err() {
                warn!(event = "sync.poller.change_unobserved", field = ?change.field());
            }
        }
        PollOutcome::Changes(changes)
    }
}

#[cfg(test)]
mod tests;
