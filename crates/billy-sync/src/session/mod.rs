//! Session controller: the single owner of "who is the current user" and
//! "which persona is active" on the panel side.
//!
//! Every mutation follows the same steps:
//! 1. apply the remote call (nothing changes locally if it fails)
//! 2. update local state optimistically and re-render
//! 3. suppress the poller so it does not echo the change back
//! 4. force-reload config, reconcile with the device, re-render

mod events;
mod view;

pub use events::{Notification, NotificationLevel, SessionEvent};
pub use view::{IdentityView, PanelView, PersonaSelector, ProfileRow};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use billy_config::PanelConfig;
use billy_protocol::{
    SaveSettingsRequest, ServiceAction, UserProfile, UserRef, is_guest_name, same_id,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::DeviceApi;
use crate::cache::SnapshotCache;
use crate::errors::{ApiError, SessionError};
use crate::locks::lock_or_recover;
use crate::poller::{ChangePoller, StatusChange};
use crate::reloader::{DebouncedReloader, ReloadOutcome};
use crate::snapshot::{ConfigSnapshot, StatusSnapshot};
use view::ViewInputs;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Side-effect switches for session mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub suppression_window: Duration,
    pub persist_current_user: bool,
    pub restart_on_persona_switch: bool,
}

impl SessionOptions {
    pub fn from_config(config: &PanelConfig) -> Self {
        Self {
            suppression_window: config.sync.suppression_window(),
            persist_current_user: config.session.persist_current_user(),
            restart_on_persona_switch: config.session.restart_on_persona_switch(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&PanelConfig::default())
    }
}

/// Collaborators of a [`SessionController`], built by the caller.
pub struct SessionDeps {
    pub api: Arc<dyn DeviceApi>,
    pub config_cache: Arc<SnapshotCache<ConfigSnapshot>>,
    pub status_cache: Arc<SnapshotCache<StatusSnapshot>>,
    pub poller: Arc<ChangePoller>,
    pub reloader: Arc<DebouncedReloader>,
}

impl SessionDeps {
    /// Wire caches, poller and reloader over `api` with the configured timings.
    pub fn from_config(api: Arc<dyn DeviceApi>, config: &PanelConfig) -> Self {
        let config_cache = Arc::new(SnapshotCache::for_config(
            Arc::clone(&api),
            config.sync.config_ttl(),
        ));
        let status_cache = Arc::new(SnapshotCache::for_status(
            Arc::clone(&api),
            config.sync.status_ttl(),
        ));
        let poller = Arc::new(ChangePoller::new(
            Arc::clone(&status_cache),
            config.sync.poll_interval(),
        ));
        let reloader = Arc::new(DebouncedReloader::new(config.sync.debounce_window()));
        Self {
            api,
            config_cache,
            status_cache,
            poller,
            reloader,
        }
    }
}

#[derive(Default)]
struct SessionState {
    current_user: UserRef,
    current_persona: Option<String>,
    default_user: Option<String>,
    /// Profile list as last rendered, for change detection.
    known_profiles: Vec<UserProfile>,
    view: PanelView,
    /// Bumped by every successful mutation. A reload that started under an
    /// older epoch must not overwrite local state.
    mutation_epoch: u64,
}

pub struct SessionController {
    api: Arc<dyn DeviceApi>,
    config_cache: Arc<SnapshotCache<ConfigSnapshot>>,
    status_cache: Arc<SnapshotCache<StatusSnapshot>>,
    poller: Arc<ChangePoller>,
    reloader: Arc<DebouncedReloader>,
    options: SessionOptions,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    notifications: broadcast::Sender<Notification>,
}

impl SessionController {
    pub fn new(deps: SessionDeps, options: SessionOptions) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (notifications, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            api: deps.api,
            config_cache: deps.config_cache,
            status_cache: deps.status_cache,
            poller: deps.poller,
            reloader: deps.reloader,
            options,
            state: Mutex::new(SessionState::default()),
            events,
            notifications,
        })
    }

    /// Build a controller and its collaborators from configuration.
    pub fn from_config(api: Arc<dyn DeviceApi>, config: &PanelConfig) -> Arc<Self> {
        Self::new(
            SessionDeps::from_config(api, config),
            SessionOptions::from_config(config),
        )
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn poller(&self) -> &Arc<ChangePoller> {
        &self.poller
    }

    pub fn current_user(&self) -> UserRef {
        self.state().current_user.clone()
    }

    pub fn current_persona(&self) -> Option<String> {
        self.state().current_persona.clone()
    }

    pub fn default_user(&self) -> Option<String> {
        self.state().default_user.clone()
    }

    pub fn view(&self) -> PanelView {
        self.state().view.clone()
    }

    pub fn status(&self) -> Option<Arc<crate::snapshot::Snapshot<StatusSnapshot>>> {
        self.status_cache.peek()
    }

    pub async fn switch_user(&self, id: &str) -> Result<(), SessionError> {
        let id = id.trim();
        if is_guest_name(id) {
            return self.switch_to_guest().await;
        }
        info!(event = "sync.session.switch_user_started", user = id);

        self.apply(
            "switch_user",
            "Failed to switch user",
            self.api.set_current_user(id),
        )
        .await?;

        if self.options.persist_current_user {
            self.follow_up(
                "persist_current_user",
                "Switched user, but the device will not remember it after reboot",
                self.api
                    .save_settings(&SaveSettingsRequest::current_user(id)),
            )
            .await;
        }

        let user = UserRef::IdOnly { id: id.to_string() };
        self.set_current_user(user.clone());
        self.emit(SessionEvent::UserChanged { user });
        self.poller.suppress_for(self.options.suppression_window);

        self.reconcile().await;
        let label = self.view().identity.label;
        self.notify(
            NotificationLevel::Success,
            format!("Switched to {}", label),
        );
        info!(event = "sync.session.switch_user_completed", user = id);
        Ok(())
    }

    pub async fn switch_to_guest(&self) -> Result<(), SessionError> {
        info!(event = "sync.session.switch_guest_started");

        self.apply(
            "switch_to_guest",
            "Failed to switch to guest mode",
            self.api.clear_current_user(),
        )
        .await?;

        self.set_current_user(UserRef::None);
        self.emit(SessionEvent::UserChanged {
            user: UserRef::None,
        });
        self.poller.suppress_for(self.options.suppression_window);

        self.reconcile().await;
        self.notify(NotificationLevel::Success, "Switched to guest mode");
        info!(event = "sync.session.switch_guest_completed");
        Ok(())
    }

    /// Set the profile loaded on boot. `guest` (or empty) clears it.
    ///
    /// Does not touch the running session, so the poller is not suppressed.
    pub async fn set_default_user(&self, id: &str) -> Result<(), SessionError> {
        let id = id.trim();
        let default_user = (!is_guest_name(id)).then(|| id.to_string());
        info!(event = "sync.session.set_default_started", user = id);

        let value = default_user.as_deref().unwrap_or("guest");
        self.apply(
            "set_default_user",
            "Failed to save default user",
            self.api
                .save_settings(&SaveSettingsRequest::default_user(value)),
        )
        .await?;

        self.state().default_user = default_user.clone();
        self.render();
        self.emit(SessionEvent::DefaultUserChanged {
            default_user: default_user.clone(),
        });
        self.notify(
            NotificationLevel::Success,
            match default_user {
                Some(ref id) => format!("Default user set to {}", id),
                None => "Default user set to guest".to_string(),
            },
        );
        info!(event = "sync.session.set_default_completed", user = value);
        Ok(())
    }

    /// Switch persona for the current user, or the live persona in guest mode.
    ///
    /// A running service is restarted so the persona takes effect.
    pub async fn switch_persona(&self, persona: &str) -> Result<(), SessionError> {
        let persona = persona.trim();
        if persona.is_empty() {
            return Err(SessionError::InvalidInput {
                message: "persona name is empty".to_string(),
            });
        }
        info!(event = "sync.session.switch_persona_started", persona = persona);

        let was_active = self
            .status_cache
            .get(false)
            .await
            .snapshot()
            .service_state
            .is_active();
        let guest = self.state().current_user.is_guest();

        if guest {
            self.apply(
                "switch_persona",
                "Failed to switch persona",
                self.api.set_live_persona(persona),
            )
            .await?;
        } else {
            self.apply(
                "switch_persona",
                "Failed to save persona",
                self.api.set_preferred_persona(persona),
            )
            .await?;
        }

        self.state().current_persona = Some(persona.to_string());
        self.render();
        self.emit(SessionEvent::PersonaChanged {
            persona: Some(persona.to_string()),
        });
        self.poller.suppress_for(self.options.suppression_window);

        if was_active && self.options.restart_on_persona_switch {
            self.notify(
                NotificationLevel::Info,
                format!("Persona set to {}, restarting…", persona),
            );
            match self.api.control_service(ServiceAction::Restart).await {
                Ok(()) => self.notify(
                    NotificationLevel::Success,
                    format!("Restarted with persona {}", persona),
                ),
                Err(e) => {
                    error!(event = "sync.session.persona_restart_failed", error = %e);
                    self.notify(
                        NotificationLevel::Error,
                        e.user_message("Persona saved, but the restart failed"),
                    );
                }
            }
            self.status_cache.invalidate();
        } else {
            self.notify(
                NotificationLevel::Success,
                format!("Persona set to {}", persona),
            );
        }

        if !guest {
            self.reconcile().await;
        }
        info!(event = "sync.session.switch_persona_completed", persona = persona);
        Ok(())
    }

    pub async fn update_display_name(&self, display_name: &str) -> Result<(), SessionError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(SessionError::InvalidInput {
                message: "display name is empty".to_string(),
            });
        }
        let user = self.require_user("update_display_name")?;
        info!(event = "sync.session.rename_started", user = %user);

        self.apply(
            "update_display_name",
            "Failed to update display name",
            self.api.update_display_name(&user, display_name),
        )
        .await?;

        let profiles = {
            let mut state = self.state();
            if let UserRef::Full { ref mut profile } = state.current_user {
                profile.display_name = Some(display_name.to_string());
            }
            if let Some(profile) = state
                .known_profiles
                .iter_mut()
                .find(|p| same_id(&p.id, &user))
            {
                profile.display_name = Some(display_name.to_string());
            }
            profile_ids(&state.known_profiles)
        };
        self.render();
        self.emit(SessionEvent::ProfilesChanged { profiles });
        self.poller.suppress_for(self.options.suppression_window);

        self.reconcile().await;
        self.notify(
            NotificationLevel::Success,
            format!("Display name set to {}", display_name),
        );
        info!(event = "sync.session.rename_completed", user = %user);
        Ok(())
    }

    /// Delete one memory of the current user, keyed by its date.
    pub async fn delete_memory(&self, memory_date: &str) -> Result<(), SessionError> {
        let user = self.require_user("delete_memory")?;
        info!(event = "sync.session.delete_memory_started", user = %user, date = memory_date);

        self.apply(
            "delete_memory",
            "Failed to delete memory",
            self.api.delete_memory(&user, memory_date),
        )
        .await?;

        if let UserRef::Full { ref mut profile } = self.state().current_user {
            profile.memories.retain(|m| m.date != memory_date);
        }
        self.render();
        self.poller.suppress_for(self.options.suppression_window);

        self.reconcile().await;
        self.notify(NotificationLevel::Success, "Memory deleted");
        info!(event = "sync.session.delete_memory_completed", user = %user);
        Ok(())
    }

    pub async fn delete_profile(&self, id: &str) -> Result<(), SessionError> {
        let id = id.trim();
        if self.state().current_user.is(id) {
            let err = SessionError::ActiveProfileDeletion { id: id.to_string() };
            warn!(event = "sync.session.delete_profile_rejected", user = id);
            self.notify(NotificationLevel::Error, "cannot delete active profile");
            return Err(err);
        }
        info!(event = "sync.session.delete_profile_started", user = id);

        self.apply(
            "delete_profile",
            "Failed to delete profile",
            self.api.delete_profile(id),
        )
        .await?;

        let profiles = {
            let mut state = self.state();
            state
                .known_profiles
                .retain(|p| !same_id(&p.id, id));
            profile_ids(&state.known_profiles)
        };
        self.render();
        self.emit(SessionEvent::ProfilesChanged { profiles });
        self.poller.suppress_for(self.options.suppression_window);

        self.reconcile().await;
        self.notify(NotificationLevel::Success, format!("Deleted profile {}", id));
        info!(event = "sync.session.delete_profile_completed", user = id);
        Ok(())
    }

    /// Rename a profile on the device.
    ///
    /// The device only renames the profile file, so when the renamed profile
    /// is the current or default user the panel reloads it under the new id
    /// and rewrites the `.env` entry. Those follow-ups only warn on failure.
    pub async fn rename_profile(&self, old_name: &str, new_name: &str) -> Result<(), SessionError> {
        let (old_name, new_name) = (old_name.trim(), new_name.trim());
        if old_name.is_empty() || new_name.is_empty() {
            return Err(SessionError::InvalidInput {
                message: "both the old and the new profile name are required".to_string(),
            });
        }
        if same_id(old_name, new_name) {
            return Err(SessionError::InvalidInput {
                message: "new profile name must differ from the old one".to_string(),
            });
        }
        if is_guest_name(new_name) {
            return Err(SessionError::InvalidInput {
                message: format!("{} is reserved for guest mode", new_name),
            });
        }
        info!(
            event = "sync.session.rename_profile_started",
            user = old_name,
            new_name = new_name
        );

        self.apply(
            "rename_profile",
            "Failed to rename profile",
            self.api.rename_profile(old_name, new_name),
        )
        .await?;

        let (was_current, was_default, profiles) = {
            let mut state = self.state();
            for profile in state
                .known_profiles
                .iter_mut()
                .filter(|p| same_id(&p.id, old_name))
            {
                profile.id = new_name.to_string();
            }
            let was_current = state.current_user.is(old_name);
            if was_current {
                state.current_user = UserRef::IdOnly {
                    id: new_name.to_string(),
                };
            }
            let was_default = state
                .default_user
                .as_deref()
                .is_some_and(|id| same_id(id, old_name));
            if was_default {
                state.default_user = Some(new_name.to_string());
            }
            (was_current, was_default, profile_ids(&state.known_profiles))
        };

        if was_current {
            self.follow_up(
                "reload_renamed_user",
                "Renamed profile, but the device still has the old name loaded",
                self.api.set_current_user(new_name),
            )
            .await;
            if self.options.persist_current_user {
                self.follow_up(
                    "persist_current_user",
                    "Renamed profile, but the device will not remember it after reboot",
                    self.api
                        .save_settings(&SaveSettingsRequest::current_user(new_name)),
                )
                .await;
            }
        }
        if was_default {
            self.follow_up(
                "persist_default_user",
                "Renamed profile, but the default user still names the old profile",
                self.api
                    .save_settings(&SaveSettingsRequest::default_user(new_name)),
            )
            .await;
        }

        self.render();
        self.emit(SessionEvent::ProfilesChanged { profiles });
        if was_current {
            self.emit(SessionEvent::UserChanged {
                user: UserRef::IdOnly {
                    id: new_name.to_string(),
                },
            });
        }
        if was_default {
            self.emit(SessionEvent::DefaultUserChanged {
                default_user: Some(new_name.to_string()),
            });
        }
        self.poller.suppress_for(self.options.suppression_window);

        self.reconcile().await;
        self.notify(
            NotificationLevel::Success,
            format!("Renamed profile {} to {}", old_name, new_name),
        );
        info!(
            event = "sync.session.rename_profile_completed",
            user = old_name,
            new_name = new_name
        );
        Ok(())
    }

    /// Start, stop or restart the assistant service.
    ///
    /// The poller is not suppressed: service state is external truth.
    pub async fn control_service(&self, action: ServiceAction) -> Result<(), SessionError> {
        info!(event = "sync.session.service_control_started", action = %action);

        self.apply(
            "control_service",
            "Failed to control service",
            self.api.control_service(action),
        )
        .await?;

        self.notify(
            NotificationLevel::Success,
            format!("Service {} requested", action),
        );
        info!(event = "sync.session.service_control_completed", action = %action);
        Ok(())
    }

    /// Reload config and status through the shared reloader and re-derive the view.
    pub async fn refresh(&self, force: bool) -> Result<ReloadOutcome, SessionError> {
        let outcome = self.reloader.request(force, || self.reload_all(force)).await;
        match outcome {
            ReloadOutcome::Skipped => Ok(ReloadOutcome::Skipped),
            ReloadOutcome::Executed(Ok(())) => Ok(ReloadOutcome::Executed(())),
            ReloadOutcome::Executed(Err(e)) => Err(SessionError::api("refresh", e)),
        }
    }

    /// React to a change observed by the poller.
    pub async fn handle_status_change(&self, change: StatusChange) {
        debug!(event = "sync.session.status_change_received", field = ?change.field());
        match change {
            StatusChange::CurrentUser { current, .. } => {
                let changed = {
                    let mut state = self.state();
                    let changed = !state.current_user.same_user(&current);
                    if changed {
                        state.current_user = current.clone();
                    }
                    changed
                };
                if changed {
                    self.render();
                    self.emit(SessionEvent::UserChanged { user: current });
                }
                self.refresh_quietly().await;
            }
            StatusChange::CurrentPersona { current, .. } => {
                let changed = {
                    let mut state = self.state();
                    let changed = state.current_persona != current;
                    state.current_persona = current.clone();
                    changed
                };
                if changed {
                    self.render();
                    self.emit(SessionEvent::PersonaChanged { persona: current });
                }
            }
            StatusChange::ProfileList { .. }
            | StatusChange::PersonaList { .. }
            | StatusChange::ConfigVersion { .. }
            | StatusChange::MemoryCount { .. } => self.refresh_quietly().await,
            StatusChange::ServiceState { .. } => self.render(),
            StatusChange::CurrentPersonality { .. } => {}
        }
    }

    /// Forward poller changes into [`handle_status_change`](Self::handle_status_change)
    /// until `cancel` fires.
    ///
    /// Subscribes before returning, so no change published after this call is missed.
    pub fn spawn_change_listener(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let mut changes = self.poller.subscribe();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let change = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    received = changes.recv() => received,
                };
                match change {
                    Ok(change) => controller.handle_status_change(change).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(event = "sync.session.changes_lagged", skipped = skipped);
                        controller.refresh_quietly().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!(event = "sync.session.listener_exited");
        })
    }

    async fn refresh_quietly(&self) {
        if let Err(e) = self.refresh(false).await {
            warn!(event = "sync.session.refresh_failed", error = %e);
        }
    }

    async fn reload_all(&self, force: bool) -> Result<(), ApiError> {
        let epoch = self.mutation_epoch();
        let (config, status) =
            tokio::join!(self.config_cache.get(true), self.status_cache.get(force));

        if let Some(error) = config.error() {
            let error = error.clone();
            self.render();
            return Err(error);
        }
        let live_persona = status
            .is_ok()
            .then(|| status.snapshot().current_persona.clone())
            .flatten();
        self.reconcile_with(epoch, config.snapshot(), live_persona);
        Ok(())
    }

    /// Force-reload config and adopt the device's view of the session.
    async fn reconcile(&self) {
        let epoch = self.mutation_epoch();
        let (config, status) =
            tokio::join!(self.config_cache.get(true), self.status_cache.get(false));
        if let Some(error) = config.error() {
            warn!(event = "sync.session.reconcile_failed", error = %error);
            self.render();
            return;
        }
        let live_persona = status
            .is_ok()
            .then(|| status.snapshot().current_persona.clone())
            .flatten();
        self.reconcile_with(epoch, config.snapshot(), live_persona);
    }

    /// Adopt `config` unless a mutation landed after `epoch` was read.
    ///
    /// The user's preferred persona wins; without one the device's live
    /// persona is used.
    fn reconcile_with(&self, epoch: u64, config: &ConfigSnapshot, live_persona: Option<String>) {
        let mut events = Vec::new();
        {
            let mut state = self.state();
            if state.mutation_epoch != epoch {
                debug!(
                    event = "sync.session.reconcile_superseded",
                    started = epoch,
                    current = state.mutation_epoch
                );
                drop(state);
                self.render();
                return;
            }

            if !state.current_user.same_user(&config.current_user) {
                events.push(SessionEvent::UserChanged {
                    user: config.current_user.clone(),
                });
            }
            state.current_user = config.current_user.clone();

            if state.known_profiles != config.available_profiles {
                state.known_profiles = config.available_profiles.clone();
                events.push(SessionEvent::ProfilesChanged {
                    profiles: profile_ids(&state.known_profiles),
                });
            }

            let preferred = config
                .current_user
                .id()
                .and_then(|id| {
                    config
                        .current_user
                        .profile()
                        .or_else(|| config.profile(id))
                })
                .and_then(|profile| profile.preferred_persona.clone());
            let persona = preferred.or(live_persona);
            if persona.is_some() && state.current_persona != persona {
                state.current_persona = persona.clone();
                events.push(SessionEvent::PersonaChanged { persona });
            }

            if state.default_user != config.default_user {
                state.default_user = config.default_user.clone();
                events.push(SessionEvent::DefaultUserChanged {
                    default_user: config.default_user.clone(),
                });
            }
        }

        self.render();
        for event in events {
            self.emit(event);
        }
    }

    /// Run one remote mutation. On failure nothing local changes and an
    /// error notification carries the device's message.
    async fn apply<F>(
        &self,
        operation: &'static str,
        fallback: &str,
        call: F,
    ) -> Result<(), SessionError>
    where
        F: std::future::Future<Output = Result<(), ApiError>>,
    {
        match call.await {
            Ok(()) => {
                self.mark_mutated();
                Ok(())
            }
            Err(e) => {
                if e.is_transient() {
                    error!(event = "sync.session.mutation_failed", operation = operation, error = %e);
                } else {
                    warn!(event = "sync.session.mutation_rejected", operation = operation, error = %e);
                }
                self.notify(NotificationLevel::Error, e.user_message(fallback));
                Err(SessionError::api(operation, e))
            }
        }
    }

    /// Run a secondary call of a mutation that already succeeded. Failure
    /// is reported as a warning and does not abort the mutation.
    async fn follow_up<F>(&self, operation: &'static str, warning: &str, call: F)
    where
        F: std::future::Future<Output = Result<(), ApiError>>,
    {
        if let Err(e) = call.await {
            warn!(event = "sync.session.follow_up_failed", operation = operation, error = %e);
            self.notify(NotificationLevel::Warning, e.user_message(warning));
        }
    }

    /// Record a mutation: reloads already in flight are stale from here on.
    fn mark_mutated(&self) {
        self.state().mutation_epoch += 1;
        self.config_cache.invalidate();
        self.status_cache.invalidate();
    }

    fn mutation_epoch(&self) -> u64 {
        self.state().mutation_epoch
    }

    fn require_user(&self, operation: &'static str) -> Result<String, SessionError> {
        match self.state().current_user.id() {
            Some(id) => Ok(id.to_string()),
            None => {
                self.notify(NotificationLevel::Error, "Select a user first");
                Err(SessionError::NoCurrentUser { operation })
            }
        }
    }

    fn set_current_user(&self, user: UserRef) {
        self.state().current_user = user;
        self.render();
    }

    fn render(&self) {
        let config = self.config_cache.peek();
        let status = self.status_cache.peek();
        let mut state = self.state();
        let view = PanelView::derive(&ViewInputs {
            current_user: &state.current_user,
            current_persona: state.current_persona.as_deref(),
            default_user: state.default_user.as_deref(),
            config: config.as_deref().map(|snapshot| snapshot.value()),
            status: status.as_deref().map(|snapshot| snapshot.value()),
        });
        state.view = view;
    }

    fn emit(&self, event: SessionEvent) {
        debug!(event = "sync.session.event_emitted", kind = ?event);
        // No subscribers is fine: nobody is rendering.
        let _ = self.events.send(event);
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let notification = Notification::new(level, message);
        debug!(
            event = "sync.session.notification_emitted",
            level = ?notification.level,
            message = %notification.message
        );
        let _ = self.notifications.send(notification);
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        lock_or_recover(&self.state, "session_state")
    }
}

fn profile_ids(profiles: &[UserProfile]) -> Vec<String> {
    profiles.iter().map(|p| p.id.clone()).collect()
}
