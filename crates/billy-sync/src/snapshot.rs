//! Immutable point-in-time views of device state.
//!
//! Raw device payloads are normalized here; nothing downstream sees the
//! loosely typed wire shapes.

use std::ops::Deref;
use std::time::Duration;

use billy_protocol::{
    EnvConfig, PersonaInfo, Personality, ProfileEntry, RawStatus, ServiceState, UserProfile,
    UserRef, normalize_current_user,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::time::Instant;
use tracing::warn;

/// A value captured from the device at a known instant.
///
/// Shared as `Arc<Snapshot<T>>`; holders only ever get shared references.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    value: T,
    captured_at: Instant,
    fetched_at: DateTime<Utc>,
}

impl<T> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            captured_at: Instant::now(),
            fetched_at: Utc::now(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Wall-clock time of the fetch, for display.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Profile, persona and default-user configuration of the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub current_user: UserRef,
    pub available_profiles: Vec<UserProfile>,
    pub available_personas: Vec<PersonaInfo>,
    /// Boot-time default user; `None` means guest.
    pub default_user: Option<String>,
}

impl ConfigSnapshot {
    /// Assemble a snapshot from the four configuration endpoints.
    ///
    /// A fully loaded current user contributes its preferred persona to the
    /// matching profile entry.
    pub fn from_parts(
        env: &EnvConfig,
        current_user: &Value,
        profiles: Vec<ProfileEntry>,
        personas: Vec<PersonaInfo>,
    ) -> Self {
        let current_user = user_or_guest(current_user, "current_user");

        let available_profiles = profiles
            .into_iter()
            .map(|entry| {
                let mut profile = UserProfile::new(entry.name);
                profile.display_name = entry.display_name.filter(|name| !name.trim().is_empty());
                if let Some(loaded) = current_user.profile()
                    && current_user.is(&profile.id)
                {
                    profile.preferred_persona = loaded.preferred_persona.clone();
                    if profile.display_name.is_none() {
                        profile.display_name = loaded.display_name.clone();
                    }
                }
                profile
            })
            .collect();

        Self {
            current_user,
            available_profiles,
            available_personas: personas,
            default_user: env.default_user(),
        }
    }

    pub fn profile(&self, id: &str) -> Option<&UserProfile> {
        self.available_profiles
            .iter()
            .find(|profile| billy_protocol::same_id(&profile.id, id))
    }

    pub fn has_persona(&self, name: &str) -> bool {
        self.available_personas.iter().any(|p| p.name == name)
    }
}

/// Runtime status of the assistant service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub service_state: ServiceState,
    pub current_user: UserRef,
    pub current_persona: Option<String>,
    pub current_personality: Option<Personality>,
    pub available_profiles: Vec<String>,
    pub available_personas: Vec<String>,
    pub config_version: Option<String>,
    pub memory_count: u64,
}

impl StatusSnapshot {
    pub fn from_raw(raw: RawStatus) -> Self {
        let service_state = ServiceState::from_systemd(&raw.status).unwrap_or_else(|| {
            warn!(
                event = "sync.snapshot.unknown_service_state",
                status = %raw.status
            );
            ServiceState::Inactive
        });

        if let Some(ref error) = raw.error {
            warn!(event = "sync.snapshot.status_degraded", error = %error);
        }

        // The loaded profile wins; the .env value is only what will load next.
        let user_value = if raw.current_user_loaded.is_null() {
            &raw.current_user
        } else {
            &raw.current_user_loaded
        };
        let current_user = user_or_guest(user_value, "status.current_user");

        Self {
            service_state,
            current_user,
            current_persona: raw
                .current_persona
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            current_personality: raw.current_personality.map(personality_levels),
            available_profiles: raw.available_profiles,
            available_personas: raw.available_personas.into_iter().map(|p| p.name).collect(),
            config_version: raw.config_hash,
            memory_count: raw.memory_count,
        }
    }
}

fn user_or_guest(raw: &Value, source: &'static str) -> UserRef {
    normalize_current_user(raw).unwrap_or_else(|e| {
        warn!(
            event = "sync.normalize.current_user_invalid",
            source = source,
            error = %e
        );
        UserRef::None
    })
}

/// Levels arrive as integers, floats or numeric strings.
fn personality_levels(raw: std::collections::BTreeMap<String, Value>) -> Personality {
    raw.into_iter()
        .filter_map(|(trait_name, value)| {
            let level = match &value {
                Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
                Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
                _ => None,
            }?;
            Some((trait_name, level))
        })
        .collect()
}
