//! Render-ready state derived from the session and the latest snapshots.

use billy_protocol::{MemoryRecord, ServiceState, UserRef, same_id};
use serde::Serialize;

use crate::snapshot::{ConfigSnapshot, StatusSnapshot};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityView {
    /// `None` in guest mode.
    pub user_id: Option<String>,
    pub label: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRow {
    pub id: String,
    pub label: String,
    pub is_current: bool,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonaSelector {
    pub options: Vec<String>,
    pub selected: Option<String>,
}

/// Everything a front-end renders, in dependency order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub identity: IdentityView,
    pub profiles: Vec<ProfileRow>,
    pub personas: PersonaSelector,
    pub display_name: Option<String>,
    pub memories: Vec<MemoryRecord>,
    pub service_state: ServiceState,
    pub default_user: Option<String>,
}

pub(crate) struct ViewInputs<'a> {
    pub current_user: &'a UserRef,
    pub current_persona: Option<&'a str>,
    pub default_user: Option<&'a str>,
    pub config: Option<&'a ConfigSnapshot>,
    pub status: Option<&'a StatusSnapshot>,
}

impl PanelView {
    /// Derive regions in order: identity, profile list, persona selector,
    /// display name, memory list. Each step reads only the inputs and the
    /// regions before it.
    pub(crate) fn derive(inputs: &ViewInputs<'_>) -> Self {
        let is_default = |id: &str| inputs.default_user.is_some_and(|d| same_id(d, id));
        let listed = |id: &str| {
            inputs
                .config
                .and_then(|config| config.profile(id))
        };

        let identity = match inputs.current_user.id() {
            None => IdentityView {
                user_id: None,
                label: "Guest".to_string(),
                is_default: inputs.default_user.is_none(),
            },
            Some(id) => {
                let label = inputs
                    .current_user
                    .profile()
                    .or_else(|| listed(id))
                    .map(|profile| profile.label().to_string())
                    .unwrap_or_else(|| id.to_string());
                IdentityView {
                    user_id: Some(id.to_string()),
                    label,
                    is_default: is_default(id),
                }
            }
        };

        let profiles = inputs
            .config
            .map(|config| {
                config
                    .available_profiles
                    .iter()
                    .map(|profile| ProfileRow {
                        id: profile.id.clone(),
                        label: profile.label().to_string(),
                        is_current: identity
                            .user_id
                            .as_deref()
                            .is_some_and(|id| same_id(id, &profile.id)),
                        is_default: is_default(&profile.id),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let preferred = identity.user_id.as_deref().and_then(|id| {
            inputs
                .current_user
                .profile()
                .or_else(|| listed(id))
                .and_then(|profile| profile.preferred_persona.clone())
        });
        let personas = PersonaSelector {
            options: inputs
                .config
                .map(|config| {
                    config
                        .available_personas
                        .iter()
                        .map(|p| p.name.clone())
                        .collect()
                })
                .unwrap_or_default(),
            selected: inputs.current_persona.map(str::to_string).or(preferred),
        };

        let display_name = identity.user_id.as_deref().and_then(|id| {
            inputs
                .current_user
                .profile()
                .and_then(|profile| profile.display_name.clone())
                .or_else(|| listed(id).and_then(|profile| profile.display_name.clone()))
        });

        let memories = inputs
            .current_user
            .profile()
            .map(|profile| profile.memories.clone())
            .unwrap_or_default();

        PanelView {
            identity,
            profiles,
            personas,
            display_name,
            memories,
            service_state: inputs
                .status
                .map(|status| status.service_state)
                .unwrap_or_default(),
            default_user: inputs.default_user.map(str::to_string),
        }
    }
}
