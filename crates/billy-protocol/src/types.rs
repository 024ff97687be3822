use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Personality trait name to level (0-100), as the device reports it.
pub type Personality = BTreeMap<String, i64>;

/// Run state of the assistant service as reported by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    #[default]
    Inactive,
    Active,
    Failed,
    Starting,
    Stopping,
    Restarting,
}

impl ServiceState {
    /// Map a `systemctl is-active` word onto a service state.
    ///
    /// Returns `None` for words the panel does not know about.
    pub fn from_systemd(word: &str) -> Option<Self> {
        match word.trim().to_ascii_lowercase().as_str() {
            "inactive" => Some(ServiceState::Inactive),
            "active" => Some(ServiceState::Active),
            "failed" => Some(ServiceState::Failed),
            "starting" | "activating" => Some(ServiceState::Starting),
            "stopping" | "deactivating" => Some(ServiceState::Stopping),
            "restarting" | "reloading" => Some(ServiceState::Restarting),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ServiceState::Active)
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceState::Inactive => write!(f, "inactive"),
            ServiceState::Active => write!(f, "active"),
            ServiceState::Failed => write!(f, "failed"),
            ServiceState::Starting => write!(f, "starting"),
            ServiceState::Stopping => write!(f, "stopping"),
            ServiceState::Restarting => write!(f, "restarting"),
        }
    }
}

/// One persisted memory record of a user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// ISO-8601 timestamp; also the key used to delete the record.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A user profile known to the device.
///
/// Listings only carry `id` and `display_name`; the remaining fields are
/// filled in when the profile is the fully loaded current user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_persona: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memories: Vec<MemoryRecord>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Display name, falling back to the profile id.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.id)
    }
}

/// A persona the device can load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Normalized reference to the device's current user.
///
/// The device reports the current user as nothing, a bare name, or a full
/// profile record depending on how far the profile has been loaded. Every
/// shape is folded into this enum before anything compares or renders it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserRef {
    /// Guest mode.
    #[default]
    None,
    IdOnly {
        id: String,
    },
    Full {
        profile: UserProfile,
    },
}

impl UserRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            UserRef::None => None,
            UserRef::IdOnly { id } => Some(id),
            UserRef::Full { profile } => Some(&profile.id),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, UserRef::None)
    }

    /// Whether the full profile record is available.
    pub fn is_loaded(&self) -> bool {
        matches!(self, UserRef::Full { .. })
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            UserRef::Full { profile } => Some(profile),
            _ => None,
        }
    }

    /// Identity comparison: same user regardless of how much is loaded.
    pub fn same_user(&self, other: &UserRef) -> bool {
        match (self.id(), other.id()) {
            (None, None) => true,
            (Some(a), Some(b)) => same_id(a, b),
            _ => false,
        }
    }

    /// Whether this reference points at the given profile id.
    pub fn is(&self, id: &str) -> bool {
        self.id().is_some_and(|own| same_id(own, id))
    }
}

/// Profile ids are case-insensitive: files are lowercase on the device while
/// listings title-case them.
pub fn same_id(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
