use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::PersonaInfo;

/// `.env` key holding the profile auto-selected on boot.
pub const DEFAULT_USER_KEY: &str = "DEFAULT_USER";

/// `.env` key holding the profile the device resumes with.
pub const CURRENT_USER_KEY: &str = "CURRENT_USER";

/// Response of `GET /service/status`, before normalization.
///
/// The device falls back to `{status, error}` when profile loading fails, so
/// every field other than `status` is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStatus {
    #[serde(default)]
    pub status: String,
    /// Value of `CURRENT_USER` in the device's `.env`.
    #[serde(default)]
    pub current_user: Value,
    /// Name of the profile actually loaded by the running service.
    #[serde(default)]
    pub current_user_loaded: Value,
    #[serde(default)]
    pub current_persona: Option<String>,
    #[serde(default)]
    pub current_personality: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub available_profiles: Vec<String>,
    #[serde(default)]
    pub available_personas: Vec<PersonaInfo>,
    #[serde(default)]
    pub memory_count: u64,
    #[serde(default)]
    pub config_hash: Option<String>,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `GET /current-user`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentUserEnvelope {
    #[serde(default)]
    pub user: Value,
}

/// One entry of `GET /profiles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Response of `GET /profiles`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileList {
    #[serde(default)]
    pub profiles: Vec<ProfileEntry>,
}

/// Response of `GET /personas`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaList {
    #[serde(default)]
    pub personas: Vec<PersonaInfo>,
}

/// Response of `GET /config`: flat `.env` key/value map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvConfig(pub BTreeMap<String, Value>);

impl EnvConfig {
    /// The configured boot-time default user, `None` for guest or unset.
    pub fn default_user(&self) -> Option<String> {
        self.0
            .get(DEFAULT_USER_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !crate::normalize::is_guest_name(name))
            .map(str::to_string)
    }
}

/// Body of `POST /current-user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCurrentUserRequest {
    pub name: String,
}

/// Body of `PATCH /current-user`, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProfileAction {
    SwitchPersona { preferred_persona: String },
}

/// Body of `POST /profiles/update-display-name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDisplayNameRequest {
    pub user: String,
    pub display_name: String,
}

/// Body of `POST /profiles/rename`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameProfileRequest {
    #[serde(rename = "oldName")]
    pub old_name: String,
    #[serde(rename = "newName")]
    pub new_name: String,
}

/// Body of `POST /profiles/delete-memory`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteMemoryRequest {
    pub user: String,
    #[serde(rename = "memoryDate")]
    pub memory_date: String,
}

/// Partial key/value body of `POST /save`, merged into the device `.env`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaveSettingsRequest(pub BTreeMap<String, String>);

impl SaveSettingsRequest {
    pub fn single(key: &str, value: impl Into<String>) -> Self {
        let mut values = BTreeMap::new();
        values.insert(key.to_string(), value.into());
        Self(values)
    }

    pub fn default_user(id: &str) -> Self {
        Self::single(DEFAULT_USER_KEY, id)
    }

    pub fn current_user(id: &str) -> Self {
        Self::single(CURRENT_USER_KEY, id)
    }
}

/// Lifecycle actions of `GET /service/<action>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        }
    }
}

impl std::fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(ServiceAction::Start),
            "stop" => Ok(ServiceAction::Stop),
            "restart" => Ok(ServiceAction::Restart),
            other => Err(format!(
                "invalid service action '{}': expected start, stop or restart",
                other
            )),
        }
    }
}

/// Generic response envelope of mutation routes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
