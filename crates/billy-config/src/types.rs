use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Device address used when nothing else is configured (mDNS hostname).
pub const DEFAULT_BASE_URL: &str = "http://billy.local";

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Staleness budget for the config snapshot.
pub const DEFAULT_CONFIG_TTL_MS: u64 = 2_000;

/// Staleness budget for the status snapshot.
pub const DEFAULT_STATUS_TTL_MS: u64 = 2_000;

/// Background status poll period.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;

/// Window in which repeated non-forced reload requests are dropped.
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 100;

/// How long the poller stays quiet after a panel-initiated mutation.
/// Matches the poll interval so the next tick cannot echo the change back.
pub const DEFAULT_SUPPRESSION_WINDOW_MS: u64 = 3_000;

/// Top-level panel configuration (`panel.toml`).
///
/// Every field is optional so that user and project files can override each
/// other field by field; accessors apply the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// `[device]` section: where the device lives and how long to wait for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl DeviceConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.request_timeout_ms
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }

    pub fn merge(base: &Self, override_config: &Self) -> Self {
        Self {
            base_url: override_config
                .base_url
                .clone()
                .or_else(|| base.base_url.clone()),
            request_timeout_ms: override_config
                .request_timeout_ms
                .or(base.request_timeout_ms),
        }
    }
}

/// `[sync]` section: cache, poll, and debounce timing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub config_ttl_ms: Option<u64>,
    #[serde(default)]
    pub status_ttl_ms: Option<u64>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub debounce_window_ms: Option<u64>,
    #[serde(default)]
    pub suppression_window_ms: Option<u64>,
}

impl SyncConfig {
    pub fn config_ttl(&self) -> Duration {
        Duration::from_millis(self.config_ttl_ms.unwrap_or(DEFAULT_CONFIG_TTL_MS))
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_millis(self.status_ttl_ms.unwrap_or(DEFAULT_STATUS_TTL_MS))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(
            self.debounce_window_ms
                .unwrap_or(DEFAULT_DEBOUNCE_WINDOW_MS),
        )
    }

    pub fn suppression_window(&self) -> Duration {
        Duration::from_millis(
            self.suppression_window_ms
                .unwrap_or(DEFAULT_SUPPRESSION_WINDOW_MS),
        )
    }

    pub fn merge(base: &Self, override_config: &Self) -> Self {
        Self {
            config_ttl_ms: override_config.config_ttl_ms.or(base.config_ttl_ms),
            status_ttl_ms: override_config.status_ttl_ms.or(base.status_ttl_ms),
            poll_interval_ms: override_config.poll_interval_ms.or(base.poll_interval_ms),
            debounce_window_ms: override_config
                .debounce_window_ms
                .or(base.debounce_window_ms),
            suppression_window_ms: override_config
                .suppression_window_ms
                .or(base.suppression_window_ms),
        }
    }
}

/// `[session]` section: side effects of user and persona switches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Also write `CURRENT_USER` so the device resumes with the switched user.
    #[serde(default)]
    pub persist_current_user: Option<bool>,
    /// Restart a running service after a persona switch so it takes effect.
    #[serde(default)]
    pub restart_on_persona_switch: Option<bool>,
}

impl SessionConfig {
    pub fn persist_current_user(&self) -> bool {
        self.persist_current_user.unwrap_or(true)
    }

    pub fn restart_on_persona_switch(&self) -> bool {
        self.restart_on_persona_switch.unwrap_or(true)
    }

    pub fn merge(base: &Self, override_config: &Self) -> Self {
        Self {
            persist_current_user: override_config
                .persist_current_user
                .or(base.persist_current_user),
            restart_on_persona_switch: override_config
                .restart_on_persona_switch
                .or(base.restart_on_persona_switch),
        }
    }
}
