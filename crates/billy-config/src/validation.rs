//! Configuration validation logic.

use crate::errors::ConfigError;
use crate::types::PanelConfig;

/// Validate a PanelConfig, returning an error if any values are invalid.
///
/// # Validation Rules
///
/// - `device.base_url`, if set, must be an `http://` or `https://` URL
/// - Every configured duration must be greater than zero
pub fn validate_config(config: &PanelConfig) -> Result<(), ConfigError> {
    if let Some(ref url) = config.device.base_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "Invalid device base_url '{}'. Expected an http:// or https:// URL",
                url
            ),
        });
    }

    let durations = [
        ("device.request_timeout_ms", config.device.request_timeout_ms),
        ("sync.config_ttl_ms", config.sync.config_ttl_ms),
        ("sync.status_ttl_ms", config.sync.status_ttl_ms),
        ("sync.poll_interval_ms", config.sync.poll_interval_ms),
        ("sync.debounce_window_ms", config.sync.debounce_window_ms),
        ("sync.suppression_window_ms", config.sync.suppression_window_ms),
    ];
    for (name, value) in durations {
        if value == Some(0) {
            return Err(ConfigError::InvalidConfiguration {
                message: format!("{} must be > 0", name),
            });
        }
    }

    Ok(())
}
