//! Configuration loading and merging logic.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.billy/panel.toml`
//! 3. **Project config** - `./.billy/panel.toml`
//! 4. **Environment** - `BILLY_DEVICE_URL`
//! 5. **CLI arguments** - `--device` (applied by the caller)

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::errors::ConfigError;
use crate::paths::BillyPaths;
use crate::types::{DeviceConfig, PanelConfig, SessionConfig, SyncConfig};
use crate::validation::validate_config;

/// Environment variable overriding `device.base_url`.
pub const DEVICE_URL_ENV: &str = "BILLY_DEVICE_URL";

/// Load configuration from the hierarchy of config files.
///
/// # Errors
///
/// Returns an error if a present file fails to parse or the merged result
/// fails validation. Missing config files are not errors.
pub fn load_hierarchy() -> Result<PanelConfig, ConfigError> {
    let paths = BillyPaths::resolve()?;
    let project_root = std::env::current_dir()?;
    load_hierarchy_from(&paths, &project_root)
}

/// Load the hierarchy against explicit locations.
pub fn load_hierarchy_from(
    paths: &BillyPaths,
    project_root: &Path,
) -> Result<PanelConfig, ConfigError> {
    let mut config = PanelConfig::default();

    if let Some(user_config) = load_optional(&paths.user_config())? {
        config = merge_configs(config, user_config);
    }

    if let Some(project_config) = load_optional(&BillyPaths::project_config(project_root))? {
        config = merge_configs(config, project_config);
    }

    apply_env_overrides(&mut config);

    validate_config(&config)?;

    Ok(config)
}

/// Load a file if it exists. A missing file yields `None`.
fn load_optional(path: &Path) -> Result<Option<PanelConfig>, ConfigError> {
    match load_config_file(path) {
        Ok(config) => {
            debug!(event = "config.file_loaded", path = %path.display());
            Ok(Some(config))
        }
        Err(ConfigError::IoError { source }) if source.kind() == std::io::ErrorKind::NotFound => {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Load a configuration file from the given path.
pub fn load_config_file(path: &Path) -> Result<PanelConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ConfigParseError {
        message: format!("'{}': {}", path.display(), e),
    })
}

fn apply_env_overrides(config: &mut PanelConfig) {
    match std::env::var(DEVICE_URL_ENV) {
        Ok(url) if !url.trim().is_empty() => {
            debug!(event = "config.env_override", key = DEVICE_URL_ENV, value = %url);
            config.device.base_url = Some(url.trim().to_string());
        }
        Ok(_) => warn!(
            event = "config.env_override_ignored",
            key = DEVICE_URL_ENV,
            reason = "empty"
        ),
        Err(_) => {}
    }
}

/// Merge two configurations, with override_config taking precedence.
///
/// Override values replace base values only if present.
pub fn merge_configs(base: PanelConfig, override_config: PanelConfig) -> PanelConfig {
    PanelConfig {
        device: DeviceConfig::merge(&base.device, &override_config.device),
        sync: SyncConfig::merge(&base.sync, &override_config.sync),
        session: SessionConfig::merge(&base.session, &override_config.session),
    }
}
