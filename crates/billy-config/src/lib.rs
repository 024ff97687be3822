//! # billy-config
//!
//! TOML configuration types, loading, and validation for the Billy panel.

mod loading;
mod paths;
mod validation;

pub mod errors;
pub mod types;

pub use errors::ConfigError;
pub use loading::{DEVICE_URL_ENV, load_config_file, load_hierarchy, load_hierarchy_from, merge_configs};
pub use paths::BillyPaths;
pub use types::{DeviceConfig, PanelConfig, SessionConfig, SyncConfig};
pub use validation::validate_config;

impl PanelConfig {
    /// Load configuration from the hierarchy of config files.
    ///
    /// See [`loading::load_hierarchy`] for details.
    pub fn load_hierarchy() -> Result<Self, ConfigError> {
        loading::load_hierarchy()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate_config(self)
    }
}
