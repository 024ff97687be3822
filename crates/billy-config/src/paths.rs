use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

/// Path construction for the `~/.billy/` directory layout.
///
/// Use `resolve()` in production code and `from_dir()` in tests.
#[derive(Debug, Clone)]
pub struct BillyPaths {
    billy_dir: PathBuf,
}

impl BillyPaths {
    /// Resolve paths from the user's home directory (`~/.billy`).
    pub fn resolve() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(Self {
            billy_dir: home.join(".billy"),
        })
    }

    /// Create paths from an explicit base directory. Use in tests.
    pub fn from_dir(billy_dir: PathBuf) -> Self {
        Self { billy_dir }
    }

    pub fn billy_dir(&self) -> &Path {
        &self.billy_dir
    }

    pub fn user_config(&self) -> PathBuf {
        self.billy_dir.join("panel.toml")
    }

    /// Project-level override at `<root>/.billy/panel.toml`.
    pub fn project_config(project_root: &Path) -> PathBuf {
        project_root.join(".billy").join("panel.toml")
    }
}
