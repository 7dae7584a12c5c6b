use anyhow::{Context, Result};
use docshape_query::{CatalogOptions, RenderOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Default log level when neither a flag nor RUST_LOG is given
    pub log_level: String,
    /// Renderer selection and formatting
    pub render: RenderOptions,
    /// Catalog adjustments
    pub catalog: CatalogOptions,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            render: RenderOptions::default(),
            catalog: CatalogOptions::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from an explicit path or the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        match config_file {
            Some(path) => Self::from_file(&path),
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// `<config dir>/docshape/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docshape").join("config.toml"))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn display_as_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
