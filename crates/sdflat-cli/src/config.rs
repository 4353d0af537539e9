//! Configuration loading

use anyhow::Result;
use sdflat_core::urdf::DEFAULT_PRECISION;
use sdflat_core::{LoadOptions, UrdfOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Local model repository that `model://` URIs resolve against
    #[serde(default = "default_models_path")]
    pub path: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            path: default_models_path(),
        }
    }
}

fn default_models_path() -> String {
    "~/.gazebo/models".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Skip malformed elements instead of aborting
    #[serde(default)]
    pub allow_partial: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Decimal places kept in origins
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Indentation width, 0 writes a single line
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            indent: default_indent(),
        }
    }
}

fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

fn default_indent() -> usize {
    2
}

impl Config {
    pub fn to_load_options(&self) -> LoadOptions {
        LoadOptions {
            model_path: sdflat_core::loader::expand_home(&self.models.path),
            allow_partial: self.conversion.allow_partial,
        }
    }

    pub fn to_urdf_options(&self) -> UrdfOptions {
        UrdfOptions {
            precision: self.output.precision,
            indent: self.output.indent,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}
