//! Global Configuration (~/.strata/config.toml)
//!
//! User-level defaults shared by every project.

use crate::project::LintSection;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.strata/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Lint switches applied before project switches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lint: Option<LintSection>,

    /// Diagnostic output preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub werror: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_module: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// "human" or "json"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(format) = self.output.as_ref().and_then(|o| o.format.as_ref()) {
            if !matches!(format.as_str(), "human" | "json") {
                return Err(ConfigError::InvalidValue {
                    field: "output.format".to_string(),
                    reason: format!("expected 'human' or 'json', got '{}'", format),
                });
            }
        }

        if let Some(base) = self.default_base_module() {
            if base.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "defaults.base-module".to_string(),
                    reason: "base module cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Path of the global configuration file
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".strata").join("config.toml"))
    }

    pub fn default_werror(&self) -> Option<bool> {
        self.defaults.as_ref().and_then(|d| d.werror)
    }

    pub fn default_base_module(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.base_module.as_deref())
    }

    pub fn output_format(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.format.as_deref())
    }

    pub fn color(&self) -> Option<bool> {
        self.output.as_ref().and_then(|o| o.color)
    }
}
