//! Configuration for strata projects
//!
//! - `strata.toml`: modules, automatic archives, class-path packages, module
//!   options, lint switches and reference sites
//! - `~/.strata/config.toml`: per-user defaults and output settings
//!
//! # Precedence
//!
//! Later sources win:
//! 1. Global config (~/.strata/config.toml)
//! 2. Project config (strata.toml, found by walking up from the start directory)
//! 3. Environment variables (STRATA_WERROR, STRATA_BASE_MODULE)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use strata_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new("."))?;
//! println!("werror = {}", config.werror());
//! # Ok::<(), strata_config::ConfigError>(())
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// File name of the project configuration
pub const PROJECT_FILE: &str = "strata.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid value for environment variable {var}: '{value}'")]
    InvalidEnvValue { var: String, value: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader, DEFAULT_BASE_MODULE};
pub use project::{
    AutomaticConfig, ClassPathConfig, CompilationConfig, GrantConfig, LintSection, ModuleConfig,
    ModuleKindConfig, OptionsConfig, ProjectConfig, ProjectInfo, ProvidesConfig, ReferenceConfig,
    ReferenceKind, RequiresConfig,
};
