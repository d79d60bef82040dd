//! Configuration Loader
//!
//! Loads and merges configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{LintSection, ProjectConfig};
use crate::{ConfigError, ConfigResult, PROJECT_FILE};
use std::env;
use std::path::{Path, PathBuf};

/// Base module used when nothing configures one
pub const DEFAULT_BASE_MODULE: &str = "java.base";

/// Configuration loader
///
/// Precedence, lowest first:
/// 1. Global config (~/.strata/config.toml)
/// 2. Project config (./strata.toml)
/// 3. Environment variables (STRATA_WERROR, STRATA_BASE_MODULE)
/// 4. CLI flags (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,

    pub global: GlobalConfig,

    /// Directory where strata.toml was found
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use a specific global config file instead of ~/.strata/config.toml
    pub fn with_global_config_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find strata.toml.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        let global_config = self.load_global_config().unwrap_or_default();
        let project_config = apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = self.load_global_config().unwrap_or_default();
        let project_config = apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root: config_path.parent().map(|p| p.to_path_buf()),
        })
    }

    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_FILE);
            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = GlobalConfig::global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        // Global config is optional
        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_env_bool(var: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvValue {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Apply STRATA_* environment overrides to the project config
fn apply_env_overrides(mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
    if let Ok(werror) = env::var("STRATA_WERROR") {
        let werror = parse_env_bool("STRATA_WERROR", &werror)?;
        config.compilation_mut().werror = Some(werror);
    }

    if let Ok(base) = env::var("STRATA_BASE_MODULE") {
        if base.trim().is_empty() {
            return Err(ConfigError::InvalidEnvValue {
                var: "STRATA_BASE_MODULE".to_string(),
                value: base,
            });
        }
        config.compilation_mut().base_module = Some(base);
    }

    Ok(config)
}

impl Config {
    /// Effective werror switch (project > global > false)
    pub fn werror(&self) -> bool {
        self.project
            .werror()
            .or_else(|| self.global.default_werror())
            .unwrap_or(false)
    }

    /// Effective base module (project > global > java.base)
    pub fn base_module(&self) -> &str {
        self.project
            .base_module()
            .or_else(|| self.global.default_base_module())
            .unwrap_or(DEFAULT_BASE_MODULE)
    }

    /// Lint switches, global first then project
    pub fn lint(&self) -> LintSection {
        let mut lint = self.global.lint.clone().unwrap_or_default();
        if let Some(project) = &self.project.lint {
            lint.merge(project);
        }
        lint
    }

    /// Diagnostic output format, "human" unless configured
    pub fn output_format(&self) -> &str {
        self.global.output_format().unwrap_or("human")
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project.project_name()
    }

    /// Whether a strata.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}
