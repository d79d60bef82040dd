//! Project Configuration (strata.toml)
//!
//! Describes one compilation: the modules and archives it sees, the module
//! options passed to it, lint switches, and reference sites to check.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration from strata.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Project metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectInfo>,

    /// Compilation settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compilation: Option<CompilationConfig>,

    /// Raw module options, as they would appear on a command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OptionsConfig>,

    /// Lint switches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lint: Option<LintSection>,

    /// Explicit modules
    #[serde(default, rename = "module", skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleConfig>,

    /// Plain archives on the module path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub automatic: Vec<AutomaticConfig>,

    /// Class path contents (the unnamed module)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_path: Option<ClassPathConfig>,

    /// Reference sites checked by `strata check`
    #[serde(default, rename = "reference", skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectInfo {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Compilation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CompilationConfig {
    /// Compile in multi-module (module-source-path) mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_source_path: Option<bool>,

    /// Module every named module reads implicitly (default: java.base)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_module: Option<String>,

    /// Treat warnings as errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub werror: Option<bool>,

    /// Modules being compiled (default: every source module)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<Vec<String>>,
}

/// Raw module option values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct OptionsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_reads: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_exports: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_opens: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_modules: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limit_modules: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patch_module: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_module_for_created_files: Option<String>,
}

impl OptionsConfig {
    /// Append values from `other` (command-line values come after file values)
    pub fn extend(&mut self, other: &OptionsConfig) {
        self.add_reads.extend(other.add_reads.iter().cloned());
        self.add_exports.extend(other.add_exports.iter().cloned());
        self.add_opens.extend(other.add_opens.iter().cloned());
        self.add_modules.extend(other.add_modules.iter().cloned());
        self.limit_modules.extend(other.limit_modules.iter().cloned());
        self.patch_module.extend(other.patch_module.iter().cloned());
        if other.default_module_for_created_files.is_some() {
            self.default_module_for_created_files = other.default_module_for_created_files.clone();
        }
    }
}

/// Lint switches; unset switches keep their defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct LintSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_transitive_automatic: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_automatic: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports_to_unknown: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub opens_missing_package: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<bool>,
}

impl LintSection {
    /// Merge another section into this one
    /// Other section takes precedence for non-None values
    pub fn merge(&mut self, other: &LintSection) {
        fn take(slot: &mut Option<bool>, value: Option<bool>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.requires_transitive_automatic, other.requires_transitive_automatic);
        take(&mut self.requires_automatic, other.requires_automatic);
        take(&mut self.deprecation, other.deprecation);
        take(&mut self.module_name, other.module_name);
        take(&mut self.exports_to_unknown, other.exports_to_unknown);
        take(&mut self.opens_missing_package, other.opens_missing_package);
        take(&mut self.exports, other.exports);
    }
}

/// Where an explicit module comes from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleKindConfig {
    /// Compiled from source
    #[default]
    Source,
    /// Already compiled, found on the module path
    ModulePath,
    /// Part of the platform image
    System,
}

/// An explicit module declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ModuleConfig {
    pub name: String,

    #[serde(default)]
    pub kind: ModuleKindConfig,

    /// Source root or archive location (default: src/<name> or mods/<name>)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    #[serde(default)]
    pub open: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<RequiresConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<GrantConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opens: Vec<GrantConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<ProvidesConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
}

impl ModuleConfig {
    /// Source root or archive location, with the conventional default
    pub fn root(&self) -> PathBuf {
        match (&self.root, self.kind) {
            (Some(root), _) => root.clone(),
            (None, ModuleKindConfig::Source) => Path::new("src").join(&self.name),
            (None, ModuleKindConfig::ModulePath) => Path::new("mods").join(&self.name),
            (None, ModuleKindConfig::System) => PathBuf::from("<system>"),
        }
    }
}

/// A `requires` entry: either a bare module name or a table with modifiers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequiresConfig {
    Name(String),
    Detailed {
        module: String,
        #[serde(default)]
        transitive: bool,
        #[serde(default, rename = "static")]
        is_static: bool,
    },
}

impl RequiresConfig {
    pub fn module(&self) -> &str {
        match self {
            RequiresConfig::Name(module) => module,
            RequiresConfig::Detailed { module, .. } => module,
        }
    }

    pub fn is_transitive(&self) -> bool {
        matches!(self, RequiresConfig::Detailed { transitive: true, .. })
    }

    pub fn is_static(&self) -> bool {
        matches!(self, RequiresConfig::Detailed { is_static: true, .. })
    }
}

/// An `exports` or `opens` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GrantConfig {
    pub package: String,

    /// Qualified targets; absent for an unqualified directive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProvidesConfig {
    pub service: String,
    pub with: Vec<String>,
}

/// A plain archive that becomes an automatic module
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct AutomaticConfig {
    pub path: PathBuf,

    /// `Automatic-Module-Name` manifest attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ClassPathConfig {
    #[serde(default)]
    pub packages: Vec<String>,
}

/// What a reference site does with the package
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    /// Uses a public type (exports relation)
    #[default]
    Exports,
    /// Reflective access (opens relation)
    Opens,
    /// A public signature of `api-package` mentions the type
    Api,
}

/// A reference site for `strata check`
///
/// `from` and `module` accept `ALL-UNNAMED` for the unnamed module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ReferenceConfig {
    /// Referring module
    pub from: String,
    /// Module declaring the package
    pub module: String,
    pub package: String,

    #[serde(default)]
    pub kind: ReferenceKind,

    /// Exported package whose API mentions the type (for `kind = "api"`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_package: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default)]
    pub line: usize,

    #[serde(default)]
    pub column: usize,
}

impl ProjectConfig {
    /// Load project configuration from a file
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

    /// Validate the project configuration
    ///
    /// Only checks what the file format itself requires. Module names and
    /// option values are validated by the engine, which reports them as
    /// diagnostics.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(project) = &self.project {
            if project.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "project.name".to_string(),
                    reason: "name cannot be empty".to_string(),
                });
            }
        }

        if let Some(base) = self.compilation.as_ref().and_then(|c| c.base_module.as_ref()) {
            if base.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "compilation.base-module".to_string(),
                    reason: "base module cannot be empty".to_string(),
                });
            }
        }

        for (i, module) in self.modules.iter().enumerate() {
            if module.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("module[{}].name", i),
                    reason: "name cannot be empty".to_string(),
                });
            }
        }

        for (i, reference) in self.references.iter().enumerate() {
            if reference.kind == ReferenceKind::Api && reference.api_package.is_none() {
                return Err(ConfigError::InvalidValue {
                    field: format!("reference[{}].api-package", i),
                    reason: "required when kind = \"api\"".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the project name, if present
    pub fn project_name(&self) -> Option<&str> {
        self.project.as_ref().map(|p| p.name.as_str())
    }

    /// Whether module-source-path mode is on
    pub fn is_multi_module(&self) -> bool {
        self.compilation
            .as_ref()
            .and_then(|c| c.module_source_path)
            .unwrap_or(false)
    }

    /// Configured werror switch, if any
    pub fn werror(&self) -> Option<bool> {
        self.compilation.as_ref().and_then(|c| c.werror)
    }

    /// Configured base module, if any
    pub fn base_module(&self) -> Option<&str> {
        self.compilation
            .as_ref()
            .and_then(|c| c.base_module.as_deref())
    }

    /// Configured compilation roots, if any
    pub fn roots(&self) -> Option<&[String]> {
        self.compilation.as_ref().and_then(|c| c.roots.as_deref())
    }

    pub fn compilation_mut(&mut self) -> &mut CompilationConfig {
        self.compilation.get_or_insert_with(CompilationConfig::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_project_config() {
        let toml = r#"
[project]
name = "demo"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.project_name(), Some("demo"));
        assert!(config.modules.is_empty());
        assert!(!config.is_multi_module());
    }

    #[test]
    fn test_parse_full_project_config() {
        let toml = r#"
[project]
name = "demo"

[compilation]
module-source-path = true
base-module = "java.base"
werror = false

[options]
add-reads = ["m2x=m1x"]
add-exports = ["m1x/internal=m2x"]

[lint]
requires-automatic = true

[[module]]
name = "m1x"
packages = ["api", "internal"]
exports = [{ package = "api" }, { package = "internal", to = ["m3x"] }]
provides = [{ service = "api.Service", with = ["internal.Impl"] }]

[[module]]
name = "m2x"
requires = ["m1x", { module = "lib", transitive = true }]

[[module]]
name = "java.base"
kind = "system"
packages = ["java.lang"]
exports = [{ package = "java.lang" }]

[[automatic]]
path = "mods/lib-1.0.jar"
packages = ["lib"]

[class-path]
packages = ["legacy"]

[[reference]]
from = "m2x"
module = "m1x"
package = "api"
file = "src/m2x/m2x/Main.java"
line = 3
column = 8
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.is_multi_module());
        assert_eq!(config.modules.len(), 3);
        assert_eq!(config.modules[0].exports[1].to.as_deref(), Some(&["m3x".to_string()][..]));
        assert!(config.modules[1].requires[1].is_transitive());
        assert_eq!(config.modules[1].requires[0].module(), "m1x");
        assert_eq!(config.modules[2].kind, ModuleKindConfig::System);
        assert_eq!(config.automatic[0].packages, vec!["lib"]);
        assert_eq!(config.references[0].kind, ReferenceKind::Exports);
        assert_eq!(
            config.lint.as_ref().and_then(|l| l.requires_automatic),
            Some(true)
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[[module]]
name = "m1x"
exprots = []
"#;
        assert!(toml::from_str::<ProjectConfig>(toml).is_err());
    }

    #[test]
    fn test_default_roots() {
        let source = ModuleConfig {
            name: "m1x".to_string(),
            ..Default::default()
        };
        assert_eq!(source.root(), PathBuf::from("src/m1x"));

        let module_path = ModuleConfig {
            name: "lib".to_string(),
            kind: ModuleKindConfig::ModulePath,
            ..Default::default()
        };
        assert_eq!(module_path.root(), PathBuf::from("mods/lib"));
    }

    #[test]
    fn test_api_reference_requires_api_package() {
        let config = ProjectConfig {
            references: vec![ReferenceConfig {
                from: "m1x".to_string(),
                module: "m2x".to_string(),
                package: "p".to_string(),
                kind: ReferenceKind::Api,
                api_package: None,
                file: None,
                line: 0,
                column: 0,
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lint_merge() {
        let mut base = LintSection {
            deprecation: Some(false),
            exports: Some(true),
            ..Default::default()
        };
        base.merge(&LintSection {
            exports: Some(false),
            ..Default::default()
        });
        assert_eq!(base.deprecation, Some(false));
        assert_eq!(base.exports, Some(false));
    }

    #[test]
    fn test_options_extend() {
        let mut options = OptionsConfig {
            add_reads: vec!["a=b".to_string()],
            ..Default::default()
        };
        options.extend(&OptionsConfig {
            add_reads: vec!["a=c".to_string()],
            default_module_for_created_files: Some("a".to_string()),
            ..Default::default()
        });
        assert_eq!(options.add_reads, vec!["a=b", "a=c"]);
        assert_eq!(options.default_module_for_created_files.as_deref(), Some("a"));
    }
}
