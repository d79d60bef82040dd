//! Configuration loading and precedence tests

use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use strata_config::{ConfigError, ConfigLoader, ModuleKindConfig, ProjectConfig, ReferenceKind};
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join("strata.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

fn create_global_file(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("global.toml");
    fs::write(&path, content).unwrap();
    path
}

/// Loader that never touches the real home directory
fn isolated_loader(dir: &Path) -> ConfigLoader {
    ConfigLoader::with_global_config_path(dir.join("no-global.toml"))
}

// ============================================================================
// Loading
// ============================================================================

#[test]
#[serial]
fn test_load_project_config_basic() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[project]
name = "demo"

[[module]]
name = "m1x"
packages = ["api"]
exports = [{ package = "api" }]
"#,
    );

    let config = isolated_loader(temp_dir.path())
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(config.is_project());
    assert_eq!(config.project_name(), Some("demo"));
    assert_eq!(config.project.modules.len(), 1);
    assert_eq!(config.project.modules[0].kind, ModuleKindConfig::Source);
    assert_eq!(config.base_module(), "java.base");
    assert!(!config.werror());
}

#[test]
#[serial]
fn test_load_from_subdirectory_finds_parent() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[project]\nname = \"parent\"\n");

    let nested = temp_dir.path().join("src").join("m1x");
    fs::create_dir_all(&nested).unwrap();

    let config = isolated_loader(temp_dir.path())
        .load_from_directory(&nested)
        .unwrap();

    assert_eq!(config.project_name(), Some("parent"));
    assert_eq!(config.project_root(), Some(temp_dir.path()));
}

#[test]
#[serial]
fn test_empty_config_is_valid() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "");

    let config = isolated_loader(temp_dir.path())
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(config.is_project());
    assert!(config.project.modules.is_empty());
}

#[test]
fn test_load_missing_file_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let err = ProjectConfig::load_from_file(&temp_dir.path().join("strata.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn test_invalid_toml_reports_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[[module]\nname = ");

    let err = ProjectConfig::load_from_file(&path).unwrap_err();
    match err {
        ConfigError::TomlParseError { file, .. } => assert_eq!(file, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_module_name_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[[module]]\nname = \"\"\n");

    let err = ProjectConfig::load_from_file(&path).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"Invalid value for 'module[0].name': name cannot be empty"
    );
}

#[test]
fn test_reference_kinds_parse() {
    let content = r#"
[[reference]]
from = "ALL-UNNAMED"
module = "m1x"
package = "api"

[[reference]]
from = "m2x"
module = "m1x"
package = "impl"
kind = "opens"

[[reference]]
from = "m1x"
module = "m3x"
package = "types"
kind = "api"
api-package = "api"
"#;
    let config: ProjectConfig = toml::from_str(content).unwrap();
    config.validate().unwrap();

    let kinds: Vec<_> = config.references.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![ReferenceKind::Exports, ReferenceKind::Opens, ReferenceKind::Api]
    );
    assert_eq!(config.references[2].api_package.as_deref(), Some("api"));
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
#[serial]
fn test_global_defaults_apply_without_project_values() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[project]\nname = \"demo\"\n");
    let global = create_global_file(
        temp_dir.path(),
        r#"
[defaults]
werror = true
base-module = "core.base"

[lint]
module-name = true
deprecation = false
"#,
    );

    let config = ConfigLoader::with_global_config_path(global)
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(config.werror());
    assert_eq!(config.base_module(), "core.base");
    assert_eq!(config.lint().module_name, Some(true));
}

#[test]
#[serial]
fn test_project_overrides_global() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[compilation]
werror = false
base-module = "java.base"

[lint]
deprecation = true
"#,
    );
    let global = create_global_file(
        temp_dir.path(),
        r#"
[defaults]
werror = true
base-module = "core.base"

[lint]
module-name = true
deprecation = false
"#,
    );

    let config = ConfigLoader::with_global_config_path(global)
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(!config.werror());
    assert_eq!(config.base_module(), "java.base");

    let lint = config.lint();
    assert_eq!(lint.deprecation, Some(true));
    assert_eq!(lint.module_name, Some(true));
}

#[test]
#[serial]
fn test_invalid_global_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "");
    let global = create_global_file(temp_dir.path(), "[output]\nformat = \"xml\"\n");

    let config = ConfigLoader::with_global_config_path(global)
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert_eq!(config.output_format(), "human");
}

// ============================================================================
// Environment overrides
// ============================================================================

#[rstest]
#[case("true", true)]
#[case("1", true)]
#[case("YES", true)]
#[case("false", false)]
#[case("0", false)]
#[serial]
fn test_env_werror_override(#[case] value: &str, #[case] expected: bool) {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[compilation]\nwerror = false\n");

    env::set_var("STRATA_WERROR", value);
    let result = isolated_loader(temp_dir.path()).load_from_directory(temp_dir.path());
    env::remove_var("STRATA_WERROR");

    assert_eq!(result.unwrap().werror(), expected);
}

#[test]
#[serial]
fn test_env_werror_rejects_garbage() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "");

    env::set_var("STRATA_WERROR", "maybe");
    let result = isolated_loader(temp_dir.path()).load_from_directory(temp_dir.path());
    env::remove_var("STRATA_WERROR");

    match result {
        Err(ConfigError::InvalidEnvValue { var, value }) => {
            assert_eq!(var, "STRATA_WERROR");
            assert_eq!(value, "maybe");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
#[serial]
fn test_env_base_module_override() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[compilation]\nbase-module = \"java.base\"\n");

    env::set_var("STRATA_BASE_MODULE", "core.base");
    let result = isolated_loader(temp_dir.path()).load_from_directory(temp_dir.path());
    env::remove_var("STRATA_BASE_MODULE");

    assert_eq!(result.unwrap().base_module(), "core.base");
}
