//! Module identifiers and name rules
//!
//! [`ModuleId`] is an interned module name. Cloning shares the underlying
//! string, equality and hashing go by name. The module also owns the lexical
//! rules for module and package names and the derivation of automatic module
//! names from archive file names.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Marker name of the unnamed module. Never a legal module name.
pub const UNNAMED: &str = "<unnamed>";
/// `--add-modules` token: every system module
pub const ALL_SYSTEM: &str = "ALL-SYSTEM";
/// `--add-modules` token: every module on the module path
pub const ALL_MODULE_PATH: &str = "ALL-MODULE-PATH";
/// `--add-modules` token: the default root set of the unnamed module
pub const ALL_DEFAULT: &str = "ALL-DEFAULT";
/// Option target naming the unnamed module
pub const ALL_UNNAMED: &str = "ALL-UNNAMED";
/// Module every named module reads implicitly
pub const DEFAULT_BASE_MODULE: &str = "java.base";

/// Interned module name
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(Arc<str>);

impl ModuleId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Identifier of the unnamed module
    pub fn unnamed() -> Self {
        Self::new(UNNAMED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unnamed(&self) -> bool {
        &*self.0 == UNNAMED
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unnamed() {
            f.write_str("unnamed module")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ModuleId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Serialize for ModuleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ModuleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ModuleId::from)
    }
}

/// Errors produced while naming a module
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("invalid module name: '{0}'")]
    InvalidModuleName(String),

    #[error("Automatic-Module-Name '{name}' in {archive} is not a legal module name")]
    InvalidManifestName { archive: String, name: String },

    #[error("unable to derive module name from {archive}: '{derived}' is not a legal module name")]
    UnderivableName { archive: String, derived: String },
}

const KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "try", "void", "volatile", "while", "true", "false", "null", "_",
];

/// Whether `ident` is a legal identifier that is not a reserved word
pub fn is_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return false;
    }
    !KEYWORDS.contains(&ident)
}

/// Whether `name` is a legal qualified name (`a.b.c`)
pub fn is_qualified_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier)
}

/// Whether `name` is a legal module name
pub fn is_valid_module_name(name: &str) -> bool {
    is_qualified_name(name)
}

/// Whether `name` is a legal package name
pub fn is_valid_package_name(name: &str) -> bool {
    is_qualified_name(name)
}

/// Whether `name` is a legal (possibly nested) type name
pub fn is_valid_type_name(name: &str) -> bool {
    is_qualified_name(name)
}

/// Components of a module name that end in a digit
///
/// Such names are legal but usually mean a version number leaked into the name.
pub fn digit_terminated_components(name: &str) -> Vec<&str> {
    name.split('.')
        .filter(|c| c.chars().last().is_some_and(|ch| ch.is_ascii_digit()))
        .collect()
}

fn version_marker() -> &'static Regex {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    VERSION.get_or_init(|| Regex::new(r"-(\d+(\.|$))").expect("version marker pattern is valid"))
}

fn non_alphanumeric() -> &'static Regex {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    NON_ALNUM.get_or_init(|| Regex::new(r"[^A-Za-z0-9]").expect("character class is valid"))
}

fn repeated_dots() -> &'static Regex {
    static DOTS: OnceLock<Regex> = OnceLock::new();
    DOTS.get_or_init(|| Regex::new(r"\.{2,}").expect("dot run pattern is valid"))
}

/// Name and version inferred for an automatic module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomaticName {
    pub name: ModuleId,
    pub version: Option<String>,
}

/// Derive the name of an automatic module
///
/// A manifest `Automatic-Module-Name` wins when present and must be a legal
/// module name. Otherwise the name comes from the archive file name:
/// `.jar` is dropped, everything from the first `-<digit>` marker on is the
/// version, non-alphanumeric characters become dots, runs of dots collapse,
/// and leading/trailing dots are trimmed.
pub fn automatic_module_name(
    archive: &str,
    manifest_name: Option<&str>,
) -> Result<AutomaticName, NameError> {
    let file_name = archive.rsplit(['/', '\\']).next().unwrap_or(archive);
    let stem = file_name.strip_suffix(".jar").unwrap_or(file_name);

    let (base, version) = match version_marker().find(stem) {
        Some(m) => {
            let version = &stem[m.start() + 1..];
            (&stem[..m.start()], (!version.is_empty()).then(|| version.to_string()))
        }
        None => (stem, None),
    };

    if let Some(name) = manifest_name {
        let name = name.trim();
        if !is_valid_module_name(name) {
            return Err(NameError::InvalidManifestName {
                archive: file_name.to_string(),
                name: name.to_string(),
            });
        }
        return Ok(AutomaticName {
            name: ModuleId::new(name),
            version,
        });
    }

    let dotted = non_alphanumeric().replace_all(base, ".");
    let collapsed = repeated_dots().replace_all(&dotted, ".");
    let derived = collapsed.trim_matches('.');

    if !is_valid_module_name(derived) {
        return Err(NameError::UnderivableName {
            archive: file_name.to_string(),
            derived: derived.to_string(),
        });
    }

    Ok(AutomaticName {
        name: ModuleId::new(derived),
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_id_equality_by_name() {
        let a = ModuleId::new("m1x");
        let b = ModuleId::from(String::from("m1x"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "m1x");
        assert!(!a.is_unnamed());
        assert!(ModuleId::unnamed().is_unnamed());
    }

    #[test]
    fn test_unnamed_display() {
        assert_eq!(ModuleId::unnamed().to_string(), "unnamed module");
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("m1x"));
        assert!(is_identifier("$x"));
        assert!(is_identifier("_x"));
        assert!(!is_identifier("_"));
        assert!(!is_identifier("1m"));
        assert!(!is_identifier("class"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }

    #[test]
    fn test_qualified_names() {
        assert!(is_valid_module_name("java.base"));
        assert!(is_valid_module_name("com.example.app"));
        assert!(!is_valid_module_name("com..example"));
        assert!(!is_valid_module_name(".com"));
        assert!(!is_valid_module_name("com.example."));
        assert!(!is_valid_module_name("ALL-UNNAMED"));
        assert!(!is_valid_module_name(UNNAMED));
        assert!(!is_valid_package_name("p.int"));
    }

    #[test]
    fn test_digit_terminated_components() {
        assert_eq!(digit_terminated_components("foo.bar2.baz"), vec!["bar2"]);
        assert!(digit_terminated_components("foo.bar").is_empty());
    }

    #[test]
    fn test_automatic_name_from_file() {
        let auto = automatic_module_name("lib/foo-bar-1.2.3.jar", None).unwrap();
        assert_eq!(auto.name.as_str(), "foo.bar");
        assert_eq!(auto.version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_automatic_name_without_version() {
        let auto = automatic_module_name("commons_lang.jar", None).unwrap();
        assert_eq!(auto.name.as_str(), "commons.lang");
        assert_eq!(auto.version, None);
    }

    #[test]
    fn test_automatic_name_collapses_dots() {
        let auto = automatic_module_name("--my..lib--.jar", None).unwrap();
        assert_eq!(auto.name.as_str(), "my.lib");
    }

    #[test]
    fn test_manifest_name_wins() {
        let auto = automatic_module_name("whatever-2.0.jar", Some("org.example.lib")).unwrap();
        assert_eq!(auto.name.as_str(), "org.example.lib");
        assert_eq!(auto.version.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_invalid_manifest_name() {
        let err = automatic_module_name("whatever.jar", Some("1bad.name")).unwrap_err();
        assert!(matches!(err, NameError::InvalidManifestName { .. }));
    }

    #[test]
    fn test_underivable_name() {
        let err = automatic_module_name("class.jar", None).unwrap_err();
        assert!(matches!(err, NameError::UnderivableName { .. }));
    }
}
