//! Diagnostic system for module errors and warnings
//!
//! Every stage of the module phase reports through the unified [`Diagnostic`]
//! type. A diagnostic carries a fixed [`DiagnosticKind`] (which selects the
//! message template in a presentation layer), a location, and a structured
//! payload naming the modules and package involved.

use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic schema version
pub const DIAG_VERSION: u32 = 1;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Fatal error that stops the affected modules from compiling
    Error,
    /// Warning that doesn't prevent compilation
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// The fixed taxonomy of module diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    // Declarations
    InvalidModuleName,
    InvalidPackageName,
    InvalidTypeName,
    RequiresSelf,
    DuplicateRequires,
    DuplicateExports,
    DuplicateOpens,
    ConflictingTarget,
    EmptyTargetList,
    OpensInOpenModule,
    DuplicateUses,
    DuplicateProvides,
    InvalidProvides,
    DirectiveOnAutomaticModule,
    PackageEmptyOrNotFound,

    // Module table
    DuplicateModule,
    AutomaticNameCollision,
    InvalidAutomaticModuleName,
    PatchedAndOnModuleSourcePath,
    DuplicatePatch,

    // Options
    NoValueForOption,
    BadValueForOption,
    AllModulePathInvalid,
    BadNameForOption,
    ModuleForOptionNotFound,
    OptionIgnored,

    // Resolution
    ModuleNotFound,
    CyclicRequires,
    PackageClash,

    // Access
    NotExported,
    NotExportedToModule,
    DoesNotRead,
    DoesNotReadUnnamed,
    DoesNotReadFromUnnamed,
    NotExportedFromUnnamed,
    NotExportedToModuleFromUnnamed,
    PackageNotFound,

    // Lints
    RequiresTransitiveAutomatic,
    RequiresAutomatic,
    DeprecatedModule,
    PoorChoiceForModuleName,
    ExportsToUnknownModule,
    OpensPackageNotFound,
    LeaksUnexported,
    LeaksUnexportedQualified,
    LeaksNotRequiredTransitive,
}

impl DiagnosticKind {
    /// Stable code for this kind (e.g., "SM4002")
    pub fn code(self) -> &'static str {
        use DiagnosticKind::*;
        match self {
            InvalidModuleName => error_codes::INVALID_MODULE_NAME,
            InvalidPackageName => error_codes::INVALID_PACKAGE_NAME,
            InvalidTypeName => error_codes::INVALID_TYPE_NAME,
            RequiresSelf => error_codes::REQUIRES_SELF,
            DuplicateRequires => error_codes::DUPLICATE_REQUIRES,
            DuplicateExports => error_codes::DUPLICATE_EXPORTS,
            DuplicateOpens => error_codes::DUPLICATE_OPENS,
            ConflictingTarget => error_codes::CONFLICTING_TARGET,
            EmptyTargetList => error_codes::EMPTY_TARGET_LIST,
            OpensInOpenModule => error_codes::OPENS_IN_OPEN_MODULE,
            DuplicateUses => error_codes::DUPLICATE_USES,
            DuplicateProvides => error_codes::DUPLICATE_PROVIDES,
            InvalidProvides => error_codes::INVALID_PROVIDES,
            DirectiveOnAutomaticModule => error_codes::DIRECTIVE_ON_AUTOMATIC_MODULE,
            PackageEmptyOrNotFound => error_codes::PACKAGE_EMPTY_OR_NOT_FOUND,
            DuplicateModule => error_codes::DUPLICATE_MODULE,
            AutomaticNameCollision => error_codes::AUTOMATIC_NAME_COLLISION,
            InvalidAutomaticModuleName => error_codes::INVALID_AUTOMATIC_MODULE_NAME,
            PatchedAndOnModuleSourcePath => error_codes::PATCHED_AND_ON_MODULE_SOURCE_PATH,
            DuplicatePatch => error_codes::DUPLICATE_PATCH,
            NoValueForOption => error_codes::NO_VALUE_FOR_OPTION,
            BadValueForOption => error_codes::BAD_VALUE_FOR_OPTION,
            AllModulePathInvalid => error_codes::ALL_MODULE_PATH_INVALID,
            BadNameForOption => error_codes::BAD_NAME_FOR_OPTION,
            ModuleForOptionNotFound => error_codes::MODULE_FOR_OPTION_NOT_FOUND,
            OptionIgnored => error_codes::OPTION_IGNORED,
            ModuleNotFound => error_codes::MODULE_NOT_FOUND,
            CyclicRequires => error_codes::CYCLIC_REQUIRES,
            PackageClash => error_codes::PACKAGE_CLASH,
            NotExported => error_codes::NOT_EXPORTED,
            NotExportedToModule => error_codes::NOT_EXPORTED_TO_MODULE,
            DoesNotRead => error_codes::DOES_NOT_READ,
            DoesNotReadUnnamed => error_codes::DOES_NOT_READ_UNNAMED,
            DoesNotReadFromUnnamed => error_codes::DOES_NOT_READ_FROM_UNNAMED,
            NotExportedFromUnnamed => error_codes::NOT_EXPORTED_FROM_UNNAMED,
            NotExportedToModuleFromUnnamed => error_codes::NOT_EXPORTED_TO_MODULE_FROM_UNNAMED,
            PackageNotFound => error_codes::PACKAGE_NOT_FOUND,
            RequiresTransitiveAutomatic => error_codes::REQUIRES_TRANSITIVE_AUTOMATIC,
            RequiresAutomatic => error_codes::REQUIRES_AUTOMATIC,
            DeprecatedModule => error_codes::DEPRECATED_MODULE,
            PoorChoiceForModuleName => error_codes::POOR_CHOICE_FOR_MODULE_NAME,
            ExportsToUnknownModule => error_codes::EXPORTS_TO_UNKNOWN_MODULE,
            OpensPackageNotFound => error_codes::OPENS_PACKAGE_NOT_FOUND,
            LeaksUnexported => error_codes::LEAKS_UNEXPORTED,
            LeaksUnexportedQualified => error_codes::LEAKS_UNEXPORTED_QUALIFIED,
            LeaksNotRequiredTransitive => error_codes::LEAKS_NOT_REQUIRED_TRANSITIVE,
        }
    }

    /// Severity a diagnostic of this kind has before `werror` promotion
    pub fn default_level(self) -> DiagnosticLevel {
        use DiagnosticKind::*;
        match self {
            BadNameForOption
            | ModuleForOptionNotFound
            | OptionIgnored
            | RequiresTransitiveAutomatic
            | RequiresAutomatic
            | DeprecatedModule
            | PoorChoiceForModuleName
            | ExportsToUnknownModule
            | OpensPackageNotFound
            | LeaksUnexported
            | LeaksUnexportedQualified
            | LeaksNotRequiredTransitive => DiagnosticLevel::Warning,
            _ => DiagnosticLevel::Error,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Structured data a presentation layer needs to fill a message template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Module the diagnostic is about (declaring, reading, or option source)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub module: Option<String>,
    /// Second module involved (required, exporting, or option target)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub other_module: Option<String>,
    /// Package involved
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub package: Option<String>,
    /// Command-line option involved
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub option: Option<String>,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        self.module.is_none()
            && self.other_module.is_none()
            && self.package.is_none()
            && self.option.is_none()
    }
}

/// Secondary location for related diagnostic information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedLocation {
    pub location: Location,
    /// Description of this location
    pub message: String,
}

/// A diagnostic event (error or warning)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic schema version
    pub diag_version: u32,
    /// Severity level
    pub level: DiagnosticLevel,
    /// Diagnostic kind
    pub kind: DiagnosticKind,
    /// Main diagnostic message
    pub message: String,
    /// Where the diagnostic is attributed
    pub location: Location,
    /// Structured payload
    #[serde(skip_serializing_if = "Payload::is_empty", default)]
    pub payload: Payload,
    /// Additional notes (optional)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
    /// Related locations (optional)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub related: Vec<RelatedLocation>,
    /// Suggested fix (optional)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic at the kind's default level
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, location: Location) -> Self {
        Self {
            diag_version: DIAG_VERSION,
            level: kind.default_level(),
            kind,
            message: message.into(),
            location,
            payload: Payload::default(),
            notes: Vec::new(),
            related: Vec::new(),
            help: None,
        }
    }

    /// Create an error diagnostic regardless of the kind's default level
    pub fn error(kind: DiagnosticKind, message: impl Into<String>, location: Location) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            ..Self::new(kind, message, location)
        }
    }

    /// Create a warning diagnostic regardless of the kind's default level
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>, location: Location) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            ..Self::new(kind, message, location)
        }
    }

    /// Stable code of this diagnostic's kind
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    /// Set the module this diagnostic is about
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.payload.module = Some(module.into());
        self
    }

    /// Set the second module involved
    pub fn with_other_module(mut self, module: impl Into<String>) -> Self {
        self.payload.other_module = Some(module.into());
        self
    }

    /// Set the package involved
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.payload.package = Some(package.into());
        self
    }

    /// Set the command-line option involved
    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.payload.option = Some(option.into());
        self
    }

    /// Add a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Add a help message
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add a related location
    pub fn with_related_location(mut self, location: RelatedLocation) -> Self {
        self.related.push(location);
        self
    }

    /// Format as human-readable string
    pub fn to_human_string(&self) -> String {
        let mut output = String::new();

        // Header: error[SM4002]: cyclic requires: m2x
        output.push_str(&format!(
            "{}[{}]: {}\n",
            self.level,
            self.code(),
            self.message
        ));

        // Location: --> m1x/module-info.java:2:5
        output.push_str(&format!("  --> {}\n", self.location));

        for note in &self.notes {
            output.push_str(&format!("   = note: {}\n", note));
        }

        for related in &self.related {
            output.push_str(&format!(
                "   = note: related location at {}: {}\n",
                related.location, related.message
            ));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!("   = help: {}\n", help));
        }

        output
    }

    /// Format as JSON string
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Format as compact JSON string
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}[{}]: {}",
            self.location,
            self.level,
            self.code(),
            self.message
        )
    }
}

/// Sort diagnostics by level (errors first), then by location
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        match (a.level, b.level) {
            (DiagnosticLevel::Error, DiagnosticLevel::Warning) => std::cmp::Ordering::Less,
            (DiagnosticLevel::Warning, DiagnosticLevel::Error) => std::cmp::Ordering::Greater,
            _ => a
                .location
                .file
                .cmp(&b.location.file)
                .then(a.location.line.cmp(&b.location.line))
                .then(a.location.column.cmp(&b.location.column)),
        }
    });
}

/// Whether any diagnostic in the slice is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Turn every warning into an error (`-Werror`)
pub fn promote_warnings(diagnostics: &mut [Diagnostic]) {
    for diag in diagnostics.iter_mut() {
        if diag.level == DiagnosticLevel::Warning {
            diag.level = DiagnosticLevel::Error;
            diag.notes.push("warnings are treated as errors".to_string());
        }
    }
}

/// Error code registry
pub mod error_codes {
    // SM1xxx - Module declaration errors
    pub const INVALID_MODULE_NAME: &str = "SM1001";
    pub const INVALID_PACKAGE_NAME: &str = "SM1002";
    pub const INVALID_TYPE_NAME: &str = "SM1003";
    pub const REQUIRES_SELF: &str = "SM1004";
    pub const DUPLICATE_REQUIRES: &str = "SM1005";
    pub const DUPLICATE_EXPORTS: &str = "SM1006";
    pub const DUPLICATE_OPENS: &str = "SM1007";
    pub const CONFLICTING_TARGET: &str = "SM1008";
    pub const EMPTY_TARGET_LIST: &str = "SM1009";
    pub const OPENS_IN_OPEN_MODULE: &str = "SM1010";
    pub const DUPLICATE_USES: &str = "SM1011";
    pub const DUPLICATE_PROVIDES: &str = "SM1012";
    pub const INVALID_PROVIDES: &str = "SM1013";
    pub const DIRECTIVE_ON_AUTOMATIC_MODULE: &str = "SM1014";
    pub const PACKAGE_EMPTY_OR_NOT_FOUND: &str = "SM1015";

    // SM2xxx - Module table errors
    pub const DUPLICATE_MODULE: &str = "SM2001";
    pub const AUTOMATIC_NAME_COLLISION: &str = "SM2002";
    pub const INVALID_AUTOMATIC_MODULE_NAME: &str = "SM2003";
    pub const PATCHED_AND_ON_MODULE_SOURCE_PATH: &str = "SM2004";
    pub const DUPLICATE_PATCH: &str = "SM2005";

    // SM3xxx - Option errors
    pub const NO_VALUE_FOR_OPTION: &str = "SM3001";
    pub const BAD_VALUE_FOR_OPTION: &str = "SM3002";
    pub const ALL_MODULE_PATH_INVALID: &str = "SM3003";

    // SM4xxx - Resolution errors
    pub const MODULE_NOT_FOUND: &str = "SM4001";
    pub const CYCLIC_REQUIRES: &str = "SM4002";
    pub const PACKAGE_CLASH: &str = "SM4003";

    // SM5xxx - Access errors
    pub const NOT_EXPORTED: &str = "SM5001";
    pub const NOT_EXPORTED_TO_MODULE: &str = "SM5002";
    pub const DOES_NOT_READ: &str = "SM5003";
    pub const DOES_NOT_READ_UNNAMED: &str = "SM5004";
    pub const DOES_NOT_READ_FROM_UNNAMED: &str = "SM5005";
    pub const NOT_EXPORTED_FROM_UNNAMED: &str = "SM5006";
    pub const NOT_EXPORTED_TO_MODULE_FROM_UNNAMED: &str = "SM5007";
    pub const PACKAGE_NOT_FOUND: &str = "SM5008";

    // SW0xxx - Warnings
    pub const BAD_NAME_FOR_OPTION: &str = "SW0001";
    pub const MODULE_FOR_OPTION_NOT_FOUND: &str = "SW0002";
    pub const OPTION_IGNORED: &str = "SW0003";
    pub const REQUIRES_TRANSITIVE_AUTOMATIC: &str = "SW0101";
    pub const REQUIRES_AUTOMATIC: &str = "SW0102";
    pub const DEPRECATED_MODULE: &str = "SW0103";
    pub const POOR_CHOICE_FOR_MODULE_NAME: &str = "SW0104";
    pub const EXPORTS_TO_UNKNOWN_MODULE: &str = "SW0105";
    pub const OPENS_PACKAGE_NOT_FOUND: &str = "SW0106";
    pub const LEAKS_UNEXPORTED: &str = "SW0201";
    pub const LEAKS_UNEXPORTED_QUALIFIED: &str = "SW0202";
    pub const LEAKS_NOT_REQUIRED_TRANSITIVE: &str = "SW0203";
}
