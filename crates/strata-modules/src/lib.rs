//! Strata Modules - module graph resolution and visibility
//!
//! This library decides, for a compilation:
//! - which modules exist (the module table) and which take part (resolution)
//! - which modules read which (readability)
//! - whether code in one module may use a package of another (accessibility)
//!
//! Inputs are validated descriptors, raw module options and lint switches.
//! [`ModuleGraph::builder`] runs the whole pipeline and freezes the result.

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod access;
pub mod diagnostic;
pub mod directive;
pub mod emit;
pub mod graph;
pub mod lint;
pub mod location;
pub mod name;
pub mod options;
pub mod project;
pub mod resolver;
pub mod table;

pub use access::{Access, AccessDenial, DenialReason, Grant, QueryService, Relations};
pub use diagnostic::{
    error_codes, has_errors, promote_warnings, sort_diagnostics, Diagnostic, DiagnosticKind,
    DiagnosticLevel, RelatedLocation, DIAG_VERSION,
};
pub use directive::{
    DescriptorBuilder, GrantKind, ModuleDescriptor, ModuleKind, PackageGrant, Provides, Requires,
};
pub use emit::ModuleInfo;
pub use graph::{AssemblyError, ModuleGraph, ModuleGraphBuilder, Stage};
pub use lint::LintConfig;
pub use location::Location;
pub use name::{automatic_module_name, is_valid_module_name, AutomaticName, ModuleId, NameError};
pub use options::{ModuleOptions, OptionOverlay, RawOptions};
pub use resolver::{resolve, ModuleState, ResolvedModuleSet, Resolver};
pub use table::{DescriptorProvider, ModuleEntry, ModuleTable, ModuleTableBuilder, Origin, Patch};
