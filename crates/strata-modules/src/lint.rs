//! Declaration lints
//!
//! Checks the modules being compiled against the resolved graph. Everything
//! here is a warning controlled by [`LintConfig`], except `exports` of a
//! package the module does not contain, which is always an error.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::directive::{GrantKind, ModuleDescriptor};
use crate::name::digit_terminated_components;
use crate::resolver::ResolvedModuleSet;
use crate::table::ModuleTable;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which lints are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    /// `requires transitive` naming an automatic module
    pub requires_transitive_automatic: bool,
    /// `requires` naming an automatic module
    pub requires_automatic: bool,
    /// Requiring a deprecated module
    pub deprecation: bool,
    /// Module name components ending in a digit
    pub module_name: bool,
    /// `exports`/`opens ... to` a module that does not exist
    pub exports_to_unknown: bool,
    /// `opens` of a package the module does not contain
    pub opens_missing_package: bool,
    /// Unexported types in exported APIs
    pub exports: bool,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            requires_transitive_automatic: true,
            requires_automatic: false,
            deprecation: true,
            module_name: false,
            exports_to_unknown: true,
            opens_missing_package: true,
            exports: true,
        }
    }
}

impl LintConfig {
    /// Every lint switched on
    pub fn all() -> Self {
        Self {
            requires_transitive_automatic: true,
            requires_automatic: true,
            deprecation: true,
            module_name: true,
            exports_to_unknown: true,
            opens_missing_package: true,
            exports: true,
        }
    }
}

/// Lint the source modules of the resolved graph
pub fn check_declarations(
    table: &ModuleTable,
    resolved: &ResolvedModuleSet,
    config: &LintConfig,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for entry in table.source_modules() {
        if !resolved.contains(entry.name()) {
            continue;
        }
        let module = &entry.descriptor;
        check_requires(table, resolved, config, module, &mut diagnostics);
        check_name(config, module, &mut diagnostics);
        check_grants(table, config, module, &mut diagnostics);
    }
    debug!(count = diagnostics.len(), "declaration lints");
    diagnostics
}

fn check_requires(
    table: &ModuleTable,
    resolved: &ResolvedModuleSet,
    config: &LintConfig,
    module: &ModuleDescriptor,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for requires in &module.requires {
        if !resolved.contains(&requires.target) {
            continue;
        }
        let Some(target) = table.descriptor(&requires.target) else {
            continue;
        };

        if target.is_automatic() {
            let choice = if requires.transitive && config.requires_transitive_automatic {
                Some((DiagnosticKind::RequiresTransitiveAutomatic, "requires transitive"))
            } else if config.requires_automatic {
                Some((DiagnosticKind::RequiresAutomatic, "requires"))
            } else {
                None
            };
            if let Some((kind, directive)) = choice {
                diagnostics.push(
                    Diagnostic::new(
                        kind,
                        format!("{} directive for an automatic module: {}", directive, target.name),
                        requires.location.clone(),
                    )
                    .with_module(module.name.as_str())
                    .with_other_module(target.name.as_str()),
                );
            }
        }

        if target.deprecated && config.deprecation {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::DeprecatedModule,
                    format!("module {} has been deprecated", target.name),
                    requires.location.clone(),
                )
                .with_module(module.name.as_str())
                .with_other_module(target.name.as_str()),
            );
        }
    }
}

fn check_name(config: &LintConfig, module: &ModuleDescriptor, diagnostics: &mut Vec<Diagnostic>) {
    if !config.module_name {
        return;
    }
    for component in digit_terminated_components(module.name.as_str()) {
        diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::PoorChoiceForModuleName,
                format!("module name component {} should avoid terminal digits", component),
                module.location.clone(),
            )
            .with_module(module.name.as_str()),
        );
    }
}

fn check_grants(
    table: &ModuleTable,
    config: &LintConfig,
    module: &ModuleDescriptor,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for kind in [GrantKind::Exports, GrantKind::Opens] {
        for grant in module.grants(kind).values() {
            if !module.contains_package(&grant.package) {
                match kind {
                    GrantKind::Exports => diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::PackageEmptyOrNotFound,
                            format!("package is empty or does not exist: {}", grant.package),
                            grant.location.clone(),
                        )
                        .with_module(module.name.as_str())
                        .with_package(grant.package.clone()),
                    ),
                    GrantKind::Opens if config.opens_missing_package => diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::OpensPackageNotFound,
                            format!("package is empty or does not exist: {}", grant.package),
                            grant.location.clone(),
                        )
                        .with_module(module.name.as_str())
                        .with_package(grant.package.clone()),
                    ),
                    GrantKind::Opens => {}
                }
            }

            if !config.exports_to_unknown {
                continue;
            }
            for target in grant.targets.iter().flatten() {
                if !table.contains(target.as_str()) {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::ExportsToUnknownModule,
                            format!("module not found: {}", target),
                            grant.location.clone(),
                        )
                        .with_module(module.name.as_str())
                        .with_other_module(target.as_str())
                        .with_package(grant.package.clone()),
                    );
                }
            }
        }
    }
}
