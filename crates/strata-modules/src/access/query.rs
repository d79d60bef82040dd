//! Accessibility queries
//!
//! Answers "may module R use package P of module E" against the frozen
//! relations. Every query is a pure function of its inputs, so callers may
//! issue them from many threads at once.

use crate::access::relations::{Grant, Relations};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::directive::GrantKind;
use crate::location::Location;
use crate::name::ModuleId;
use crate::resolver::ResolvedModuleSet;
use crate::table::ModuleTable;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Why an access was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenialReason {
    NotExported,
    NotExportedToThisModule,
    DoesNotRead,
    DoesNotReadUnnamed,
    DoesNotReadFromUnnamed,
    NotExportedFromUnnamed,
    NotExportedToThisModuleFromUnnamed,
    PackageEmptyOrNotFound,
}

impl DenialReason {
    pub fn diagnostic_kind(self) -> DiagnosticKind {
        match self {
            DenialReason::NotExported => DiagnosticKind::NotExported,
            DenialReason::NotExportedToThisModule => DiagnosticKind::NotExportedToModule,
            DenialReason::DoesNotRead => DiagnosticKind::DoesNotRead,
            DenialReason::DoesNotReadUnnamed => DiagnosticKind::DoesNotReadUnnamed,
            DenialReason::DoesNotReadFromUnnamed => DiagnosticKind::DoesNotReadFromUnnamed,
            DenialReason::NotExportedFromUnnamed => DiagnosticKind::NotExportedFromUnnamed,
            DenialReason::NotExportedToThisModuleFromUnnamed => {
                DiagnosticKind::NotExportedToModuleFromUnnamed
            }
            DenialReason::PackageEmptyOrNotFound => DiagnosticKind::PackageNotFound,
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DenialReason::NotExported => "not exported",
            DenialReason::NotExportedToThisModule => "not exported to this module",
            DenialReason::DoesNotRead => "does not read",
            DenialReason::DoesNotReadUnnamed => "does not read the unnamed module",
            DenialReason::DoesNotReadFromUnnamed => "not read by the unnamed module",
            DenialReason::NotExportedFromUnnamed => "not exported to the unnamed module",
            DenialReason::NotExportedToThisModuleFromUnnamed => {
                "exported to named modules only"
            }
            DenialReason::PackageEmptyOrNotFound => "package empty or not found",
        };
        f.write_str(text)
    }
}

/// A refused access with everything needed to report it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDenial {
    pub reason: DenialReason,
    pub reader: ModuleId,
    pub exporter: ModuleId,
    pub package: String,
    /// Which relation was consulted
    pub relation: GrantKind,
}

impl AccessDenial {
    /// Diagnostic for a reference site at `location`
    pub fn to_diagnostic(&self, location: Location) -> Diagnostic {
        let (reader, exporter, package) = (&self.reader, &self.exporter, &self.package);
        let verb = self.relation.keyword().trim_end_matches('s');
        let message = match self.reason {
            DenialReason::PackageEmptyOrNotFound => {
                format!("package is empty or does not exist: {}", package)
            }
            DenialReason::DoesNotRead => format!(
                "package {} is declared in module {}, but module {} does not read it",
                package, exporter, reader
            ),
            DenialReason::DoesNotReadUnnamed => format!(
                "package {} is declared in the unnamed module, but module {} does not read it",
                package, reader
            ),
            DenialReason::DoesNotReadFromUnnamed => format!(
                "package {} is declared in module {}, which is not in the module graph",
                package, exporter
            ),
            DenialReason::NotExported => format!(
                "package {} is declared in module {}, which does not {} it",
                package, exporter, verb
            ),
            DenialReason::NotExportedToThisModule => format!(
                "package {} is declared in module {}, which does not {} it to module {}",
                package, exporter, verb, reader
            ),
            DenialReason::NotExportedFromUnnamed => format!(
                "package {} is declared in module {}, which does not {} it to the unnamed module",
                package, exporter, verb
            ),
            DenialReason::NotExportedToThisModuleFromUnnamed => format!(
                "package {} is declared in module {}, which {}s it to selected modules only",
                package, exporter, verb
            ),
        };

        let mut diag = Diagnostic::new(self.reason.diagnostic_kind(), message, location)
            .with_module(reader.as_str())
            .with_other_module(exporter.as_str())
            .with_package(package.clone());
        match self.reason {
            DenialReason::DoesNotRead => {
                diag = diag.with_help(format!(
                    "add 'requires {};' to module {} or use --add-reads {}={}",
                    exporter, reader, reader, exporter
                ));
            }
            DenialReason::NotExported | DenialReason::NotExportedToThisModule => {
                diag = diag.with_help(format!(
                    "use --add-{} {}/{}={}",
                    self.relation.keyword(),
                    exporter,
                    package,
                    reader
                ));
            }
            DenialReason::NotExportedFromUnnamed
            | DenialReason::NotExportedToThisModuleFromUnnamed => {
                diag = diag.with_help(format!(
                    "use --add-{} {}/{}=ALL-UNNAMED",
                    self.relation.keyword(),
                    exporter,
                    package
                ));
            }
            _ => {}
        }
        diag
    }
}

/// Result of an accessibility query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "access", rename_all = "kebab-case")]
pub enum Access {
    Allowed,
    Denied(AccessDenial),
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Access::Allowed)
    }

    pub fn denial(&self) -> Option<&AccessDenial> {
        match self {
            Access::Allowed => None,
            Access::Denied(denial) => Some(denial),
        }
    }

    pub fn reason(&self) -> Option<DenialReason> {
        self.denial().map(|d| d.reason)
    }
}

/// Read-only query service over a resolved module graph
#[derive(Debug, Clone, Copy)]
pub struct QueryService<'g> {
    table: &'g ModuleTable,
    resolved: &'g ResolvedModuleSet,
    relations: &'g Relations,
}

impl<'g> QueryService<'g> {
    pub fn new(table: &'g ModuleTable, resolved: &'g ResolvedModuleSet, relations: &'g Relations) -> Self {
        Self {
            table,
            resolved,
            relations,
        }
    }

    /// May `reader` use the public types of `package` in `exporter`
    pub fn query(&self, reader: &ModuleId, exporter: &ModuleId, package: &str) -> Access {
        self.check(GrantKind::Exports, reader, exporter, package)
    }

    /// Same as [`QueryService::query`], against the opens relation
    pub fn query_opens(&self, reader: &ModuleId, exporter: &ModuleId, package: &str) -> Access {
        self.check(GrantKind::Opens, reader, exporter, package)
    }

    fn check(&self, kind: GrantKind, reader: &ModuleId, exporter: &ModuleId, package: &str) -> Access {
        let deny = |reason| {
            Access::Denied(AccessDenial {
                reason,
                reader: reader.clone(),
                exporter: exporter.clone(),
                package: package.to_string(),
                relation: kind,
            })
        };

        let present = self.resolved.contains(exporter)
            && self
                .table
                .descriptor(exporter)
                .is_some_and(|d| d.contains_package(package));
        if !present {
            return deny(DenialReason::PackageEmptyOrNotFound);
        }
        if reader == exporter {
            return Access::Allowed;
        }

        if !self.relations.readability.reads(reader, exporter) {
            return deny(if exporter.is_unnamed() {
                DenialReason::DoesNotReadUnnamed
            } else if reader.is_unnamed() {
                DenialReason::DoesNotReadFromUnnamed
            } else {
                DenialReason::DoesNotRead
            });
        }
        if exporter.is_unnamed() {
            return Access::Allowed;
        }

        match self.relations.package_relation(kind).get(exporter, package) {
            Some(grant) if grant.permits(reader) => Access::Allowed,
            Some(_) if reader.is_unnamed() => deny(DenialReason::NotExportedToThisModuleFromUnnamed),
            Some(_) => deny(DenialReason::NotExportedToThisModule),
            None if reader.is_unnamed() => deny(DenialReason::NotExportedFromUnnamed),
            None => deny(DenialReason::NotExported),
        }
    }

    /// Check a type used in the public API of an exported package
    ///
    /// `declaring` exports `api_package`, whose public signatures mention a
    /// type from `referenced_package` in `referenced`. Returns a warning when
    /// readers of the API could not use that type.
    pub fn check_api_leak(
        &self,
        declaring: &ModuleId,
        api_package: &str,
        referenced: &ModuleId,
        referenced_package: &str,
        location: Location,
    ) -> Option<Diagnostic> {
        let exports = &self.relations.exports;
        let api_grant = exports.get(declaring, api_package)?;
        if referenced.is_unnamed() {
            return None;
        }

        let leak = |kind: DiagnosticKind, message: String| {
            Some(
                Diagnostic::new(kind, message, location.clone())
                    .with_module(declaring.as_str())
                    .with_other_module(referenced.as_str())
                    .with_package(referenced_package),
            )
        };

        match exports.get(referenced, referenced_package) {
            None => {
                return leak(
                    DiagnosticKind::LeaksUnexported,
                    format!(
                        "type in package {} of module {} is not exported but used in the API of {}",
                        referenced_package, referenced, api_package
                    ),
                );
            }
            Some(Grant::QualifiedTo(targets)) => {
                let covered = match api_grant {
                    Grant::Unqualified => false,
                    Grant::QualifiedTo(audience) => audience.iter().all(|m| targets.contains(m)),
                };
                if !covered {
                    return leak(
                        DiagnosticKind::LeaksUnexportedQualified,
                        format!(
                            "type in package {} of module {} is not exported to all readers of {}",
                            referenced_package, referenced, api_package
                        ),
                    );
                }
            }
            Some(Grant::Unqualified) => {}
        }

        if referenced == declaring || referenced == self.table.base_module() {
            return None;
        }
        if self.reaches_transitively(declaring, referenced) {
            return None;
        }
        leak(
            DiagnosticKind::LeaksNotRequiredTransitive,
            format!(
                "type in module {} is used in the API of {} but module {} is not required transitively",
                referenced, api_package, referenced
            ),
        )
    }

    /// Whether `from` reaches `target` through `requires transitive` edges
    ///
    /// Automatic modules end the walk.
    fn reaches_transitively(&self, from: &ModuleId, target: &ModuleId) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![from];
        while let Some(module) = stack.pop() {
            if !seen.insert(module) {
                continue;
            }
            let Some(descriptor) = self.table.descriptor(module) else {
                continue;
            };
            if descriptor.is_automatic() {
                continue;
            }
            for requires in descriptor.requires.iter().filter(|r| r.transitive) {
                if &requires.target == target {
                    return true;
                }
                stack.push(&requires.target);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_diagnostic() {
        let denial = AccessDenial {
            reason: DenialReason::DoesNotRead,
            reader: "m2x".into(),
            exporter: "m1x".into(),
            package: "api".into(),
            relation: GrantKind::Exports,
        };
        let diag = denial.to_diagnostic(Location::new("m2x/test/Test.java", 3, 12));

        assert_eq!(diag.kind, DiagnosticKind::DoesNotRead);
        assert_eq!(
            diag.message,
            "package api is declared in module m1x, but module m2x does not read it"
        );
        assert_eq!(diag.payload.module.as_deref(), Some("m2x"));
        assert_eq!(diag.payload.other_module.as_deref(), Some("m1x"));
        assert!(diag.is_error());
    }

    #[test]
    fn test_opens_denial_wording() {
        let denial = AccessDenial {
            reason: DenialReason::NotExported,
            reader: "m2x".into(),
            exporter: "m1x".into(),
            package: "impl".into(),
            relation: GrantKind::Opens,
        };
        let diag = denial.to_diagnostic(Location::unknown());
        assert_eq!(diag.message, "package impl is declared in module m1x, which does not open it");
        assert_eq!(diag.help.as_deref(), Some("use --add-opens m1x/impl=m2x"));
    }

    #[test]
    fn test_reason_kinds_are_errors() {
        for reason in [
            DenialReason::NotExported,
            DenialReason::NotExportedToThisModule,
            DenialReason::DoesNotRead,
            DenialReason::DoesNotReadUnnamed,
            DenialReason::DoesNotReadFromUnnamed,
            DenialReason::NotExportedFromUnnamed,
            DenialReason::NotExportedToThisModuleFromUnnamed,
            DenialReason::PackageEmptyOrNotFound,
        ] {
            assert_eq!(
                reason.diagnostic_kind().default_level(),
                crate::diagnostic::DiagnosticLevel::Error
            );
        }
    }
}
