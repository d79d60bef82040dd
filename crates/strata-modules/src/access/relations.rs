//! Readability, exports and opens relations
//!
//! Computed once from the frozen table, the resolved set and the option
//! overlay. Nothing here changes after [`Relations::compute`] returns.

use crate::diagnostic::{Diagnostic, DiagnosticKind, RelatedLocation};
use crate::directive::{GrantKind, ModuleDescriptor};
use crate::name::ModuleId;
use crate::options::OptionOverlay;
use crate::resolver::ResolvedModuleSet;
use crate::table::ModuleTable;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Audience of an exported or opened package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "targets", rename_all = "kebab-case")]
pub enum Grant {
    Unqualified,
    QualifiedTo(BTreeSet<ModuleId>),
}

impl Grant {
    pub fn permits(&self, reader: &ModuleId) -> bool {
        match self {
            Grant::Unqualified => true,
            Grant::QualifiedTo(targets) => targets.contains(reader),
        }
    }

    /// Widen the audience; an unqualified grant stays unqualified
    pub fn extend<'a>(&mut self, targets: impl IntoIterator<Item = &'a ModuleId>) {
        if let Grant::QualifiedTo(existing) = self {
            existing.extend(targets.into_iter().cloned());
        }
    }

    pub fn is_qualified(&self) -> bool {
        matches!(self, Grant::QualifiedTo(_))
    }
}

/// (module, package) → grant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PackageRelation {
    grants: BTreeMap<ModuleId, BTreeMap<String, Grant>>,
}

impl PackageRelation {
    pub fn get(&self, module: &ModuleId, package: &str) -> Option<&Grant> {
        self.grants.get(module).and_then(|p| p.get(package))
    }

    /// Whether `module` grants `package` to `reader`
    pub fn permits(&self, module: &ModuleId, package: &str, reader: &ModuleId) -> bool {
        self.get(module, package).is_some_and(|g| g.permits(reader))
    }

    /// Packages of `module` with their grants
    pub fn packages_of(&self, module: &ModuleId) -> impl Iterator<Item = (&String, &Grant)> {
        self.grants.get(module).into_iter().flatten()
    }

    fn insert(&mut self, module: &ModuleId, package: &str, grant: Grant) {
        self.grants
            .entry(module.clone())
            .or_default()
            .insert(package.to_string(), grant);
    }

    fn add_targets(&mut self, module: &ModuleId, package: &str, targets: &BTreeSet<ModuleId>) {
        self.grants
            .entry(module.clone())
            .or_default()
            .entry(package.to_string())
            .and_modify(|g| g.extend(targets))
            .or_insert_with(|| Grant::QualifiedTo(targets.clone()));
    }
}

/// (reader, readee) pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReadabilityRelation {
    reads: BTreeMap<ModuleId, BTreeSet<ModuleId>>,
}

impl ReadabilityRelation {
    pub fn reads(&self, reader: &ModuleId, readee: &ModuleId) -> bool {
        self.reads.get(reader).is_some_and(|r| r.contains(readee))
    }

    /// Modules `reader` reads
    pub fn readees(&self, reader: &ModuleId) -> impl Iterator<Item = &ModuleId> {
        self.reads.get(reader).into_iter().flatten()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&ModuleId, &ModuleId)> {
        self.reads
            .iter()
            .flat_map(|(reader, readees)| readees.iter().map(move |r| (reader, r)))
    }

    pub fn len(&self) -> usize {
        self.reads.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The three relations of a resolved module graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Relations {
    pub readability: ReadabilityRelation,
    pub exports: PackageRelation,
    pub opens: PackageRelation,
}

impl Relations {
    /// Compute readability, exports and opens
    ///
    /// Also reports packages a module reads from two different modules.
    pub fn compute(
        table: &ModuleTable,
        resolved: &ResolvedModuleSet,
        overlay: &OptionOverlay,
    ) -> (Relations, Vec<Diagnostic>) {
        let engine = Engine::new(table, resolved);
        let mut relations = Relations {
            readability: engine.readability(overlay),
            exports: engine.package_relation(GrantKind::Exports),
            opens: engine.package_relation(GrantKind::Opens),
        };
        for (module, package, targets) in overlay.grants(GrantKind::Exports) {
            relations.exports.add_targets(module, package, targets);
        }
        for (module, package, targets) in overlay.grants(GrantKind::Opens) {
            relations.opens.add_targets(module, package, targets);
        }

        let diagnostics = engine.package_clashes(&relations);
        debug!(
            reads = relations.readability.len(),
            clashes = diagnostics.len(),
            "relations computed"
        );
        (relations, diagnostics)
    }

    pub fn package_relation(&self, kind: GrantKind) -> &PackageRelation {
        match kind {
            GrantKind::Exports => &self.exports,
            GrantKind::Opens => &self.opens,
        }
    }
}

struct Engine<'a> {
    table: &'a ModuleTable,
    resolved: &'a ResolvedModuleSet,
    modules: Vec<&'a ModuleDescriptor>,
    automatic: BTreeSet<ModuleId>,
}

impl<'a> Engine<'a> {
    fn new(table: &'a ModuleTable, resolved: &'a ResolvedModuleSet) -> Self {
        let modules: Vec<&ModuleDescriptor> = resolved
            .sorted()
            .into_iter()
            .filter_map(|m| table.descriptor(m))
            .collect();
        let automatic = modules
            .iter()
            .filter(|d| d.is_automatic())
            .map(|d| d.name.clone())
            .collect();
        Self {
            table,
            resolved,
            modules,
            automatic,
        }
    }

    /// Declared targets plus everything implied through `requires transitive`
    fn implied_reads(&self, module: &ModuleDescriptor) -> BTreeSet<ModuleId> {
        let mut reads = BTreeSet::new();
        let mut stack: Vec<ModuleId> = module
            .requires
            .iter()
            .map(|r| r.target.clone())
            .filter(|t| self.resolved.contains(t))
            .collect();

        while let Some(next) = stack.pop() {
            if !reads.insert(next.clone()) {
                continue;
            }
            let Some(descriptor) = self.table.descriptor(&next) else {
                continue;
            };
            if descriptor.is_automatic() {
                stack.extend(self.automatic.iter().cloned());
                continue;
            }
            stack.extend(
                descriptor
                    .requires
                    .iter()
                    .filter(|r| r.transitive && self.resolved.contains(&r.target))
                    .map(|r| r.target.clone()),
            );
        }
        reads
    }

    fn readability(&self, overlay: &OptionOverlay) -> ReadabilityRelation {
        let base = self.table.base_module();
        let base_resolved = self.resolved.contains(base);
        let all_named: BTreeSet<ModuleId> = self.modules.iter().map(|d| d.name.clone()).collect();
        let mut relation = ReadabilityRelation::default();

        for module in &self.modules {
            let mut reads = if module.is_automatic() {
                let mut reads = all_named.clone();
                reads.insert(ModuleId::unnamed());
                reads
            } else {
                self.implied_reads(module)
            };
            if base_resolved {
                reads.insert(base.clone());
            }
            reads.remove(&module.name);
            reads.extend(overlay.reads_of(&module.name).cloned());
            trace!(module = %module.name, reads = reads.len(), "readability");
            relation.reads.insert(module.name.clone(), reads);
        }

        relation.reads.insert(ModuleId::unnamed(), all_named);
        relation
    }

    fn package_relation(&self, kind: GrantKind) -> PackageRelation {
        let mut relation = PackageRelation::default();
        for module in &self.modules {
            if kind == GrantKind::Opens && module.open {
                for package in &module.packages {
                    relation.insert(&module.name, package, Grant::Unqualified);
                }
                continue;
            }
            for (package, grant) in module.grants(kind) {
                let grant = match &grant.targets {
                    None => Grant::Unqualified,
                    Some(targets) => Grant::QualifiedTo(targets.clone()),
                };
                relation.insert(&module.name, package, grant);
            }
        }
        relation
    }

    /// Modules that read one package from two different modules
    fn package_clashes(&self, relations: &Relations) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for module in self.modules.iter().filter(|d| !d.is_automatic()) {
            let mut sources: BTreeMap<&str, &ModuleId> = module
                .packages
                .iter()
                .map(|p| (p.as_str(), &module.name))
                .collect();
            let mut reported = BTreeSet::new();

            for readee in relations.readability.readees(&module.name) {
                if readee.is_unnamed() || readee == &module.name {
                    continue;
                }
                for (package, grant) in relations.exports.packages_of(readee) {
                    if !grant.permits(&module.name) {
                        continue;
                    }
                    match sources.get(package.as_str()) {
                        Some(&first) if first != readee => {
                            if reported.insert(package.as_str()) {
                                diagnostics.push(clash(module, package, first, readee, self.table));
                            }
                        }
                        Some(_) => {}
                        None => {
                            sources.insert(package.as_str(), readee);
                        }
                    }
                }
            }
        }
        diagnostics
    }
}

fn clash(
    module: &ModuleDescriptor,
    package: &str,
    first: &ModuleId,
    second: &ModuleId,
    table: &ModuleTable,
) -> Diagnostic {
    let mut diag = Diagnostic::new(
        DiagnosticKind::PackageClash,
        format!(
            "module {} reads package {} from both {} and {}",
            module.name, package, first, second
        ),
        module.location.clone(),
    )
    .with_module(module.name.as_str())
    .with_other_module(second.as_str())
    .with_package(package);
    if let Some(other) = table.descriptor(second) {
        diag = diag.with_related_location(RelatedLocation {
            location: other.location.clone(),
            message: format!("{} declared here", other.name),
        });
    }
    diag
}
