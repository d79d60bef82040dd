//! Module graph resolution
//!
//! Computes the root set, restricts the observable universe with
//! `--limit-modules`, takes the breadth-first closure over `requires` edges
//! and rejects cycles among declared `requires`.

pub mod cycles;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::location::Location;
use crate::name::{ModuleId, ALL_MODULE_PATH};
use crate::options::{ModuleOptions, RootToken, ADD_MODULES, LIMIT_MODULES};
use crate::table::{ModuleEntry, ModuleTable};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, trace};

pub use cycles::{find_cycles, CycleReport, CyclicEdge};

/// Resolution state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleState {
    /// Known to the table but outside the observable universe
    Undiscovered,
    /// Observable but not reached from the root set
    Discovered,
    /// Reached from the root set, not yet checked for cycles
    InClosure,
    Resolved,
    /// Part of a cycle of declared `requires`
    CycleError,
}

impl ModuleState {
    pub fn in_closure(self) -> bool {
        matches!(
            self,
            ModuleState::InClosure | ModuleState::Resolved | ModuleState::CycleError
        )
    }
}

/// The modules of the resolved graph
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedModuleSet {
    states: BTreeMap<ModuleId, ModuleState>,
    roots: BTreeSet<ModuleId>,
    /// Closure members in the order they were reached
    order: Vec<ModuleId>,
    /// `(module, target)` pairs that came from `requires static`
    static_edges: BTreeSet<(ModuleId, ModuleId)>,
}

impl ResolvedModuleSet {
    /// Whether `module` is part of the resolved graph
    ///
    /// The unnamed module is always resolved.
    pub fn contains(&self, module: &ModuleId) -> bool {
        module.is_unnamed() || self.state(module.as_str()).is_some_and(ModuleState::in_closure)
    }

    pub fn state(&self, module: &str) -> Option<ModuleState> {
        self.states.get(module).copied()
    }

    pub fn roots(&self) -> &BTreeSet<ModuleId> {
        &self.roots
    }

    /// Named modules of the graph, in closure order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.order.iter()
    }

    /// Named modules of the graph, sorted by name
    pub fn sorted(&self) -> BTreeSet<&ModuleId> {
        self.order.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether `module` reaches `target` only through `requires static`
    pub fn is_static_edge(&self, module: &ModuleId, target: &ModuleId) -> bool {
        self.static_edges
            .contains(&(module.clone(), target.clone()))
    }

    /// Modules whose state is [`ModuleState::CycleError`]
    pub fn cyclic(&self) -> impl Iterator<Item = &ModuleId> {
        self.states
            .iter()
            .filter(|(_, s)| **s == ModuleState::CycleError)
            .map(|(m, _)| m)
    }
}

/// Module graph resolver
pub struct Resolver<'a> {
    table: &'a ModuleTable,
    options: &'a ModuleOptions,
    explicit_roots: Vec<ModuleId>,
    states: BTreeMap<ModuleId, ModuleState>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver for the given compilation roots
    ///
    /// `explicit_roots` are the modules being compiled; an empty list means
    /// code in the unnamed module is being compiled.
    pub fn new(table: &'a ModuleTable, options: &'a ModuleOptions, explicit_roots: Vec<ModuleId>) -> Self {
        let states = table
            .names()
            .map(|m| (m.clone(), ModuleState::Undiscovered))
            .collect();
        Self {
            table,
            options,
            explicit_roots,
            states,
            diagnostics: Vec::new(),
        }
    }

    /// Resolve the module graph
    pub fn resolve(mut self) -> (ResolvedModuleSet, Vec<Diagnostic>) {
        self.discover();
        let roots = self.root_set();
        debug!(roots = roots.len(), "computed root set");

        let (order, static_edges) = self.closure(&roots);
        let members: BTreeSet<ModuleId> = order.iter().cloned().collect();
        self.check_cycles(&members);

        debug!(
            modules = order.len(),
            errors = self.diagnostics.len(),
            "module graph resolved"
        );
        let resolved = ResolvedModuleSet {
            states: self.states,
            roots,
            order,
            static_edges,
        };
        (resolved, self.diagnostics)
    }

    fn is_observable(&self, module: &str) -> bool {
        self.states
            .get(module)
            .is_some_and(|s| *s != ModuleState::Undiscovered)
    }

    fn set_state(&mut self, module: &ModuleId, state: ModuleState) {
        if let Some(current) = self.states.get_mut(module) {
            trace!(%module, from = ?current, to = ?state, "state change");
            *current = state;
        }
    }

    /// Mark the observable universe as discovered
    fn discover(&mut self) {
        if self.options.limit_modules.is_empty() {
            for state in self.states.values_mut() {
                *state = ModuleState::Discovered;
            }
            return;
        }

        let mut universe = BTreeSet::new();
        let mut queue = VecDeque::new();
        for name in &self.options.limit_modules {
            if self.table.contains(name.as_str()) {
                queue.push_back(name.clone());
            } else {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::ModuleForOptionNotFound,
                        format!("module for option {} not found: {}", LIMIT_MODULES, name),
                        Location::option(LIMIT_MODULES),
                    )
                    .with_option(LIMIT_MODULES)
                    .with_module(name.as_str()),
                );
            }
        }
        while let Some(module) = queue.pop_front() {
            if !universe.insert(module.clone()) {
                continue;
            }
            if let Some(entry) = self.table.get(module.as_str()) {
                for requires in &entry.descriptor.requires {
                    if self.table.contains(requires.target.as_str()) {
                        queue.push_back(requires.target.clone());
                    }
                }
            }
        }

        universe.extend(self.explicit_roots.iter().cloned());
        universe.extend(self.options.added_module_names().cloned());
        universe.insert(self.table.base_module().clone());

        for module in universe {
            self.set_state(&module, ModuleState::Discovered);
        }
    }

    fn observable<'t>(&self, entries: impl Iterator<Item = &'t ModuleEntry>) -> Vec<ModuleId> {
        entries
            .filter(|e| self.is_observable(e.name().as_str()))
            .map(|e| e.name().clone())
            .collect()
    }

    /// System modules that export at least one package to everyone
    fn default_roots(&self) -> Vec<ModuleId> {
        self.observable(
            self.table
                .system_modules()
                .filter(|e| e.descriptor.exports.values().any(|g| !g.is_qualified())),
        )
    }

    fn root_set(&mut self) -> BTreeSet<ModuleId> {
        let mut roots = BTreeSet::new();

        for root in &self.explicit_roots {
            if self.table.contains(root.as_str()) {
                roots.insert(root.clone());
            } else {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::ModuleNotFound,
                        format!("module not found: {}", root),
                        Location::unknown(),
                    )
                    .with_module(root.as_str()),
                );
            }
        }
        if self.explicit_roots.is_empty() {
            roots.extend(self.default_roots());
        }

        for token in &self.options.add_modules {
            match token {
                RootToken::AllSystem => roots.extend(self.observable(self.table.system_modules())),
                RootToken::AllDefault => roots.extend(self.default_roots()),
                RootToken::AllModulePath => {
                    if self.table.is_multi_module() {
                        self.diagnostics.push(
                            Diagnostic::new(
                                DiagnosticKind::AllModulePathInvalid,
                                format!("{} invalid with this option combination", ALL_MODULE_PATH),
                                Location::option(ADD_MODULES),
                            )
                            .with_option(ADD_MODULES),
                        );
                    } else {
                        roots.extend(self.observable(self.table.module_path_modules()));
                    }
                }
                RootToken::Module(name) => {
                    if self.is_observable(name.as_str()) {
                        roots.insert(name.clone());
                    } else {
                        self.diagnostics.push(
                            Diagnostic::new(
                                DiagnosticKind::ModuleForOptionNotFound,
                                format!("module for option {} not found: {}", ADD_MODULES, name),
                                Location::option(ADD_MODULES),
                            )
                            .with_option(ADD_MODULES)
                            .with_module(name.as_str()),
                        );
                    }
                }
            }
        }

        let base = self.table.base_module().clone();
        if self.is_observable(base.as_str()) {
            roots.insert(base);
        }
        roots
    }

    /// Breadth-first closure over every `requires` edge
    fn closure(&mut self, roots: &BTreeSet<ModuleId>) -> (Vec<ModuleId>, BTreeSet<(ModuleId, ModuleId)>) {
        let table = self.table;
        let mut order = Vec::new();
        let mut seen: BTreeSet<ModuleId> = BTreeSet::new();
        let mut static_edges = BTreeSet::new();
        let mut queue: VecDeque<ModuleId> = roots.iter().cloned().collect();
        let mut automatic_reached = false;

        loop {
            while let Some(module) = queue.pop_front() {
                if !seen.insert(module.clone()) {
                    continue;
                }
                self.set_state(&module, ModuleState::InClosure);
                order.push(module.clone());

                let Some(entry) = table.get(module.as_str()) else {
                    continue;
                };
                automatic_reached |= entry.is_automatic();
                for requires in &entry.descriptor.requires {
                    let target = &requires.target;
                    if !self.is_observable(target.as_str()) {
                        self.diagnostics.push(
                            Diagnostic::new(
                                DiagnosticKind::ModuleNotFound,
                                format!("module not found: {}", target),
                                requires.location.clone(),
                            )
                            .with_module(module.as_str())
                            .with_other_module(target.as_str()),
                        );
                        continue;
                    }
                    trace!(%module, %target, "requires edge");
                    if requires.is_static {
                        static_edges.insert((module.clone(), target.clone()));
                    }
                    if !seen.contains(target) {
                        queue.push_back(target.clone());
                    }
                }
            }

            if !automatic_reached {
                break;
            }
            let pending: Vec<ModuleId> = self
                .observable(table.automatic_modules())
                .into_iter()
                .filter(|m| !seen.contains(m))
                .collect();
            if pending.is_empty() {
                break;
            }
            debug!(count = pending.len(), "adding observable automatic modules");
            queue.extend(pending);
        }

        (order, static_edges)
    }

    fn check_cycles(&mut self, members: &BTreeSet<ModuleId>) {
        let report = find_cycles(self.table, members);
        for edge in &report.edges {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::CyclicRequires,
                    format!("cyclic requires: {}", edge.requires.target),
                    edge.requires.location.clone(),
                )
                .with_module(edge.from.as_str())
                .with_other_module(edge.requires.target.as_str()),
            );
        }
        for module in members {
            let state = if report.modules.contains(module) {
                ModuleState::CycleError
            } else {
                ModuleState::Resolved
            };
            self.set_state(module, state);
        }
    }
}

/// Resolve the module graph of `table`
pub fn resolve(
    table: &ModuleTable,
    options: &ModuleOptions,
    explicit_roots: Vec<ModuleId>,
) -> (ResolvedModuleSet, Vec<Diagnostic>) {
    Resolver::new(table, options, explicit_roots).resolve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::{DescriptorBuilder, Requires};
    use crate::options::RawOptions;

    fn base() -> crate::directive::ModuleDescriptor {
        DescriptorBuilder::system("java.base")
            .packages(["java.lang"])
            .exports("java.lang")
            .build()
            .unwrap()
    }

    fn names(resolved: &ResolvedModuleSet) -> Vec<&str> {
        resolved.sorted().into_iter().map(ModuleId::as_str).collect()
    }

    #[test]
    fn test_closure_follows_all_modifiers() {
        let mut builder = ModuleTable::builder();
        builder
            .add_system(base())
            .add_source(
                DescriptorBuilder::new("app")
                    .requires(Requires::new("lib").transitive())
                    .requires(Requires::new("opt").with_static()),
                "src/app",
            )
            .add_module_path(DescriptorBuilder::new("lib").build().unwrap(), "mods/lib.jar")
            .add_module_path(DescriptorBuilder::new("opt").build().unwrap(), "mods/opt.jar")
            .add_module_path(DescriptorBuilder::new("unused").build().unwrap(), "mods/unused.jar");
        let (table, _) = builder.build();
        let options = ModuleOptions::default();

        let (resolved, diagnostics) = resolve(&table, &options, vec!["app".into()]);

        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(names(&resolved), vec!["app", "java.base", "lib", "opt"]);
        assert_eq!(resolved.state("unused"), Some(ModuleState::Discovered));
        assert_eq!(resolved.state("app"), Some(ModuleState::Resolved));
        assert!(resolved.is_static_edge(&"app".into(), &"opt".into()));
        assert!(!resolved.is_static_edge(&"app".into(), &"lib".into()));
    }

    #[test]
    fn test_missing_module_reported_at_requires() {
        let mut builder = ModuleTable::builder();
        builder.add_source(
            DescriptorBuilder::new("app")
                .requires(Requires::new("gone").at(Location::new("src/app/module-info.java", 2, 5))),
            "src/app",
        );
        let (table, _) = builder.build();
        let options = ModuleOptions::default();

        let (_, diagnostics) = resolve(&table, &options, vec!["app".into()]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::ModuleNotFound);
        assert_eq!(diagnostics[0].message, "module not found: gone");
        assert_eq!(diagnostics[0].location.line, 2);
    }

    #[test]
    fn test_default_roots_for_unnamed_compilation() {
        let mut builder = ModuleTable::builder();
        builder
            .add_system(base())
            .add_system(DescriptorBuilder::system("jdk.internal").packages(["jdk.internal.x"]).exports_to("jdk.internal.x", ["java.base"]).build().unwrap());
        let (table, _) = builder.build();
        let options = ModuleOptions::default();

        let (resolved, _) = resolve(&table, &options, Vec::new());
        assert_eq!(names(&resolved), vec!["java.base"]);
    }

    #[test]
    fn test_all_module_path_invalid_in_multi_module_mode() {
        let mut builder = ModuleTable::builder();
        builder.multi_module(true).add_source(DescriptorBuilder::new("m1x"), "src/m1x");
        let (table, _) = builder.build();
        let (options, _) = ModuleOptions::parse(
            &RawOptions {
                add_modules: vec!["ALL-MODULE-PATH".into()],
                ..RawOptions::default()
            },
            true,
        );

        let (_, diagnostics) = resolve(&table, &options, vec!["m1x".into()]);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::AllModulePathInvalid);
        assert!(diagnostics[0].is_error());
    }

    #[test]
    fn test_automatic_modules_enter_together() {
        let mut builder = ModuleTable::builder();
        builder
            .add_source(DescriptorBuilder::new("app").requires(Requires::new("auto.one")), "src/app")
            .add_automatic("mods/auto-one-1.0.jar", None, ["auto.one"])
            .add_automatic("mods/auto-two.jar", None, ["auto.two"]);
        let (table, _) = builder.build();
        let options = ModuleOptions::default();

        let (resolved, diagnostics) = resolve(&table, &options, vec!["app".into()]);
        assert!(diagnostics.is_empty());
        assert_eq!(names(&resolved), vec!["app", "auto.one", "auto.two"]);
    }
}
