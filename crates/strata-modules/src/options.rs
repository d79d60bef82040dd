//! Module options
//!
//! Two phases. [`ModuleOptions::parse`] checks the raw values of the module
//! options before the table exists; malformed values are errors, bad names are
//! warnings that drop the affected entry. [`OptionOverlay::apply`] runs after
//! resolution and turns the parsed grants into extra reads, exports and opens
//! layered on top of the declared directives.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::directive::GrantKind;
use crate::location::Location;
use crate::name::{
    is_valid_module_name, is_valid_package_name, ModuleId, ALL_DEFAULT, ALL_MODULE_PATH,
    ALL_SYSTEM, ALL_UNNAMED,
};
use crate::resolver::ResolvedModuleSet;
use crate::table::{ModuleTable, Patch};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, trace};

pub const ADD_READS: &str = "--add-reads";
pub const ADD_EXPORTS: &str = "--add-exports";
pub const ADD_OPENS: &str = "--add-opens";
pub const ADD_MODULES: &str = "--add-modules";
pub const LIMIT_MODULES: &str = "--limit-modules";
pub const PATCH_MODULE: &str = "--patch-module";
pub const DEFAULT_MODULE_FOR_CREATED_FILES: &str = "--default-module-for-created-files";

/// Raw option values, one entry per occurrence on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOptions {
    pub add_reads: Vec<String>,
    pub add_exports: Vec<String>,
    pub add_opens: Vec<String>,
    pub add_modules: Vec<String>,
    pub limit_modules: Vec<String>,
    pub patch_module: Vec<String>,
    pub default_module_for_created_files: Option<String>,
}

/// A token of `--add-modules`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RootToken {
    AllSystem,
    AllModulePath,
    AllDefault,
    Module(ModuleId),
}

/// Accumulated `--add-reads` grants for one source module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadsOption {
    pub source: ModuleId,
    /// Readees; the unnamed module stands for `ALL-UNNAMED`
    pub targets: BTreeSet<ModuleId>,
    pub location: Location,
}

/// Accumulated `--add-exports`/`--add-opens` grants for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOption {
    pub source: ModuleId,
    pub package: String,
    pub targets: BTreeSet<ModuleId>,
    pub location: Location,
}

/// Validated module options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleOptions {
    pub add_reads: BTreeMap<ModuleId, ReadsOption>,
    pub add_exports: BTreeMap<(ModuleId, String), PackageOption>,
    pub add_opens: BTreeMap<(ModuleId, String), PackageOption>,
    /// `--add-modules` tokens in first-seen order, without repeats
    pub add_modules: Vec<RootToken>,
    pub limit_modules: BTreeSet<ModuleId>,
    pub patches: Vec<Patch>,
    pub default_module: Option<ModuleId>,
}

impl ModuleOptions {
    /// Validate raw option values
    pub fn parse(raw: &RawOptions, multi_module: bool) -> (ModuleOptions, Vec<Diagnostic>) {
        let mut parser = OptionParser::default();

        for value in &raw.add_reads {
            parser.add_reads(value);
        }
        for value in &raw.add_exports {
            parser.add_package(GrantKind::Exports, value);
        }
        for value in &raw.add_opens {
            parser.add_package(GrantKind::Opens, value);
        }
        for value in &raw.add_modules {
            parser.add_modules(value);
        }
        for value in &raw.limit_modules {
            parser.limit_modules(value);
        }
        for value in &raw.patch_module {
            parser.patch_module(value);
        }
        if let Some(value) = &raw.default_module_for_created_files {
            parser.default_module(value, multi_module);
        }

        debug!(
            reads = parser.options.add_reads.len(),
            exports = parser.options.add_exports.len(),
            opens = parser.options.add_opens.len(),
            diagnostics = parser.diagnostics.len(),
            "parsed module options"
        );
        (parser.options, parser.diagnostics)
    }

    /// Module names given to `--add-modules`
    pub fn added_module_names(&self) -> impl Iterator<Item = &ModuleId> {
        self.add_modules.iter().filter_map(|t| match t {
            RootToken::Module(m) => Some(m),
            _ => None,
        })
    }

    pub fn package_options(&self, kind: GrantKind) -> &BTreeMap<(ModuleId, String), PackageOption> {
        match kind {
            GrantKind::Exports => &self.add_exports,
            GrantKind::Opens => &self.add_opens,
        }
    }
}

fn option_name(kind: GrantKind) -> &'static str {
    match kind {
        GrantKind::Exports => ADD_EXPORTS,
        GrantKind::Opens => ADD_OPENS,
    }
}

fn no_value(option: &str) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::NoValueForOption,
        format!("no value for {} option", option),
        Location::option(option),
    )
    .with_option(option)
}

fn bad_value(option: &str, value: &str) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::BadValueForOption,
        format!("bad value for {} option: '{}'", option, value),
        Location::option(option),
    )
    .with_option(option)
}

fn bad_name(option: &str, name: &str) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::BadNameForOption,
        format!("bad name in value for {} option: '{}'", option, name),
        Location::option(option),
    )
    .with_option(option)
}

/// Non-empty, trimmed items of a comma separated list
fn list_items(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|item| !item.is_empty())
}

#[derive(Default)]
struct OptionParser {
    options: ModuleOptions,
    diagnostics: Vec<Diagnostic>,
}

impl OptionParser {
    /// Parse a `t1,t2` target list; `None` when the list has no items at all
    fn targets(&mut self, option: &str, list: &str) -> Option<BTreeSet<ModuleId>> {
        let items: Vec<&str> = list_items(list).collect();
        if items.is_empty() {
            return None;
        }
        let mut targets = BTreeSet::new();
        for item in items {
            if item == ALL_UNNAMED {
                targets.insert(ModuleId::unnamed());
            } else if is_valid_module_name(item) {
                targets.insert(ModuleId::new(item));
            } else {
                self.diagnostics.push(bad_name(option, item));
            }
        }
        Some(targets)
    }

    fn add_reads(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.diagnostics.push(no_value(ADD_READS));
            return;
        }
        let Some((source, list)) = value.split_once('=') else {
            self.diagnostics.push(bad_value(ADD_READS, value));
            return;
        };
        let source = source.trim();
        if source.is_empty() {
            self.diagnostics.push(bad_value(ADD_READS, value));
            return;
        }
        let Some(targets) = self.targets(ADD_READS, list) else {
            self.diagnostics.push(bad_value(ADD_READS, value));
            return;
        };
        if !is_valid_module_name(source) {
            self.diagnostics.push(bad_name(ADD_READS, source));
            return;
        }

        let source = ModuleId::new(source);
        trace!(%source, targets = targets.len(), "add-reads");
        self.options
            .add_reads
            .entry(source.clone())
            .or_insert_with(|| ReadsOption {
                source,
                targets: BTreeSet::new(),
                location: Location::option(ADD_READS),
            })
            .targets
            .extend(targets);
    }

    fn add_package(&mut self, kind: GrantKind, value: &str) {
        let option = option_name(kind);
        let value = value.trim();
        if value.is_empty() {
            self.diagnostics.push(no_value(option));
            return;
        }
        let Some((left, list)) = value.split_once('=') else {
            self.diagnostics.push(bad_value(option, value));
            return;
        };
        let Some((source, package)) = left.split_once('/') else {
            self.diagnostics.push(bad_value(option, value));
            return;
        };
        let (source, package) = (source.trim(), package.trim());
        if source.is_empty() || package.is_empty() {
            self.diagnostics.push(bad_value(option, value));
            return;
        }
        let Some(targets) = self.targets(option, list) else {
            self.diagnostics.push(bad_value(option, value));
            return;
        };
        if !is_valid_module_name(source) {
            self.diagnostics.push(bad_name(option, source));
            return;
        }
        if !is_valid_package_name(package) {
            self.diagnostics.push(bad_name(option, package));
            return;
        }

        let source = ModuleId::new(source);
        let grants = match kind {
            GrantKind::Exports => &mut self.options.add_exports,
            GrantKind::Opens => &mut self.options.add_opens,
        };
        trace!(%source, package, targets = targets.len(), option, "package grant");
        grants
            .entry((source.clone(), package.to_string()))
            .or_insert_with(|| PackageOption {
                source,
                package: package.to_string(),
                targets: BTreeSet::new(),
                location: Location::option(option),
            })
            .targets
            .extend(targets);
    }

    fn add_modules(&mut self, value: &str) {
        if value.trim().is_empty() {
            self.diagnostics.push(no_value(ADD_MODULES));
            return;
        }
        let mut any = false;
        for item in list_items(value) {
            any = true;
            let token = match item {
                ALL_SYSTEM => RootToken::AllSystem,
                ALL_MODULE_PATH => RootToken::AllModulePath,
                ALL_DEFAULT => RootToken::AllDefault,
                name if is_valid_module_name(name) => RootToken::Module(ModuleId::new(name)),
                name => {
                    self.diagnostics.push(bad_name(ADD_MODULES, name));
                    continue;
                }
            };
            if !self.options.add_modules.contains(&token) {
                self.options.add_modules.push(token);
            }
        }
        if !any {
            self.diagnostics.push(bad_value(ADD_MODULES, value));
        }
    }

    fn limit_modules(&mut self, value: &str) {
        if value.trim().is_empty() {
            self.diagnostics.push(no_value(LIMIT_MODULES));
            return;
        }
        let mut any = false;
        for item in list_items(value) {
            any = true;
            if is_valid_module_name(item) {
                self.options.limit_modules.insert(ModuleId::new(item));
            } else {
                self.diagnostics.push(bad_name(LIMIT_MODULES, item));
            }
        }
        if !any {
            self.diagnostics.push(bad_value(LIMIT_MODULES, value));
        }
    }

    fn patch_module(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.diagnostics.push(no_value(PATCH_MODULE));
            return;
        }
        let Some((module, paths)) = value.split_once('=') else {
            self.diagnostics.push(bad_value(PATCH_MODULE, value));
            return;
        };
        let module = module.trim();
        let roots: Vec<PathBuf> = std::env::split_paths(paths)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        if module.is_empty() || roots.is_empty() {
            self.diagnostics.push(bad_value(PATCH_MODULE, value));
            return;
        }
        if !is_valid_module_name(module) {
            self.diagnostics.push(bad_name(PATCH_MODULE, module));
            return;
        }
        if self.options.patches.iter().any(|p| p.module.as_str() == module) {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::DuplicatePatch,
                    format!("module {} is patched more than once", module),
                    Location::option(PATCH_MODULE),
                )
                .with_option(PATCH_MODULE)
                .with_module(module),
            );
            return;
        }
        self.options.patches.push(Patch {
            module: ModuleId::new(module),
            roots,
            location: Location::option(PATCH_MODULE),
        });
    }

    fn default_module(&mut self, value: &str, multi_module: bool) {
        let option = DEFAULT_MODULE_FOR_CREATED_FILES;
        let value = value.trim();
        if value.is_empty() {
            self.diagnostics.push(no_value(option));
            return;
        }
        if !is_valid_module_name(value) {
            self.diagnostics.push(bad_value(option, value));
            return;
        }
        if !multi_module {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::OptionIgnored,
                    format!("{} option ignored outside multi-module mode", option),
                    Location::option(option),
                )
                .with_option(option),
            );
            return;
        }
        self.options.default_module = Some(ModuleId::new(value));
    }
}

/// Grants from command-line options, resolved against the module graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionOverlay {
    reads: BTreeMap<ModuleId, BTreeSet<ModuleId>>,
    exports: BTreeMap<ModuleId, BTreeMap<String, BTreeSet<ModuleId>>>,
    opens: BTreeMap<ModuleId, BTreeMap<String, BTreeSet<ModuleId>>>,
}

impl OptionOverlay {
    /// Keep the grants whose modules were resolved
    ///
    /// Well-formed names that are not part of the resolved graph are reported
    /// as warnings and their grants dropped.
    pub fn apply(
        table: &ModuleTable,
        resolved: &ResolvedModuleSet,
        options: &ModuleOptions,
    ) -> (OptionOverlay, Vec<Diagnostic>) {
        let mut overlay = OptionOverlay::default();
        let mut diagnostics = Vec::new();

        let mut check = |option: &str, module: &ModuleId, location: &Location| -> bool {
            if resolved.contains(module) {
                return true;
            }
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::ModuleForOptionNotFound,
                    format!("module for option {} not found: {}", option, module),
                    location.clone(),
                )
                .with_option(option)
                .with_module(module.as_str()),
            );
            false
        };

        for grant in options.add_reads.values() {
            if !check(ADD_READS, &grant.source, &grant.location) {
                continue;
            }
            for target in &grant.targets {
                if check(ADD_READS, target, &grant.location) {
                    overlay
                        .reads
                        .entry(grant.source.clone())
                        .or_default()
                        .insert(target.clone());
                }
            }
        }

        for kind in [GrantKind::Exports, GrantKind::Opens] {
            let option = option_name(kind);
            for grant in options.package_options(kind).values() {
                if !check(option, &grant.source, &grant.location) {
                    continue;
                }
                for target in &grant.targets {
                    if check(option, target, &grant.location) {
                        let grants = match kind {
                            GrantKind::Exports => &mut overlay.exports,
                            GrantKind::Opens => &mut overlay.opens,
                        };
                        grants
                            .entry(grant.source.clone())
                            .or_default()
                            .entry(grant.package.clone())
                            .or_default()
                            .insert(target.clone());
                    }
                }
            }
        }

        if let Some(module) = &options.default_module {
            let is_source = table.get(module.as_str()).is_some_and(|e| e.is_source());
            if !is_source {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::ModuleForOptionNotFound,
                        format!(
                            "module for option {} not found on the module-source-path: {}",
                            DEFAULT_MODULE_FOR_CREATED_FILES, module
                        ),
                        Location::option(DEFAULT_MODULE_FOR_CREATED_FILES),
                    )
                    .with_option(DEFAULT_MODULE_FOR_CREATED_FILES)
                    .with_module(module.as_str()),
                );
            }
        }

        debug!(
            reads = overlay.reads.values().map(BTreeSet::len).sum::<usize>(),
            warnings = diagnostics.len(),
            "option overlay applied"
        );
        (overlay, diagnostics)
    }

    /// Extra readees granted to `reader`
    pub fn reads_of(&self, reader: &ModuleId) -> impl Iterator<Item = &ModuleId> {
        self.reads.get(reader).into_iter().flatten()
    }

    /// Every `(reader, readee)` pair added by `--add-reads`
    pub fn reads(&self) -> impl Iterator<Item = (&ModuleId, &ModuleId)> {
        self.reads
            .iter()
            .flat_map(|(source, targets)| targets.iter().map(move |t| (source, t)))
    }

    /// Every `(module, package, targets)` added by `--add-exports` or `--add-opens`
    pub fn grants(
        &self,
        kind: GrantKind,
    ) -> impl Iterator<Item = (&ModuleId, &String, &BTreeSet<ModuleId>)> {
        let grants = match kind {
            GrantKind::Exports => &self.exports,
            GrantKind::Opens => &self.opens,
        };
        grants.iter().flat_map(|(module, packages)| {
            packages
                .iter()
                .map(move |(package, targets)| (module, package, targets))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.exports.is_empty() && self.opens.is_empty()
    }
}
