//! Graph inputs from a strata.toml project
//!
//! Translates the configuration model into table providers, raw options and
//! lint switches, and evaluates the `[[reference]]` sites of a project.
//!
//! The configuration carries no source text, so directive locations are
//! synthesized against `<root>/module-info.java`: line 1 is the module
//! declaration and each directive takes the next line, in the order
//! requires, exports, opens, uses, provides.

use crate::diagnostic::Diagnostic;
use crate::directive::{DescriptorBuilder, GrantKind, ModuleDescriptor, Requires};
use crate::graph::{ModuleGraph, ModuleGraphBuilder};
use crate::lint::LintConfig;
use crate::location::Location;
use crate::name::{ModuleId, ALL_UNNAMED};
use crate::options::RawOptions;
use crate::table::{DescriptorProvider, Origin};
use strata_config::{
    Config, GrantConfig, LintSection, ModuleConfig, ModuleKindConfig, OptionsConfig,
    ReferenceConfig, ReferenceKind, PROJECT_FILE,
};
use tracing::debug;

/// File name used for synthesized directive locations
pub const DECLARATION_FILE: &str = "module-info.java";

/// A configured module that still has to be validated
#[derive(Debug)]
struct ConfiguredModule {
    builder: DescriptorBuilder,
    origin: Origin,
}

impl DescriptorProvider for ConfiguredModule {
    fn origin(&self) -> Origin {
        self.origin.clone()
    }

    fn complete(self: Box<Self>) -> Result<ModuleDescriptor, Vec<Diagnostic>> {
        self.builder.build()
    }
}

/// Map `ALL-UNNAMED` to the unnamed module, anything else to a named module
pub fn module_id(name: &str) -> ModuleId {
    if name == ALL_UNNAMED {
        ModuleId::unnamed()
    } else {
        ModuleId::new(name)
    }
}

/// Lint switches with unset entries left at their defaults
pub fn lint_config(section: &LintSection) -> LintConfig {
    let defaults = LintConfig::default();
    LintConfig {
        requires_transitive_automatic: section
            .requires_transitive_automatic
            .unwrap_or(defaults.requires_transitive_automatic),
        requires_automatic: section
            .requires_automatic
            .unwrap_or(defaults.requires_automatic),
        deprecation: section.deprecation.unwrap_or(defaults.deprecation),
        module_name: section.module_name.unwrap_or(defaults.module_name),
        exports_to_unknown: section
            .exports_to_unknown
            .unwrap_or(defaults.exports_to_unknown),
        opens_missing_package: section
            .opens_missing_package
            .unwrap_or(defaults.opens_missing_package),
        exports: section.exports.unwrap_or(defaults.exports),
    }
}

pub fn raw_options(options: &OptionsConfig) -> RawOptions {
    RawOptions {
        add_reads: options.add_reads.clone(),
        add_exports: options.add_exports.clone(),
        add_opens: options.add_opens.clone(),
        add_modules: options.add_modules.clone(),
        limit_modules: options.limit_modules.clone(),
        patch_module: options.patch_module.clone(),
        default_module_for_created_files: options.default_module_for_created_files.clone(),
    }
}

/// Turn one `[[module]]` entry into a declaration builder
pub fn declaration(module: &ModuleConfig) -> DescriptorBuilder {
    let file = module.root().join(DECLARATION_FILE);
    let file = file.to_string_lossy();
    let mut line = 1;
    let mut next = || {
        line += 1;
        Location::new(file.as_ref(), line, 5)
    };

    let mut builder = match module.kind {
        ModuleKindConfig::System => DescriptorBuilder::system(module.name.as_str()),
        _ => DescriptorBuilder::new(module.name.as_str()),
    }
    .at(Location::new(file.as_ref(), 1, 1))
    .packages(module.packages.iter().cloned());

    if module.open {
        builder = builder.open();
    }
    if let Some(version) = &module.version {
        builder = builder.version(version.as_str());
    }
    if module.deprecated {
        builder = builder.deprecated();
    }
    for annotation in &module.annotations {
        builder = builder.annotation(annotation.as_str());
    }

    for requires in &module.requires {
        let mut directive = Requires::new(requires.module()).at(next());
        if requires.is_transitive() {
            directive = directive.transitive();
        }
        if requires.is_static() {
            directive = directive.with_static();
        }
        builder.add_requires(directive);
    }

    let mut grant = |builder: &mut DescriptorBuilder, kind: GrantKind, grant: &GrantConfig| {
        let targets = grant
            .to
            .as_ref()
            .map(|to| to.iter().map(ModuleId::new).collect());
        builder.add_grant(kind, grant.package.clone(), targets, next());
    };
    for exports in &module.exports {
        grant(&mut builder, GrantKind::Exports, exports);
    }
    for opens in &module.opens {
        grant(&mut builder, GrantKind::Opens, opens);
    }

    for service in &module.uses {
        builder.add_uses(service.clone(), next());
    }
    for provides in &module.provides {
        builder.add_provides(provides.service.clone(), provides.with.clone(), next());
    }

    builder
}

/// Populate a graph builder from a loaded configuration
///
/// Paths stay relative to the project root, as written in strata.toml.
pub fn graph_builder(config: &Config) -> ModuleGraphBuilder {
    let project = &config.project;
    let mut builder = ModuleGraph::builder()
        .options(raw_options(&project.options.clone().unwrap_or_default()))
        .lint(lint_config(&config.lint()))
        .werror(config.werror());

    if let Some(roots) = project.roots() {
        builder = builder.roots(roots.iter().map(String::as_str));
    }

    let table = builder.table();
    table
        .base_module(config.base_module())
        .multi_module(project.is_multi_module());

    for module in &project.modules {
        let origin = match module.kind {
            ModuleKindConfig::Source => Origin::SourcePath {
                root: module.root(),
            },
            ModuleKindConfig::ModulePath => Origin::ModulePath {
                location: module.root(),
            },
            ModuleKindConfig::System => Origin::System,
        };
        table.add_provider(Box::new(ConfiguredModule {
            builder: declaration(module),
            origin,
        }));
    }

    for archive in &project.automatic {
        table.add_automatic(
            archive.path.clone(),
            archive.manifest_name.as_deref(),
            archive.packages.iter().cloned(),
        );
    }

    if let Some(class_path) = &project.class_path {
        table.class_path_packages(class_path.packages.iter().cloned());
    }

    debug!(
        modules = project.modules.len(),
        archives = project.automatic.len(),
        "graph inputs from configuration"
    );
    builder
}

/// Location of a reference site; the project file when none is given
pub fn reference_location(reference: &ReferenceConfig) -> Location {
    match &reference.file {
        Some(file) => Location::new(file.as_str(), reference.line, reference.column),
        None => Location::new(PROJECT_FILE, reference.line, reference.column),
    }
}

/// Evaluate one reference site against a graph
///
/// Returns the diagnostic to report, or `None` when the reference is legal.
pub fn check_reference(graph: &ModuleGraph, reference: &ReferenceConfig) -> Option<Diagnostic> {
    let from = module_id(&reference.from);
    let module = module_id(&reference.module);
    let location = reference_location(reference);

    match reference.kind {
        ReferenceKind::Exports => graph
            .query(&from, &module, &reference.package)
            .denial()
            .map(|denial| denial.to_diagnostic(location)),
        ReferenceKind::Opens => graph
            .query_opens(&from, &module, &reference.package)
            .denial()
            .map(|denial| denial.to_diagnostic(location)),
        ReferenceKind::Api => {
            let api_package = reference.api_package.as_deref()?;
            graph.check_api_leak(&from, api_package, &module, &reference.package, location)
        }
    }
}
