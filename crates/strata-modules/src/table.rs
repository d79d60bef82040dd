//! Module table
//!
//! Name → descriptor map plus provenance, built once from descriptor
//! providers and frozen before resolution starts.

use crate::diagnostic::{Diagnostic, DiagnosticKind, RelatedLocation};
use crate::directive::{DescriptorBuilder, ModuleDescriptor, ModuleKind};
use crate::location::Location;
use crate::name::{automatic_module_name, ModuleId, NameError, DEFAULT_BASE_MODULE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Where a module was discovered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Origin {
    /// Compiled from the module-source-path (or the single source root)
    SourcePath { root: PathBuf },
    /// Found on the module path
    ModulePath { location: PathBuf },
    /// Part of the platform image
    System,
    /// The class path; only the unnamed module has this origin
    ClassPath,
}

impl Origin {
    pub fn is_source(&self) -> bool {
        matches!(self, Origin::SourcePath { .. })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::SourcePath { root } => write!(f, "source path {}", root.display()),
            Origin::ModulePath { location } => write!(f, "module path {}", location.display()),
            Origin::System => f.write_str("system image"),
            Origin::ClassPath => f.write_str("class path"),
        }
    }
}

/// Source of a module descriptor
///
/// A provider may hold a descriptor that is already validated, a declaration
/// that still has to go through the builder, or an archive whose module name
/// has yet to be derived. The table completes all of them the same way.
pub trait DescriptorProvider: fmt::Debug + Send {
    /// Provenance recorded in the table entry
    fn origin(&self) -> Origin;

    /// Produce the validated descriptor
    fn complete(self: Box<Self>) -> Result<ModuleDescriptor, Vec<Diagnostic>>;
}

/// A descriptor that needs no further work
#[derive(Debug, Clone)]
pub struct Prebuilt {
    pub descriptor: ModuleDescriptor,
    pub origin: Origin,
}

impl DescriptorProvider for Prebuilt {
    fn origin(&self) -> Origin {
        self.origin.clone()
    }

    fn complete(self: Box<Self>) -> Result<ModuleDescriptor, Vec<Diagnostic>> {
        Ok(self.descriptor)
    }
}

/// A module declaration read from source, validated on completion
#[derive(Debug, Clone)]
pub struct SourceDeclaration {
    pub builder: DescriptorBuilder,
    pub root: PathBuf,
}

impl DescriptorProvider for SourceDeclaration {
    fn origin(&self) -> Origin {
        Origin::SourcePath {
            root: self.root.clone(),
        }
    }

    fn complete(self: Box<Self>) -> Result<ModuleDescriptor, Vec<Diagnostic>> {
        self.builder.build()
    }
}

/// A plain archive on the module path that becomes an automatic module
#[derive(Debug, Clone)]
pub struct ArchiveCandidate {
    pub path: PathBuf,
    /// `Automatic-Module-Name` from the archive manifest
    pub manifest_name: Option<String>,
    pub packages: Vec<String>,
}

impl DescriptorProvider for ArchiveCandidate {
    fn origin(&self) -> Origin {
        Origin::ModulePath {
            location: self.path.clone(),
        }
    }

    fn complete(self: Box<Self>) -> Result<ModuleDescriptor, Vec<Diagnostic>> {
        let ArchiveCandidate {
            path,
            manifest_name,
            packages,
        } = *self;
        let archive = path.to_string_lossy();
        let location = Location::new(archive.as_ref(), 0, 0);
        match automatic_module_name(&archive, manifest_name.as_deref()) {
            Ok(name) => Ok(DescriptorBuilder::automatic(name, packages, location)),
            Err(err) => {
                let name = match &err {
                    NameError::InvalidManifestName { name, .. } => name.clone(),
                    NameError::UnderivableName { derived, .. } => derived.clone(),
                    NameError::InvalidModuleName(name) => name.clone(),
                };
                Err(vec![Diagnostic::new(
                    DiagnosticKind::InvalidAutomaticModuleName,
                    err.to_string(),
                    location,
                )
                .with_module(name)])
            }
        }
    }
}

/// A table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleEntry {
    pub descriptor: ModuleDescriptor,
    pub origin: Origin,
    /// Extra roots attached with `--patch-module`
    pub patch_roots: Vec<PathBuf>,
}

impl ModuleEntry {
    pub fn name(&self) -> &ModuleId {
        &self.descriptor.name
    }

    pub fn is_automatic(&self) -> bool {
        self.descriptor.is_automatic()
    }

    pub fn is_system(&self) -> bool {
        self.origin == Origin::System
    }

    pub fn is_source(&self) -> bool {
        self.origin.is_source()
    }

    pub fn is_on_module_path(&self) -> bool {
        matches!(self.origin, Origin::ModulePath { .. })
    }
}

/// A `--patch-module` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub module: ModuleId,
    pub roots: Vec<PathBuf>,
    pub location: Location,
}

/// The frozen set of known modules
#[derive(Debug, Clone)]
pub struct ModuleTable {
    modules: BTreeMap<ModuleId, ModuleEntry>,
    unnamed: ModuleDescriptor,
    base_module: ModuleId,
    multi_module: bool,
}

impl ModuleTable {
    pub fn builder() -> ModuleTableBuilder {
        ModuleTableBuilder::default()
    }

    /// Named module entry
    pub fn get(&self, name: &str) -> Option<&ModuleEntry> {
        self.modules.get(name)
    }

    /// Descriptor of a named module, or of the unnamed module
    pub fn descriptor(&self, name: &ModuleId) -> Option<&ModuleDescriptor> {
        if name.is_unnamed() {
            Some(&self.unnamed)
        } else {
            self.modules.get(name).map(|e| &e.descriptor)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Named entries in name order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleEntry> {
        self.modules.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.keys()
    }

    pub fn system_modules(&self) -> impl Iterator<Item = &ModuleEntry> {
        self.modules().filter(|e| e.is_system())
    }

    pub fn module_path_modules(&self) -> impl Iterator<Item = &ModuleEntry> {
        self.modules().filter(|e| e.is_on_module_path())
    }

    pub fn source_modules(&self) -> impl Iterator<Item = &ModuleEntry> {
        self.modules().filter(|e| e.is_source())
    }

    pub fn automatic_modules(&self) -> impl Iterator<Item = &ModuleEntry> {
        self.modules().filter(|e| e.is_automatic())
    }

    /// The unnamed module, holding class-path packages
    pub fn unnamed(&self) -> &ModuleDescriptor {
        &self.unnamed
    }

    /// Module every named module reads implicitly
    pub fn base_module(&self) -> &ModuleId {
        &self.base_module
    }

    /// Whether the compilation uses a module-source-path
    pub fn is_multi_module(&self) -> bool {
        self.multi_module
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Collects providers and patches, then builds the [`ModuleTable`]
#[derive(Debug, Default)]
pub struct ModuleTableBuilder {
    providers: Vec<Box<dyn DescriptorProvider>>,
    patches: Vec<Patch>,
    class_path_packages: Vec<String>,
    base_module: Option<ModuleId>,
    multi_module: bool,
}

impl ModuleTableBuilder {
    /// Register any descriptor provider
    pub fn add_provider(&mut self, provider: Box<dyn DescriptorProvider>) -> &mut Self {
        self.providers.push(provider);
        self
    }

    /// Module declared in source under `root`
    pub fn add_source(&mut self, builder: DescriptorBuilder, root: impl Into<PathBuf>) -> &mut Self {
        self.add_provider(Box::new(SourceDeclaration {
            builder,
            root: root.into(),
        }))
    }

    /// Explicit module found on the module path
    pub fn add_module_path(
        &mut self,
        descriptor: ModuleDescriptor,
        location: impl Into<PathBuf>,
    ) -> &mut Self {
        self.add_provider(Box::new(Prebuilt {
            descriptor,
            origin: Origin::ModulePath {
                location: location.into(),
            },
        }))
    }

    /// Module of the platform image
    pub fn add_system(&mut self, mut descriptor: ModuleDescriptor) -> &mut Self {
        if descriptor.kind == ModuleKind::Normal {
            descriptor.kind = ModuleKind::System;
        }
        self.add_provider(Box::new(Prebuilt {
            descriptor,
            origin: Origin::System,
        }))
    }

    /// Plain archive on the module path
    pub fn add_automatic<I, S>(
        &mut self,
        path: impl Into<PathBuf>,
        manifest_name: Option<&str>,
        packages: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_provider(Box::new(ArchiveCandidate {
            path: path.into(),
            manifest_name: manifest_name.map(str::to_string),
            packages: packages.into_iter().map(Into::into).collect(),
        }))
    }

    /// Packages of the class path (the unnamed module)
    pub fn class_path_packages<I, S>(&mut self, packages: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_path_packages
            .extend(packages.into_iter().map(Into::into));
        self
    }

    /// Attach `--patch-module` roots to a module
    pub fn patch(&mut self, patch: Patch) -> &mut Self {
        self.patches.push(patch);
        self
    }

    /// Override the base module name
    pub fn base_module(&mut self, name: impl Into<ModuleId>) -> &mut Self {
        self.base_module = Some(name.into());
        self
    }

    /// Enable module-source-path mode
    pub fn multi_module(&mut self, enabled: bool) -> &mut Self {
        self.multi_module = enabled;
        self
    }

    pub fn is_multi_module(&self) -> bool {
        self.multi_module
    }

    /// Complete every provider and freeze the table
    ///
    /// Providers that fail validation are left out of the table. The first
    /// module registered under a name wins; later ones are reported.
    pub fn build(self) -> (ModuleTable, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let mut modules: BTreeMap<ModuleId, ModuleEntry> = BTreeMap::new();

        for provider in self.providers {
            let origin = provider.origin();
            let descriptor = match provider.complete() {
                Ok(descriptor) => descriptor,
                Err(errors) => {
                    diagnostics.extend(errors);
                    continue;
                }
            };
            trace!(module = %descriptor.name, origin = %origin, "registering module");

            if let Some(existing) = modules.get(&descriptor.name) {
                diagnostics.push(duplicate_module(existing, &descriptor, &origin));
                continue;
            }
            modules.insert(
                descriptor.name.clone(),
                ModuleEntry {
                    descriptor,
                    origin,
                    patch_roots: Vec::new(),
                },
            );
        }

        apply_patches(&mut modules, self.patches, &mut diagnostics);

        let table = ModuleTable {
            modules,
            unnamed: ModuleDescriptor::unnamed(self.class_path_packages),
            base_module: self
                .base_module
                .unwrap_or_else(|| ModuleId::new(DEFAULT_BASE_MODULE)),
            multi_module: self.multi_module,
        };
        debug!(
            modules = table.len(),
            errors = diagnostics.len(),
            "module table built"
        );
        (table, diagnostics)
    }
}

fn duplicate_module(existing: &ModuleEntry, duplicate: &ModuleDescriptor, origin: &Origin) -> Diagnostic {
    let name = duplicate.name.as_str();
    let related = RelatedLocation {
        location: existing.descriptor.location.clone(),
        message: format!("first found on the {}", existing.origin),
    };
    if existing.is_automatic() != duplicate.is_automatic() {
        Diagnostic::new(
            DiagnosticKind::AutomaticNameCollision,
            format!("automatic module name {} collides with an explicit module", name),
            duplicate.location.clone(),
        )
        .with_module(name)
        .with_related_location(related)
    } else {
        Diagnostic::new(
            DiagnosticKind::DuplicateModule,
            format!("duplicate module: {}", name),
            duplicate.location.clone(),
        )
        .with_module(name)
        .with_note(format!("also found on the {}", origin))
        .with_related_location(related)
    }
}

fn apply_patches(
    modules: &mut BTreeMap<ModuleId, ModuleEntry>,
    patches: Vec<Patch>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let source_roots: Vec<(ModuleId, PathBuf)> = modules
        .values()
        .filter_map(|e| match &e.origin {
            Origin::SourcePath { root } => Some((e.name().clone(), root.clone())),
            _ => None,
        })
        .collect();

    for patch in patches {
        let Some(entry) = modules.get_mut(&patch.module) else {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::ModuleForOptionNotFound,
                    format!("module for option --patch-module not found: {}", patch.module),
                    patch.location,
                )
                .with_option("--patch-module")
                .with_module(patch.module.as_str()),
            );
            continue;
        };
        if !entry.patch_roots.is_empty() {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::DuplicatePatch,
                    format!("module {} is patched more than once", patch.module),
                    patch.location,
                )
                .with_option("--patch-module")
                .with_module(patch.module.as_str()),
            );
            continue;
        }

        let mut conflict = false;
        for root in &patch.roots {
            if let Some((other, _)) = source_roots
                .iter()
                .find(|(other, src)| *other != patch.module && is_within(root, src))
            {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::PatchedAndOnModuleSourcePath,
                        format!(
                            "file patched and on module-source-path for two modules: {} and {}",
                            patch.module, other
                        ),
                        patch.location.clone(),
                    )
                    .with_option("--patch-module")
                    .with_module(patch.module.as_str())
                    .with_other_module(other.as_str()),
                );
                conflict = true;
            }
        }
        if !conflict {
            debug!(module = %patch.module, roots = patch.roots.len(), "patched module");
            entry.patch_roots = patch.roots;
        }
    }
}

fn is_within(path: &Path, root: &Path) -> bool {
    path == root || path.starts_with(root)
}
