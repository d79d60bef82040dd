//! Directive model
//!
//! Value types for a module's declaration (`requires`, `exports`, `opens`,
//! `uses`, `provides`) and the [`DescriptorBuilder`] that validates a raw
//! declaration into a [`ModuleDescriptor`]. Validation never panics: `build`
//! returns the descriptor or every structural error it found.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::location::Location;
use crate::name::{
    is_valid_module_name, is_valid_package_name, is_valid_type_name, AutomaticName, ModuleId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What kind of module a descriptor describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Explicit module compiled from source or read from a module-info class
    Normal,
    /// Module synthesized from a plain archive on the module path
    Automatic,
    /// The class-path module
    Unnamed,
    /// Module of the platform image
    System,
}

/// A `requires` directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requires {
    pub target: ModuleId,
    #[serde(default)]
    pub transitive: bool,
    /// Compile-time only dependence; kept as metadata for downstream tools
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub location: Location,
}

impl Requires {
    pub fn new(target: impl Into<ModuleId>) -> Self {
        Self {
            target: target.into(),
            transitive: false,
            is_static: false,
            location: Location::unknown(),
        }
    }

    pub fn transitive(mut self) -> Self {
        self.transitive = true;
        self
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

/// Which package directive a [`PackageGrant`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantKind {
    Exports,
    Opens,
}

impl GrantKind {
    pub fn keyword(self) -> &'static str {
        match self {
            GrantKind::Exports => "exports",
            GrantKind::Opens => "opens",
        }
    }
}

/// An `exports` or `opens` directive
///
/// `targets == None` grants the package to every module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageGrant {
    pub package: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<BTreeSet<ModuleId>>,
    #[serde(default)]
    pub location: Location,
}

impl PackageGrant {
    pub fn is_qualified(&self) -> bool {
        self.targets.is_some()
    }
}

/// A `provides` directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provides {
    pub service: String,
    pub implementations: Vec<String>,
    #[serde(default)]
    pub location: Location,
}

/// A validated module descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: ModuleId,
    pub kind: ModuleKind,
    /// `open module`: every package is opened to all modules
    #[serde(default)]
    pub open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub requires: Vec<Requires>,
    #[serde(default)]
    pub exports: BTreeMap<String, PackageGrant>,
    #[serde(default)]
    pub opens: BTreeMap<String, PackageGrant>,
    #[serde(default)]
    pub uses: BTreeSet<String>,
    #[serde(default)]
    pub provides: BTreeMap<String, Provides>,
    /// Packages the module contains
    #[serde(default)]
    pub packages: BTreeSet<String>,
    #[serde(default)]
    pub deprecated: bool,
    /// Opaque annotation list, passed through to the emission record
    #[serde(default)]
    pub annotations: Vec<String>,
    #[serde(default)]
    pub location: Location,
}

impl ModuleDescriptor {
    /// Descriptor of the unnamed module with the given class-path packages
    pub fn unnamed(packages: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: ModuleId::unnamed(),
            kind: ModuleKind::Unnamed,
            open: false,
            version: None,
            requires: Vec::new(),
            exports: BTreeMap::new(),
            opens: BTreeMap::new(),
            uses: BTreeSet::new(),
            provides: BTreeMap::new(),
            packages: packages.into_iter().collect(),
            deprecated: false,
            annotations: Vec::new(),
            location: Location::unknown(),
        }
    }

    pub fn is_automatic(&self) -> bool {
        self.kind == ModuleKind::Automatic
    }

    pub fn is_unnamed(&self) -> bool {
        self.kind == ModuleKind::Unnamed
    }

    pub fn contains_package(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    /// The `requires` directive targeting `target`, if any
    pub fn requires_of(&self, target: &str) -> Option<&Requires> {
        self.requires.iter().find(|r| r.target.as_str() == target)
    }

    /// Declared directives of the given grant kind
    pub fn grants(&self, kind: GrantKind) -> &BTreeMap<String, PackageGrant> {
        match kind {
            GrantKind::Exports => &self.exports,
            GrantKind::Opens => &self.opens,
        }
    }

    /// Whether the package is exported to every module
    pub fn exports_unqualified(&self, package: &str) -> bool {
        self.exports.get(package).is_some_and(|e| !e.is_qualified())
    }
}

/// Builder that validates a raw module declaration
///
/// Directives are recorded in declaration order; every structural problem is
/// collected and reported by [`DescriptorBuilder::build`].
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    descriptor: ModuleDescriptor,
    errors: Vec<Diagnostic>,
}

impl DescriptorBuilder {
    /// Start a normal (explicit) module declaration
    pub fn new(name: impl Into<ModuleId>) -> Self {
        Self::with_kind(name, ModuleKind::Normal)
    }

    /// Start a system module declaration
    pub fn system(name: impl Into<ModuleId>) -> Self {
        Self::with_kind(name, ModuleKind::System)
    }

    /// Start a declaration of the given kind
    pub fn with_kind(name: impl Into<ModuleId>, kind: ModuleKind) -> Self {
        let name = name.into();
        let mut descriptor = ModuleDescriptor::unnamed(std::iter::empty());
        descriptor.name = name;
        descriptor.kind = kind;
        Self {
            descriptor,
            errors: Vec::new(),
        }
    }

    /// Build the descriptor of an automatic module
    ///
    /// Automatic modules declare nothing; they export and open every package.
    pub fn automatic(
        name: AutomaticName,
        packages: impl IntoIterator<Item = String>,
        location: Location,
    ) -> ModuleDescriptor {
        let packages: BTreeSet<String> = packages.into_iter().collect();
        let grants = |_: GrantKind| -> BTreeMap<String, PackageGrant> {
            packages
                .iter()
                .map(|p| {
                    (
                        p.clone(),
                        PackageGrant {
                            package: p.clone(),
                            targets: None,
                            location: location.clone(),
                        },
                    )
                })
                .collect()
        };
        ModuleDescriptor {
            name: name.name,
            kind: ModuleKind::Automatic,
            open: true,
            version: name.version,
            requires: Vec::new(),
            exports: grants(GrantKind::Exports),
            opens: grants(GrantKind::Opens),
            uses: BTreeSet::new(),
            provides: BTreeMap::new(),
            packages: packages.clone(),
            deprecated: false,
            annotations: Vec::new(),
            location,
        }
    }

    /// Name being declared
    pub fn name(&self) -> &ModuleId {
        &self.descriptor.name
    }

    /// Location of the module declaration itself
    pub fn at(mut self, location: Location) -> Self {
        self.descriptor.location = location;
        self
    }

    pub fn open(mut self) -> Self {
        self.descriptor.open = true;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.descriptor.version = Some(version.into());
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.descriptor.deprecated = true;
        self
    }

    pub fn annotation(mut self, annotation: impl Into<String>) -> Self {
        self.descriptor.annotations.push(annotation.into());
        self
    }

    /// Declare the packages the module contains
    pub fn packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor
            .packages
            .extend(packages.into_iter().map(Into::into));
        self
    }

    pub fn requires(mut self, requires: Requires) -> Self {
        self.add_requires(requires);
        self
    }

    pub fn exports(self, package: impl Into<String>) -> Self {
        self.grant(GrantKind::Exports, package.into(), None, Location::unknown())
    }

    pub fn exports_to<I, M>(self, package: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ModuleId>,
    {
        let targets = targets.into_iter().map(Into::into).collect();
        self.grant(GrantKind::Exports, package.into(), Some(targets), Location::unknown())
    }

    pub fn opens(self, package: impl Into<String>) -> Self {
        self.grant(GrantKind::Opens, package.into(), None, Location::unknown())
    }

    pub fn opens_to<I, M>(self, package: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ModuleId>,
    {
        let targets = targets.into_iter().map(Into::into).collect();
        self.grant(GrantKind::Opens, package.into(), Some(targets), Location::unknown())
    }

    /// Record an `exports`/`opens` directive
    ///
    /// `targets` is the raw `to` list in declaration order; repeats are
    /// reported, an empty list is an error.
    pub fn grant(
        mut self,
        kind: GrantKind,
        package: String,
        targets: Option<Vec<ModuleId>>,
        location: Location,
    ) -> Self {
        self.add_grant(kind, package, targets, location);
        self
    }

    pub fn uses(mut self, service: impl Into<String>) -> Self {
        self.add_uses(service.into(), Location::unknown());
        self
    }

    pub fn provides<I, S>(mut self, service: impl Into<String>, implementations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let implementations = implementations.into_iter().map(Into::into).collect();
        self.add_provides(service.into(), implementations, Location::unknown());
        self
    }

    pub fn add_requires(&mut self, requires: Requires) {
        let module = self.descriptor.name.clone();
        if self.reject_on_automatic("requires", &requires.location) {
            return;
        }
        if !is_valid_module_name(requires.target.as_str()) {
            self.errors.push(
                Diagnostic::new(
                    DiagnosticKind::InvalidModuleName,
                    format!("invalid module name: '{}'", requires.target.as_str()),
                    requires.location.clone(),
                )
                .with_module(module.as_str()),
            );
            return;
        }
        if requires.target == module {
            self.errors.push(
                Diagnostic::new(
                    DiagnosticKind::RequiresSelf,
                    format!("module {} cannot require itself", module),
                    requires.location.clone(),
                )
                .with_module(module.as_str()),
            );
            return;
        }
        if let Some(previous) = self.descriptor.requires_of(requires.target.as_str()) {
            let previous = previous.location.clone();
            self.errors.push(
                Diagnostic::new(
                    DiagnosticKind::DuplicateRequires,
                    format!("duplicate requires: {}", requires.target),
                    requires.location.clone(),
                )
                .with_module(module.as_str())
                .with_other_module(requires.target.as_str())
                .with_related_location(crate::diagnostic::RelatedLocation {
                    location: previous,
                    message: "first declared here".to_string(),
                }),
            );
            return;
        }
        self.descriptor.requires.push(requires);
    }

    pub fn add_grant(
        &mut self,
        kind: GrantKind,
        package: String,
        targets: Option<Vec<ModuleId>>,
        location: Location,
    ) {
        let module = self.descriptor.name.clone();
        if self.reject_on_automatic(kind.keyword(), &location) {
            return;
        }
        if kind == GrantKind::Opens && self.descriptor.open {
            self.errors.push(
                Diagnostic::new(
                    DiagnosticKind::OpensInOpenModule,
                    "'opens' is not allowed in an open module",
                    location,
                )
                .with_module(module.as_str())
                .with_package(package),
            );
            return;
        }
        if !is_valid_package_name(&package) {
            self.errors.push(
                Diagnostic::new(
                    DiagnosticKind::InvalidPackageName,
                    format!("invalid package name: '{}'", package),
                    location,
                )
                .with_module(module.as_str()),
            );
            return;
        }
        if self.descriptor.grants(kind).contains_key(&package) {
            let duplicate = match kind {
                GrantKind::Exports => DiagnosticKind::DuplicateExports,
                GrantKind::Opens => DiagnosticKind::DuplicateOpens,
            };
            self.errors.push(
                Diagnostic::new(
                    duplicate,
                    format!("duplicate {}: {}", kind.keyword(), package),
                    location,
                )
                .with_module(module.as_str())
                .with_package(package),
            );
            return;
        }

        let targets = match targets {
            None => None,
            Some(list) => {
                if list.is_empty() {
                    self.errors.push(
                        Diagnostic::new(
                            DiagnosticKind::EmptyTargetList,
                            format!("empty target list for {} {}", kind.keyword(), package),
                            location,
                        )
                        .with_module(module.as_str())
                        .with_package(package),
                    );
                    return;
                }
                let mut set = BTreeSet::new();
                for target in list {
                    if !is_valid_module_name(target.as_str()) {
                        self.errors.push(
                            Diagnostic::new(
                                DiagnosticKind::InvalidModuleName,
                                format!("invalid module name: '{}'", target.as_str()),
                                location.clone(),
                            )
                            .with_module(module.as_str())
                            .with_package(package.clone()),
                        );
                        continue;
                    }
                    if !set.insert(target.clone()) {
                        self.errors.push(
                            Diagnostic::new(
                                DiagnosticKind::ConflictingTarget,
                                format!(
                                    "module {} is listed more than once in {} {}",
                                    target,
                                    kind.keyword(),
                                    package
                                ),
                                location.clone(),
                            )
                            .with_module(module.as_str())
                            .with_other_module(target.as_str())
                            .with_package(package.clone()),
                        );
                    }
                }
                Some(set)
            }
        };

        let grant = PackageGrant {
            package: package.clone(),
            targets,
            location,
        };
        match kind {
            GrantKind::Exports => self.descriptor.exports.insert(package, grant),
            GrantKind::Opens => self.descriptor.opens.insert(package, grant),
        };
    }

    pub fn add_uses(&mut self, service: String, location: Location) {
        let module = self.descriptor.name.clone();
        if self.reject_on_automatic("uses", &location) {
            return;
        }
        if !is_valid_type_name(&service) {
            self.errors.push(
                Diagnostic::new(
                    DiagnosticKind::InvalidTypeName,
                    format!("invalid service type name: '{}'", service),
                    location,
                )
                .with_module(module.as_str()),
            );
            return;
        }
        if !self.descriptor.uses.insert(service.clone()) {
            self.errors.push(
                Diagnostic::new(
                    DiagnosticKind::DuplicateUses,
                    format!("duplicate uses: {}", service),
                    location,
                )
                .with_module(module.as_str()),
            );
        }
    }

    pub fn add_provides(&mut self, service: String, implementations: Vec<String>, location: Location) {
        let module = self.descriptor.name.clone();
        if self.reject_on_automatic("provides", &location) {
            return;
        }
        if self.descriptor.provides.contains_key(&service) {
            self.errors.push(
                Diagnostic::new(
                    DiagnosticKind::DuplicateProvides,
                    format!("duplicate provides: {}", service),
                    location,
                )
                .with_module(module.as_str()),
            );
            return;
        }
        if implementations.is_empty() {
            self.errors.push(
                Diagnostic::new(
                    DiagnosticKind::InvalidProvides,
                    format!("provides {} declares no implementation", service),
                    location,
                )
                .with_module(module.as_str()),
            );
            return;
        }

        let mut seen = BTreeSet::new();
        for name in std::iter::once(&service).chain(implementations.iter()) {
            if !is_valid_type_name(name) {
                self.errors.push(
                    Diagnostic::new(
                        DiagnosticKind::InvalidTypeName,
                        format!("invalid type name: '{}'", name),
                        location.clone(),
                    )
                    .with_module(module.as_str()),
                );
            }
        }
        for implementation in &implementations {
            if !seen.insert(implementation.as_str()) {
                self.errors.push(
                    Diagnostic::new(
                        DiagnosticKind::InvalidProvides,
                        format!("duplicate implementation {} for service {}", implementation, service),
                        location.clone(),
                    )
                    .with_module(module.as_str()),
                );
            }
        }

        self.descriptor.provides.insert(
            service.clone(),
            Provides {
                service,
                implementations,
                location,
            },
        );
    }

    fn reject_on_automatic(&mut self, directive: &str, location: &Location) -> bool {
        if self.descriptor.kind != ModuleKind::Automatic {
            return false;
        }
        self.errors.push(
            Diagnostic::new(
                DiagnosticKind::DirectiveOnAutomaticModule,
                format!("automatic module {} cannot declare '{}'", self.descriptor.name, directive),
                location.clone(),
            )
            .with_module(self.descriptor.name.as_str()),
        );
        true
    }

    /// Validate and return the descriptor, or every structural error
    pub fn build(mut self) -> Result<ModuleDescriptor, Vec<Diagnostic>> {
        let name = self.descriptor.name.clone();
        if !is_valid_module_name(name.as_str()) {
            self.errors.insert(
                0,
                Diagnostic::new(
                    DiagnosticKind::InvalidModuleName,
                    format!("invalid module name: '{}'", name.as_str()),
                    self.descriptor.location.clone(),
                ),
            );
        }
        for package in &self.descriptor.packages {
            if !is_valid_package_name(package) {
                self.errors.push(
                    Diagnostic::new(
                        DiagnosticKind::InvalidPackageName,
                        format!("invalid package name: '{}'", package),
                        self.descriptor.location.clone(),
                    )
                    .with_module(name.as_str()),
                );
            }
        }

        if self.errors.is_empty() {
            Ok(self.descriptor)
        } else {
            Err(self.errors)
        }
    }
}
