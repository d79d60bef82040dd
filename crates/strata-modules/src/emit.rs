//! Module-info emission record
//!
//! The logical content a class writer needs to produce a module descriptor
//! file. Binary layout is not handled here.

use crate::directive::{GrantKind, ModuleDescriptor};
use crate::name::ModuleId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiresInfo {
    pub module: String,
    pub transitive: bool,
    #[serde(rename = "static")]
    pub is_static: bool,
    /// Implicit dependence on the base module
    pub mandated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub package: String,
    /// Empty for an unqualified directive
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidesInfo {
    pub service: String,
    pub implementations: Vec<String>,
}

/// Content of a module descriptor file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub requires: Vec<RequiresInfo>,
    pub exports: Vec<PackageInfo>,
    pub opens: Vec<PackageInfo>,
    pub uses: Vec<String>,
    pub provides: Vec<ProvidesInfo>,
    pub packages: Vec<String>,
    pub annotations: Vec<String>,
    pub deprecated: bool,
}

impl ModuleInfo {
    /// Build the record for `descriptor`
    ///
    /// Modules other than the base module get a mandated `requires` of the
    /// base module unless they declare one.
    pub fn from_descriptor(descriptor: &ModuleDescriptor, base_module: &ModuleId) -> Self {
        let mut requires = Vec::with_capacity(descriptor.requires.len() + 1);
        if &descriptor.name != base_module && descriptor.requires_of(base_module.as_str()).is_none() {
            requires.push(RequiresInfo {
                module: base_module.as_str().to_string(),
                transitive: false,
                is_static: false,
                mandated: true,
            });
        }
        requires.extend(descriptor.requires.iter().map(|r| RequiresInfo {
            module: r.target.as_str().to_string(),
            transitive: r.transitive,
            is_static: r.is_static,
            mandated: false,
        }));

        let packages = |kind: GrantKind| -> Vec<PackageInfo> {
            descriptor
                .grants(kind)
                .values()
                .map(|g| PackageInfo {
                    package: g.package.clone(),
                    targets: g
                        .targets
                        .iter()
                        .flatten()
                        .map(|t| t.as_str().to_string())
                        .collect(),
                })
                .collect()
        };

        Self {
            name: descriptor.name.as_str().to_string(),
            open: descriptor.open,
            version: descriptor.version.clone(),
            requires,
            exports: packages(GrantKind::Exports),
            opens: packages(GrantKind::Opens),
            uses: descriptor.uses.iter().cloned().collect(),
            provides: descriptor
                .provides
                .values()
                .map(|p| ProvidesInfo {
                    service: p.service.clone(),
                    implementations: p.implementations.clone(),
                })
                .collect(),
            packages: descriptor.packages.iter().cloned().collect(),
            annotations: descriptor.annotations.clone(),
            deprecated: descriptor.deprecated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::{DescriptorBuilder, Requires};

    #[test]
    fn test_mandated_base_requires() {
        let descriptor = DescriptorBuilder::new("app")
            .requires(Requires::new("lib").with_static())
            .build()
            .unwrap();
        let info = ModuleInfo::from_descriptor(&descriptor, &ModuleId::new("java.base"));

        assert_eq!(info.requires.len(), 2);
        assert_eq!(info.requires[0].module, "java.base");
        assert!(info.requires[0].mandated);
        assert!(info.requires[1].is_static);
        assert!(!info.requires[1].mandated);
    }

    #[test]
    fn test_base_module_has_no_mandated_requires() {
        let descriptor = DescriptorBuilder::system("java.base").build().unwrap();
        let info = ModuleInfo::from_descriptor(&descriptor, &ModuleId::new("java.base"));
        assert!(info.requires.is_empty());
    }

    #[test]
    fn test_record_carries_all_directives() {
        let descriptor = DescriptorBuilder::new("app")
            .version("1.2")
            .deprecated()
            .annotation("@Deprecated(since=\"9\")")
            .packages(["api", "impl"])
            .exports("api")
            .opens_to("impl", ["framework"])
            .uses("api.Plugin")
            .provides("api.Plugin", ["impl.DefaultPlugin"])
            .build()
            .unwrap();
        let info = ModuleInfo::from_descriptor(&descriptor, &ModuleId::new("java.base"));

        assert_eq!(info.version.as_deref(), Some("1.2"));
        assert!(info.deprecated);
        assert_eq!(info.exports[0].targets, Vec::<String>::new());
        assert_eq!(info.opens[0].targets, vec!["framework"]);
        assert_eq!(info.provides[0].implementations, vec!["impl.DefaultPlugin"]);
        assert_eq!(info.packages, vec!["api", "impl"]);

        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"static\":false"));
    }
}
