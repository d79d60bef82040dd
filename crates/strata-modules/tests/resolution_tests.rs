//! Resolution: closure, roots, limit-modules, automatic modules and cycles

mod common;

use common::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use strata_modules::{
    automatic_module_name, DescriptorBuilder, DiagnosticKind, ModuleGraph, ModuleId, ModuleState,
    NameError, RawOptions, Requires, Stage,
};

fn names(graph: &ModuleGraph) -> Vec<&str> {
    graph
        .resolved()
        .sorted()
        .into_iter()
        .map(ModuleId::as_str)
        .collect()
}

fn platform(builder: &mut strata_modules::ModuleGraphBuilder) {
    let system = |name: &str, package: &str| {
        DescriptorBuilder::system(name)
            .packages([package])
            .exports(package)
    };
    builder
        .table()
        .add_system(java_base())
        .add_system(
            system("java.sql", "java.sql")
                .requires(Requires::new("java.logging").transitive())
                .build()
                .unwrap(),
        )
        .add_system(system("java.logging", "java.util.logging").build().unwrap())
        .add_system(system("java.xml", "javax.xml").build().unwrap())
        .add_system(system("java.desktop", "java.awt").build().unwrap());
}

// ============================================================================
// Closure
// ============================================================================

#[test]
fn test_closure_of_acyclic_graph() {
    let mut builder = ModuleGraph::builder();
    builder
        .table()
        .add_system(java_base())
        .add_source(DescriptorBuilder::new("app").requires(Requires::new("lib")), "src/app")
        .add_module_path(
            DescriptorBuilder::new("lib")
                .requires(Requires::new("util").transitive())
                .build()
                .unwrap(),
            "mods/lib.jar",
        )
        .add_module_path(DescriptorBuilder::new("util").build().unwrap(), "mods/util.jar")
        .add_module_path(DescriptorBuilder::new("unused").build().unwrap(), "mods/unused.jar");
    let graph = builder.build().unwrap();

    assert_eq!(names(&graph), vec!["app", "java.base", "lib", "util"]);
    assert_eq!(graph.resolved().state("unused"), Some(ModuleState::Discovered));
    assert_eq!(graph.resolved().state("lib"), Some(ModuleState::Resolved));
    assert!(graph.reads(&id("app"), &id("util")));
}

#[test]
fn test_missing_module_reported_at_requires() {
    let err = failure(
        vec![DescriptorBuilder::new("app").requires(requires_at("app", "missing", 2))],
        RawOptions::default(),
    );

    assert_eq!(err.stage(), Stage::Resolution);
    assert_eq!(kinds(err.diagnostics()), vec![DiagnosticKind::ModuleNotFound]);
    assert_eq!(err.diagnostics()[0].message, "module not found: missing");
    assert_eq!(err.diagnostics()[0].location, decl("app", 2));
}

#[test]
fn test_requires_static_is_resolved_and_marked() {
    let mut builder = ModuleGraph::builder();
    builder
        .table()
        .add_system(java_base())
        .add_source(
            DescriptorBuilder::new("app").requires(Requires::new("annotations").with_static()),
            "src/app",
        )
        .add_module_path(
            DescriptorBuilder::new("annotations").build().unwrap(),
            "mods/annotations.jar",
        );
    let graph = builder.build().unwrap();

    assert!(graph.resolved().contains(&id("annotations")));
    assert!(graph.resolved().is_static_edge(&id("app"), &id("annotations")));
    assert!(!graph.resolved().is_static_edge(&id("app"), &id("java.base")));
}

// ============================================================================
// Root set and limit-modules
// ============================================================================

#[test]
fn test_limit_modules_keeps_roots_and_added_modules() {
    let mut builder = ModuleGraph::builder().options(RawOptions {
        limit_modules: vec!["java.sql".into()],
        add_modules: vec!["ALL-SYSTEM,java.desktop".into()],
        ..RawOptions::default()
    });
    platform(&mut builder);
    builder
        .table()
        .add_source(DescriptorBuilder::new("app").requires(Requires::new("java.sql")), "src/app");
    let graph = builder.build().unwrap();

    assert_eq!(
        names(&graph),
        vec!["app", "java.base", "java.desktop", "java.logging", "java.sql"]
    );
    assert_eq!(graph.resolved().state("java.xml"), Some(ModuleState::Undiscovered));
}

#[test]
fn test_limit_modules_hides_required_module() {
    let mut builder = ModuleGraph::builder().options(RawOptions {
        limit_modules: vec!["java.sql".into()],
        ..RawOptions::default()
    });
    platform(&mut builder);
    builder.table().add_source(
        DescriptorBuilder::new("app").requires(requires_at("app", "java.xml", 2)),
        "src/app",
    );

    let err = builder.build().unwrap_err();
    assert_eq!(err.stage(), Stage::Resolution);
    assert_eq!(err.diagnostics()[0].kind, DiagnosticKind::ModuleNotFound);
    assert_eq!(err.diagnostics()[0].location, decl("app", 2));
}

#[test]
fn test_unnamed_compilation_uses_default_roots() {
    let mut builder = ModuleGraph::builder();
    platform(&mut builder);
    builder.table().class_path_packages(["app"]);
    let graph = builder.build().unwrap();

    assert!(graph.resolved().contains(&id("java.xml")));
    assert!(graph.resolved().roots().contains(&id("java.desktop")));
    assert!(graph.reads(&ModuleId::unnamed(), &id("java.sql")));
}

#[test]
fn test_all_module_path_roots_outside_multi_module_mode() {
    let mut builder = ModuleGraph::builder().options(RawOptions {
        add_modules: vec!["ALL-MODULE-PATH".into()],
        ..RawOptions::default()
    });
    builder
        .table()
        .add_system(java_base())
        .add_source(DescriptorBuilder::new("app"), "src/app")
        .add_module_path(DescriptorBuilder::new("plugin").build().unwrap(), "mods/plugin.jar");
    let graph = builder.build().unwrap();

    assert!(graph.resolved().roots().contains(&id("plugin")));
}

#[test]
fn test_all_module_path_rejected_in_multi_module_mode() {
    let mut builder = ModuleGraph::builder().options(RawOptions {
        add_modules: vec!["ALL-MODULE-PATH".into()],
        ..RawOptions::default()
    });
    builder
        .table()
        .multi_module(true)
        .add_system(java_base())
        .add_source(DescriptorBuilder::new("app"), "src/app");

    let err = builder.build().unwrap_err();
    assert_eq!(err.stage(), Stage::Resolution);
    assert_eq!(
        messages(err.diagnostics()),
        vec!["ALL-MODULE-PATH invalid with this option combination"]
    );
}

#[test]
fn test_unknown_added_module_is_a_warning() {
    let graph = graph(
        vec![DescriptorBuilder::new("app")],
        RawOptions {
            add_modules: vec!["nowhere".into()],
            ..RawOptions::default()
        },
    );
    assert_eq!(kinds(graph.diagnostics()), vec![DiagnosticKind::ModuleForOptionNotFound]);
}

// ============================================================================
// Automatic modules
// ============================================================================

#[rstest]
#[case("foo-bar-1.2.3.jar", None, "foo.bar", Some("1.2.3"))]
#[case("mods/commons_io-2.11.jar", None, "commons.io", Some("2.11"))]
#[case("lib.jar", None, "lib", None)]
#[case("foo-bar-1.2.3.jar", Some("org.foo"), "org.foo", Some("1.2.3"))]
fn test_automatic_module_names(
    #[case] archive: &str,
    #[case] manifest: Option<&str>,
    #[case] name: &str,
    #[case] version: Option<&str>,
) {
    let derived = automatic_module_name(archive, manifest).unwrap();
    assert_eq!(derived.name.as_str(), name);
    assert_eq!(derived.version.as_deref(), version);
}

#[test]
fn test_invalid_manifest_name_is_an_error() {
    let err = automatic_module_name("foo.jar", Some("1bad")).unwrap_err();
    assert!(matches!(err, NameError::InvalidManifestName { .. }));

    let mut builder = ModuleGraph::builder();
    builder
        .table()
        .add_system(java_base())
        .add_automatic("mods/foo.jar", Some("1bad"), ["foo"]);
    let err = builder.build().unwrap_err();
    assert_eq!(err.stage(), Stage::Table);
    assert_eq!(
        kinds(err.diagnostics()),
        vec![DiagnosticKind::InvalidAutomaticModuleName]
    );
}

#[test]
fn test_automatic_module_pulls_in_all_automatic_modules() {
    let mut builder = ModuleGraph::builder();
    builder
        .table()
        .add_system(java_base())
        .add_source(DescriptorBuilder::new("app").requires(Requires::new("lib")), "src/app")
        .add_automatic("mods/lib-1.2.jar", None, ["lib"])
        .add_automatic("mods/util-2.0.jar", None, ["util"]);
    let graph = builder.build().unwrap();

    assert_eq!(names(&graph), vec!["app", "java.base", "lib", "util"]);
    assert!(graph.reads(&id("app"), &id("util")));
    assert!(graph.reads(&id("lib"), &ModuleId::unnamed()));
    assert_eq!(
        graph.table().get("lib").unwrap().descriptor.version.as_deref(),
        Some("1.2")
    );
}

#[test]
fn test_automatic_name_collision() {
    let mut builder = ModuleGraph::builder();
    builder
        .table()
        .add_system(java_base())
        .add_source(DescriptorBuilder::new("lib"), "src/lib")
        .add_automatic("mods/lib-1.0.jar", None, ["lib"]);

    let err = builder.build().unwrap_err();
    assert_eq!(err.stage(), Stage::Table);
    assert_eq!(kinds(err.diagnostics()), vec![DiagnosticKind::AutomaticNameCollision]);
}

// ============================================================================
// Cycles
// ============================================================================

#[test]
fn test_declared_cycle_reports_every_edge() {
    let err = failure(
        vec![
            DescriptorBuilder::new("m1x").requires(requires_at("m1x", "m2x", 2)),
            DescriptorBuilder::new("m2x").requires(requires_at("m2x", "m3x", 2)),
            DescriptorBuilder::new("m3x").requires(requires_at("m3x", "m1x", 2)),
        ],
        RawOptions::default(),
    );

    assert_eq!(err.stage(), Stage::Resolution);
    assert_eq!(
        messages(err.diagnostics()),
        vec![
            "cyclic requires: m2x",
            "cyclic requires: m3x",
            "cyclic requires: m1x",
        ]
    );
    assert_eq!(err.to_string(), "resolution failed with 3 error(s)");
}

#[test]
fn test_long_acyclic_chain_resolves() {
    let mut builder = ModuleGraph::builder().roots(["m0x"]);
    builder.table().add_system(java_base());
    for i in 0..12_000 {
        let name = format!("m{}x", i);
        let mut module = DescriptorBuilder::new(name.as_str());
        if i + 1 < 12_000 {
            module = module.requires(Requires::new(format!("m{}x", i + 1)));
        }
        builder.table().add_source(module, format!("src/{}", name));
    }
    let graph = builder.build().unwrap();

    assert_eq!(graph.resolved().len(), 12_001);
    assert!(graph.resolved().cyclic().next().is_none());
    assert!(graph.reads(&id("m0x"), &id("m1x")));
}

#[test]
fn test_edge_into_cycle_is_not_reported() {
    let err = failure(
        vec![
            DescriptorBuilder::new("app").requires(requires_at("app", "m1x", 2)),
            DescriptorBuilder::new("m1x").requires(requires_at("m1x", "m2x", 2)),
            DescriptorBuilder::new("m2x").requires(requires_at("m2x", "m1x", 2)),
        ],
        RawOptions::default(),
    );

    assert_eq!(err.diagnostics().len(), 2);
    assert!(err
        .diagnostics()
        .iter()
        .all(|d| d.location.file != "src/app/module-info.java"));
}

#[test]
fn test_package_clash_between_readees() {
    let mut builder = ModuleGraph::builder();
    builder
        .table()
        .add_system(java_base())
        .add_source(
            DescriptorBuilder::new("app")
                .requires(Requires::new("lib1"))
                .requires(Requires::new("lib2")),
            "src/app",
        )
        .add_module_path(
            DescriptorBuilder::new("lib1").packages(["shared"]).exports("shared").build().unwrap(),
            "mods/lib1.jar",
        )
        .add_module_path(
            DescriptorBuilder::new("lib2").packages(["shared"]).exports("shared").build().unwrap(),
            "mods/lib2.jar",
        );

    let err = builder.build().unwrap_err();
    assert_eq!(err.stage(), Stage::Relations);
    assert_eq!(
        messages(err.diagnostics()),
        vec!["module app reads package shared from both lib1 and lib2"]
    );
}
