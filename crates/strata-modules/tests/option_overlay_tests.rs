//! Module options layered over declared directives

mod common;

use common::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use strata_modules::{Access, DescriptorBuilder, DiagnosticKind, Grant, RawOptions, Stage};

fn exports(values: &[&str]) -> RawOptions {
    RawOptions {
        add_exports: values.iter().map(|v| v.to_string()).collect(),
        ..RawOptions::default()
    }
}

fn reads(values: &[&str]) -> RawOptions {
    RawOptions {
        add_reads: values.iter().map(|v| v.to_string()).collect(),
        ..RawOptions::default()
    }
}

/// m1x contains p1 and exports nothing; m2x and m3x read m1x
fn modules() -> Vec<DescriptorBuilder> {
    vec![
        DescriptorBuilder::new("m1x").packages(["p1"]),
        DescriptorBuilder::new("m2x").requires(requires_at("m2x", "m1x", 2)),
        DescriptorBuilder::new("m3x").requires(requires_at("m3x", "m1x", 2)),
    ]
}

// ============================================================================
// Option syntax
// ============================================================================

#[rstest]
#[case(exports(&[""]), "no value for --add-exports option")]
#[case(exports(&["m1x/p1="]), "bad value for --add-exports option: 'm1x/p1='")]
#[case(exports(&["m1x=m2x"]), "bad value for --add-exports option: 'm1x=m2x'")]
#[case(reads(&[""]), "no value for --add-reads option")]
#[case(reads(&["m1x"]), "bad value for --add-reads option: 'm1x'")]
fn test_malformed_values_are_errors(#[case] options: RawOptions, #[case] message: &str) {
    let err = failure(modules(), options);
    assert_eq!(err.stage(), Stage::Options);
    assert_eq!(messages(err.diagnostics()), vec![message]);
}

#[test]
fn test_embedded_empty_target_is_skipped() {
    let graph = graph(modules(), exports(&["m1x/p1=m2x,,m3x"]));

    assert!(graph.diagnostics().is_empty());
    assert!(graph.query(&id("m2x"), &id("m1x"), "p1").is_allowed());
    assert!(graph.query(&id("m3x"), &id("m1x"), "p1").is_allowed());
}

#[test]
fn test_duplicate_target_same_as_single() {
    let once = graph(modules(), exports(&["m1x/p1=m2x"]));
    let twice = graph(modules(), exports(&["m1x/p1=m2x,m2x"]));

    assert_eq!(once.relations(), twice.relations());
    assert!(twice.diagnostics().is_empty());
}

#[test]
fn test_bad_name_is_a_warning_and_grants_nothing() {
    let graph = graph(modules(), exports(&["m1x/p1=2bad"]));

    assert_eq!(kinds(graph.diagnostics()), vec![DiagnosticKind::BadNameForOption]);
    assert_eq!(
        messages(graph.diagnostics()),
        vec!["bad name in value for --add-exports option: '2bad'"]
    );
    assert!(!graph.query(&id("m2x"), &id("m1x"), "p1").is_allowed());
}

#[test]
fn test_unknown_module_is_a_warning() {
    let graph = graph(modules(), exports(&["m1x/p1=nowhere", "ghost/p1=m2x"]));

    assert_eq!(
        messages(graph.diagnostics()),
        vec![
            "module for option --add-exports not found: ghost",
            "module for option --add-exports not found: nowhere",
        ]
    );
}

// ============================================================================
// Exports and opens
// ============================================================================

#[test]
fn test_add_exports_widens_qualified_export() {
    let sources = vec![
        DescriptorBuilder::new("a").packages(["p"]).exports_to("p", ["b"]),
        DescriptorBuilder::new("b").requires(requires_at("b", "a", 2)),
        DescriptorBuilder::new("c").requires(requires_at("c", "a", 2)),
    ];

    let before = graph(sources.clone(), RawOptions::default());
    assert!(before.query(&id("b"), &id("a"), "p").is_allowed());
    assert!(!before.query(&id("c"), &id("a"), "p").is_allowed());

    let after = graph(sources, exports(&["a/p=c"]));
    assert!(after.query(&id("b"), &id("a"), "p").is_allowed());
    assert_eq!(after.query(&id("c"), &id("a"), "p"), Access::Allowed);
}

#[test]
fn test_qualified_add_never_narrows_unqualified_export() {
    let sources = vec![
        DescriptorBuilder::new("a").packages(["p"]).exports("p"),
        DescriptorBuilder::new("b").requires(requires_at("b", "a", 2)),
        DescriptorBuilder::new("c").requires(requires_at("c", "a", 2)),
    ];
    let graph = graph(sources, exports(&["a/p=b"]));

    assert_eq!(
        graph.relations().exports.get(&id("a"), "p"),
        Some(&Grant::Unqualified)
    );
    assert!(graph.query(&id("c"), &id("a"), "p").is_allowed());
}

#[test]
fn test_add_exports_to_all_unnamed() {
    let graph = graph(modules(), exports(&["m1x/p1=ALL-UNNAMED"]));

    assert!(graph
        .query(&strata_modules::ModuleId::unnamed(), &id("m1x"), "p1")
        .is_allowed());
    assert!(!graph.query(&id("m2x"), &id("m1x"), "p1").is_allowed());
}

#[test]
fn test_add_opens_is_tracked_separately() {
    let graph = graph(
        modules(),
        RawOptions {
            add_opens: vec!["m1x/p1=m2x".into()],
            ..RawOptions::default()
        },
    );

    assert!(graph.query_opens(&id("m2x"), &id("m1x"), "p1").is_allowed());
    assert!(!graph.query(&id("m2x"), &id("m1x"), "p1").is_allowed());
}

// ============================================================================
// Reads
// ============================================================================

#[test]
fn test_add_reads_round_trip_and_idempotence() {
    let sources = || {
        vec![
            DescriptorBuilder::new("a").packages(["p"]).exports("p"),
            DescriptorBuilder::new("b"),
        ]
    };
    let once = graph(sources(), reads(&["b=a"]));
    let repeated = graph(sources(), reads(&["b=a", "b=a"]));

    assert!(once.reads(&id("b"), &id("a")));
    assert_eq!(once.relations().readability, repeated.relations().readability);
    assert_eq!(
        once.query(&id("b"), &id("a"), "p"),
        repeated.query(&id("b"), &id("a"), "p")
    );
}

#[test]
fn test_repeated_reads_accumulate_targets() {
    let graph = graph(
        vec![
            DescriptorBuilder::new("a"),
            DescriptorBuilder::new("b"),
            DescriptorBuilder::new("c"),
        ],
        reads(&["a=b", "a=c"]),
    );

    assert!(graph.reads(&id("a"), &id("b")));
    assert!(graph.reads(&id("a"), &id("c")));
}

#[test]
fn test_self_read_is_a_no_op() {
    let graph = graph(
        vec![DescriptorBuilder::new("a").packages(["p"])],
        reads(&["a=a"]),
    );

    assert!(graph.diagnostics().is_empty());
    assert!(graph.query(&id("a"), &id("a"), "p").is_allowed());
}

#[test]
fn test_cycle_through_add_reads_is_allowed() {
    let graph = graph(
        vec![
            DescriptorBuilder::new("m1x"),
            DescriptorBuilder::new("m2x"),
            DescriptorBuilder::new("m3x"),
        ],
        reads(&["m1x=m2x", "m2x=m3x", "m3x=m1x"]),
    );

    assert!(graph.diagnostics().is_empty());
    assert!(graph.reads(&id("m1x"), &id("m2x")));
    assert!(graph.reads(&id("m2x"), &id("m3x")));
    assert!(graph.reads(&id("m3x"), &id("m1x")));
}

// ============================================================================
// Patches and created files
// ============================================================================

#[test]
fn test_patch_module_attaches_roots() {
    let graph = graph(
        modules(),
        RawOptions {
            patch_module: vec!["m1x=patches/m1x".into()],
            ..RawOptions::default()
        },
    );

    let entry = graph.table().get("m1x").unwrap();
    assert_eq!(entry.patch_roots, vec![std::path::PathBuf::from("patches/m1x")]);
}

#[test]
fn test_patch_inside_other_module_source_root() {
    let err = failure(
        modules(),
        RawOptions {
            patch_module: vec!["m2x=src/m1x/extra".into()],
            ..RawOptions::default()
        },
    );

    assert_eq!(err.stage(), Stage::Table);
    assert_eq!(
        kinds(err.diagnostics()),
        vec![DiagnosticKind::PatchedAndOnModuleSourcePath]
    );
}

#[test]
fn test_patching_twice_is_an_error() {
    let err = failure(
        modules(),
        RawOptions {
            patch_module: vec!["m1x=patches/a".into(), "m1x=patches/b".into()],
            ..RawOptions::default()
        },
    );

    assert_eq!(err.stage(), Stage::Options);
    assert_eq!(kinds(err.diagnostics()), vec![DiagnosticKind::DuplicatePatch]);
}

#[test]
fn test_default_module_ignored_outside_multi_module_mode() {
    let graph = graph(
        modules(),
        RawOptions {
            default_module_for_created_files: Some("m1x".into()),
            ..RawOptions::default()
        },
    );

    assert_eq!(kinds(graph.diagnostics()), vec![DiagnosticKind::OptionIgnored]);
}
