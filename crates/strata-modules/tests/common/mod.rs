//! Shared helpers for module graph tests

#![allow(dead_code)]

use strata_modules::{
    AssemblyError, DescriptorBuilder, Diagnostic, DiagnosticKind, ModuleDescriptor, ModuleGraph,
    ModuleId, RawOptions, Requires,
};

pub use strata_modules::Location;

/// Location of line `line` in the declaration of `module`
pub fn decl(module: &str, line: usize) -> Location {
    Location::new(format!("src/{}/module-info.java", module), line, 5)
}

/// `requires target;` declared on `line` of `module`
pub fn requires_at(module: &str, target: &str, line: usize) -> Requires {
    Requires::new(target).at(decl(module, line))
}

pub fn id(name: &str) -> ModuleId {
    ModuleId::new(name)
}

/// A small platform: `java.base` exporting `java.lang`
pub fn java_base() -> ModuleDescriptor {
    DescriptorBuilder::system("java.base")
        .packages(["java.lang"])
        .exports("java.lang")
        .build()
        .unwrap()
}

/// Assemble a graph of source modules over `java_base()`
pub fn assemble(
    sources: Vec<DescriptorBuilder>,
    options: RawOptions,
) -> Result<ModuleGraph, AssemblyError> {
    let mut builder = ModuleGraph::builder().options(options);
    builder.table().add_system(java_base());
    for source in sources {
        let root = format!("src/{}", source.name());
        builder.table().add_source(source, root);
    }
    builder.build()
}

/// Assemble and expect success
pub fn graph(sources: Vec<DescriptorBuilder>, options: RawOptions) -> ModuleGraph {
    match assemble(sources, options) {
        Ok(graph) => graph,
        Err(err) => panic!("assembly failed: {err}: {:#?}", err.diagnostics()),
    }
}

/// Assemble and expect failure
pub fn failure(sources: Vec<DescriptorBuilder>, options: RawOptions) -> AssemblyError {
    match assemble(sources, options) {
        Ok(_) => panic!("expected assembly to fail"),
        Err(err) => err,
    }
}

pub fn kinds(diagnostics: &[Diagnostic]) -> Vec<DiagnosticKind> {
    diagnostics.iter().map(|d| d.kind).collect()
}

pub fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| d.message.clone()).collect()
}
