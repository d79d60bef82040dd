//! Assemble-then-freeze pipeline
//!
//! Runs option parsing, table construction, resolution, the option overlay,
//! relation computation and declaration lints in that order. A stage that
//! reports an error stops the pipeline. The resulting [`ModuleGraph`] is
//! immutable and can be shared between threads.

use crate::access::{Access, QueryService, Relations};
use crate::diagnostic::{has_errors, promote_warnings, sort_diagnostics, Diagnostic};
use crate::emit::ModuleInfo;
use crate::lint::{check_declarations, LintConfig};
use crate::location::Location;
use crate::name::ModuleId;
use crate::options::{ModuleOptions, OptionOverlay, RawOptions};
use crate::resolver::{resolve, ResolvedModuleSet};
use crate::table::{ModuleTable, ModuleTableBuilder};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Options,
    Table,
    Resolution,
    Overlay,
    Relations,
    Lints,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Options => "option parsing",
            Stage::Table => "module table",
            Stage::Resolution => "resolution",
            Stage::Overlay => "option overlay",
            Stage::Relations => "readability",
            Stage::Lints => "declaration checks",
        };
        f.write_str(name)
    }
}

/// Failure to assemble a module graph
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("{stage} failed with {errors} error(s)")]
    StageFailed {
        stage: Stage,
        errors: usize,
        /// Every diagnostic reported up to and including the failing stage
        diagnostics: Vec<Diagnostic>,
    },
}

impl AssemblyError {
    pub fn stage(&self) -> Stage {
        match self {
            AssemblyError::StageFailed { stage, .. } => *stage,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            AssemblyError::StageFailed { diagnostics, .. } => diagnostics,
        }
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            AssemblyError::StageFailed { diagnostics, .. } => diagnostics,
        }
    }
}

/// Inputs of the pipeline
#[derive(Debug, Default)]
pub struct ModuleGraphBuilder {
    table: ModuleTableBuilder,
    options: RawOptions,
    roots: Option<Vec<ModuleId>>,
    lint: LintConfig,
    werror: bool,
}

impl ModuleGraphBuilder {
    /// Table inputs: sources, module path, system image, class path
    pub fn table(&mut self) -> &mut ModuleTableBuilder {
        &mut self.table
    }

    pub fn options(mut self, options: RawOptions) -> Self {
        self.options = options;
        self
    }

    /// Override the modules being compiled; defaults to every source module
    pub fn roots<I, M>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<ModuleId>,
    {
        self.roots = Some(roots.into_iter().map(Into::into).collect());
        self
    }

    pub fn lint(mut self, lint: LintConfig) -> Self {
        self.lint = lint;
        self
    }

    /// Treat warnings as errors
    pub fn werror(mut self, werror: bool) -> Self {
        self.werror = werror;
        self
    }

    /// Run the pipeline
    pub fn build(self) -> Result<ModuleGraph, AssemblyError> {
        let mut pipeline = Pipeline {
            werror: self.werror,
            diagnostics: Vec::new(),
        };

        let multi_module = self.table.is_multi_module();
        let (options, found) = ModuleOptions::parse(&self.options, multi_module);
        pipeline.finish(Stage::Options, found)?;

        let mut table_builder = self.table;
        for patch in &options.patches {
            table_builder.patch(patch.clone());
        }
        let (table, found) = table_builder.build();
        pipeline.finish(Stage::Table, found)?;

        let roots = self
            .roots
            .unwrap_or_else(|| table.source_modules().map(|e| e.name().clone()).collect());
        let (resolved, found) = resolve(&table, &options, roots);
        pipeline.finish(Stage::Resolution, found)?;

        let (overlay, found) = OptionOverlay::apply(&table, &resolved, &options);
        pipeline.finish(Stage::Overlay, found)?;

        let (relations, found) = Relations::compute(&table, &resolved, &overlay);
        pipeline.finish(Stage::Relations, found)?;

        let found = check_declarations(&table, &resolved, &self.lint);
        pipeline.finish(Stage::Lints, found)?;

        info!(
            modules = resolved.len(),
            warnings = pipeline.diagnostics.len(),
            "module graph assembled"
        );
        Ok(ModuleGraph {
            table,
            resolved,
            relations,
            lint: self.lint,
            werror: self.werror,
            diagnostics: pipeline.diagnostics,
        })
    }
}

struct Pipeline {
    werror: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Pipeline {
    fn finish(&mut self, stage: Stage, mut found: Vec<Diagnostic>) -> Result<(), AssemblyError> {
        if self.werror {
            promote_warnings(&mut found);
        }
        let failed = has_errors(&found);
        debug!(%stage, diagnostics = found.len(), failed, "stage finished");
        self.diagnostics.extend(found);

        if failed {
            let mut diagnostics = std::mem::take(&mut self.diagnostics);
            sort_diagnostics(&mut diagnostics);
            let errors = diagnostics.iter().filter(|d| d.is_error()).count();
            return Err(AssemblyError::StageFailed {
                stage,
                errors,
                diagnostics,
            });
        }
        Ok(())
    }
}

/// A resolved, frozen module graph
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    table: ModuleTable,
    resolved: ResolvedModuleSet,
    relations: Relations,
    lint: LintConfig,
    werror: bool,
    diagnostics: Vec<Diagnostic>,
}

impl ModuleGraph {
    pub fn builder() -> ModuleGraphBuilder {
        ModuleGraphBuilder::default()
    }

    pub fn table(&self) -> &ModuleTable {
        &self.table
    }

    pub fn resolved(&self) -> &ResolvedModuleSet {
        &self.resolved
    }

    pub fn relations(&self) -> &Relations {
        &self.relations
    }

    /// Warnings reported while assembling the graph
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn queries(&self) -> QueryService<'_> {
        QueryService::new(&self.table, &self.resolved, &self.relations)
    }

    pub fn reads(&self, reader: &ModuleId, readee: &ModuleId) -> bool {
        self.relations.readability.reads(reader, readee)
    }

    pub fn query(&self, reader: &ModuleId, exporter: &ModuleId, package: &str) -> Access {
        self.queries().query(reader, exporter, package)
    }

    pub fn query_opens(&self, reader: &ModuleId, exporter: &ModuleId, package: &str) -> Access {
        self.queries().query_opens(reader, exporter, package)
    }

    /// API leak check, honoring the `exports` lint switch and `werror`
    pub fn check_api_leak(
        &self,
        declaring: &ModuleId,
        api_package: &str,
        referenced: &ModuleId,
        referenced_package: &str,
        location: Location,
    ) -> Option<Diagnostic> {
        if !self.lint.exports {
            return None;
        }
        let mut diag = self.queries().check_api_leak(
            declaring,
            api_package,
            referenced,
            referenced_package,
            location,
        )?;
        if self.werror {
            promote_warnings(std::slice::from_mut(&mut diag));
        }
        Some(diag)
    }

    /// Emission record of a resolved named module
    pub fn module_info(&self, module: &str) -> Option<ModuleInfo> {
        let entry = self.table.get(module)?;
        if !self.resolved.contains(entry.name()) {
            return None;
        }
        Some(ModuleInfo::from_descriptor(
            &entry.descriptor,
            self.table.base_module(),
        ))
    }
}
