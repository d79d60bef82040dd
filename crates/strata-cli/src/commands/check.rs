//! Check command - evaluate the reference sites of a project

use super::Session;
use anyhow::{bail, Result};
use colored::Colorize;
use rayon::prelude::*;
use strata_modules::{has_errors, project, sort_diagnostics, Diagnostic};
use tracing::debug;

/// Resolve the project and check every `[[reference]]` entry
///
/// Reference sites are independent queries against the immutable graph, so
/// they are evaluated in parallel.
pub fn run(session: &Session) -> Result<()> {
    let graph = session.graph()?;
    let references = &session.config.project.references;
    debug!(references = references.len(), "checking reference sites");

    let mut diagnostics: Vec<Diagnostic> = graph.diagnostics().to_vec();
    diagnostics.par_extend(
        references
            .par_iter()
            .filter_map(|reference| project::check_reference(&graph, reference)),
    );
    sort_diagnostics(&mut diagnostics);

    session.report(&diagnostics)?;

    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics.len() - errors;
    if !session.json {
        let summary = format!(
            "checked {} reference(s): {} error(s), {} warning(s)",
            references.len(),
            errors,
            warnings
        );
        if errors > 0 {
            eprintln!("{}", summary.red());
        } else {
            println!("{}", summary.green());
        }
    }

    if has_errors(&diagnostics) {
        bail!("check failed with {} error(s)", errors);
    }
    Ok(())
}
