//! Resolve command - list the resolved module graph

use super::Session;
use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::collections::BTreeSet;
use strata_modules::{ModuleGraph, ModuleId};

struct ResolvedModule<'a> {
    name: &'a ModuleId,
    origin: String,
    automatic: bool,
    reads: Vec<String>,
}

fn describe<'a>(graph: &'a ModuleGraph, name: &'a ModuleId) -> ResolvedModule<'a> {
    let entry = graph.table().get(name.as_str());
    let reads: BTreeSet<String> = graph
        .relations()
        .readability
        .readees(name)
        .filter(|readee| *readee != name)
        .map(ToString::to_string)
        .collect();
    ResolvedModule {
        name,
        origin: entry
            .map(|e| e.origin.to_string())
            .unwrap_or_else(|| "class path".to_string()),
        automatic: entry.is_some_and(|e| e.is_automatic()),
        reads: reads.into_iter().collect(),
    }
}

/// Resolve the project and print the resolved modules
pub fn run(session: &Session) -> Result<()> {
    let graph = session.graph()?;
    let modules: Vec<ResolvedModule> = graph
        .resolved()
        .sorted()
        .into_iter()
        .map(|name| describe(&graph, name))
        .collect();
    let roots: Vec<String> = graph.resolved().roots().iter().map(ToString::to_string).collect();

    if session.json {
        let report = json!({
            "roots": roots,
            "modules": modules.iter().map(|m| json!({
                "name": m.name.to_string(),
                "origin": m.origin,
                "automatic": m.automatic,
                "reads": m.reads,
            })).collect::<Vec<_>>(),
            "diagnostics": graph.diagnostics(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    session.report(graph.diagnostics())?;
    println!(
        "{} {} module(s) (roots: {})",
        "resolved".green().bold(),
        modules.len(),
        roots.join(", ")
    );
    let width = modules
        .iter()
        .map(|m| m.name.as_str().len())
        .max()
        .unwrap_or(0);
    for module in &modules {
        let marker = if module.automatic { " [automatic]" } else { "" };
        println!(
            "  {:<width$}  {}{}",
            module.name.to_string(),
            module.origin,
            marker,
            width = width
        );
        if !module.reads.is_empty() {
            println!("  {:<width$}    reads {}", "", module.reads.join(", "), width = width);
        }
    }
    Ok(())
}
