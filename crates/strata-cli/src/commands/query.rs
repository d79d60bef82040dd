//! Query command - one accessibility question against the resolved graph

use super::{format_diagnostic, Session};
use anyhow::{bail, Result};
use colored::Colorize;
use serde_json::json;
use strata_modules::{project, Access, Location};

pub struct QueryArgs {
    pub reader: String,
    pub module: String,
    pub package: String,
    /// Reflective access instead of exports
    pub opens: bool,
}

pub fn run(session: &Session, args: &QueryArgs) -> Result<()> {
    let graph = session.graph()?;
    let reader = project::module_id(&args.reader);
    let exporter = project::module_id(&args.module);

    let access = if args.opens {
        graph.query_opens(&reader, &exporter, &args.package)
    } else {
        graph.query(&reader, &exporter, &args.package)
    };
    let relation = if args.opens { "opens" } else { "exports" };

    match &access {
        Access::Allowed => {
            if session.json {
                let report = json!({
                    "reader": reader.to_string(),
                    "module": exporter.to_string(),
                    "package": args.package,
                    "relation": relation,
                    "allowed": true,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{}: {} may access {}/{} ({})",
                    "allowed".green().bold(),
                    reader,
                    exporter,
                    args.package,
                    relation
                );
            }
            Ok(())
        }
        Access::Denied(denial) => {
            let diag = denial.to_diagnostic(Location::new("<query>", 0, 0));
            if session.json {
                let report = json!({
                    "reader": reader.to_string(),
                    "module": exporter.to_string(),
                    "package": args.package,
                    "relation": relation,
                    "allowed": false,
                    "diagnostic": diag,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                eprint!("{}", format_diagnostic(&diag));
            }
            bail!("access denied: {}", diag.message)
        }
    }
}
