use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logger;

use commands::{ModuleArgs, Session};

/// Module resolution and visibility checker.
///
/// Strata reads a strata.toml project, resolves its module graph, applies
/// command line module options and answers accessibility questions between
/// modules. Diagnostics use stable SMxxxx/SWxxxx codes.
///
/// EXAMPLES:
///     strata resolve                       Show the resolved module graph
///     strata check                         Check every [[reference]] site
///     strata query app lib com.lib.api     Can app access com.lib.api?
///     strata emit app --json               Module-info record for app
///
/// ENVIRONMENT VARIABLES:
///     STRATA_JSON         Set to '1' for JSON output by default
///     STRATA_WERROR       Treat warnings as errors
///     STRATA_BASE_MODULE  Override the base module (default java.base)
///     NO_COLOR            Set to disable colored output
///     RUST_LOG            Log filter when neither --verbose nor --quiet is given
#[derive(Parser)]
#[command(name = "strata")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to strata.toml, or a directory to search upwards from
    #[arg(long, global = true, value_name = "PATH")]
    project: Option<PathBuf>,
    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Errors only
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    no_color: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the module graph and list the resolved modules
    ///
    /// Prints every module in the resolved set with its origin and the
    /// modules it reads. Option warnings are reported on stderr.
    ///
    /// EXAMPLES:
    ///     strata resolve
    ///     strata resolve --add-modules java.sql
    ///     strata resolve --limit-modules java.base --json
    #[command(visible_alias = "r")]
    Resolve {
        /// Output in JSON format
        #[arg(long, env = "STRATA_JSON")]
        json: bool,
        #[command(flatten)]
        options: ModuleArgs,
    },

    /// Check the project's reference sites
    ///
    /// Evaluates every [[reference]] entry of strata.toml against the
    /// resolved graph and reports access denials and API leaks.
    ///
    /// EXAMPLES:
    ///     strata check
    ///     strata check --add-reads app=lib
    ///     strata check --werror --json
    #[command(visible_alias = "c")]
    Check {
        /// Output diagnostics in JSON format
        #[arg(long, env = "STRATA_JSON")]
        json: bool,
        #[command(flatten)]
        options: ModuleArgs,
    },

    /// Ask whether one module may access a package of another
    ///
    /// Use ALL-UNNAMED for the unnamed module on either side.
    ///
    /// EXAMPLES:
    ///     strata query app lib com.lib.api
    ///     strata query ALL-UNNAMED lib com.lib.internal
    ///     strata query app lib com.lib.model --opens
    #[command(visible_alias = "q")]
    Query {
        /// Module doing the access
        reader: String,
        /// Module containing the package
        module: String,
        /// Package being accessed
        package: String,
        /// Check reflective access (opens) instead of exports
        #[arg(long)]
        opens: bool,
        /// Output in JSON format
        #[arg(long, env = "STRATA_JSON")]
        json: bool,
        #[command(flatten)]
        options: ModuleArgs,
    },

    /// Print the module-info record of a resolved module
    ///
    /// EXAMPLES:
    ///     strata emit app
    ///     strata emit app --json
    Emit {
        /// Module name
        module: String,
        /// Output in JSON format
        #[arg(long, env = "STRATA_JSON")]
        json: bool,
        #[command(flatten)]
        options: ModuleArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_logger(cli.verbose, cli.quiet, cli.no_color);

    let project = cli.project.as_deref();
    match cli.command {
        Commands::Resolve { json, options } => {
            let session = Session::open(project, &options, json, cli.no_color)?;
            commands::resolve::run(&session)?;
        }
        Commands::Check { json, options } => {
            let session = Session::open(project, &options, json, cli.no_color)?;
            commands::check::run(&session)?;
        }
        Commands::Query {
            reader,
            module,
            package,
            opens,
            json,
            options,
        } => {
            let session = Session::open(project, &options, json, cli.no_color)?;
            let args = commands::query::QueryArgs {
                reader,
                module,
                package,
                opens,
            };
            commands::query::run(&session, &args)?;
        }
        Commands::Emit {
            module,
            json,
            options,
        } => {
            let session = Session::open(project, &options, json, cli.no_color)?;
            commands::emit::run(&session, &module)?;
        }
    }

    Ok(())
}
