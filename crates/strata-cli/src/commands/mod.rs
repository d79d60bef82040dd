//! Command implementations
//!
//! Every command opens a [`Session`]: the loaded configuration with command
//! line options layered on top, plus the output settings.

pub mod check;
pub mod emit;
pub mod query;
pub mod resolve;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::env;
use std::path::Path;
use strata_config::{Config, ConfigLoader, OptionsConfig};
use strata_modules::{project, Diagnostic, DiagnosticLevel, ModuleGraph};
use tracing::{debug, info};

/// Module options accepted by every command
///
/// Values are appended to the `[options]` table of strata.toml.
#[derive(Args, Debug, Default, Clone)]
pub struct ModuleArgs {
    /// Add a readability edge: <module>=<other>(,<other>)*
    #[arg(long = "add-reads", value_name = "VALUE")]
    pub add_reads: Vec<String>,
    /// Export a package: <module>/<package>=<other>(,<other>)*
    #[arg(long = "add-exports", value_name = "VALUE")]
    pub add_exports: Vec<String>,
    /// Open a package: <module>/<package>=<other>(,<other>)*
    #[arg(long = "add-opens", value_name = "VALUE")]
    pub add_opens: Vec<String>,
    /// Extra root modules, or ALL-SYSTEM / ALL-MODULE-PATH / ALL-DEFAULT
    #[arg(long = "add-modules", value_name = "MODULES")]
    pub add_modules: Vec<String>,
    /// Limit the observable modules
    #[arg(long = "limit-modules", value_name = "MODULES")]
    pub limit_modules: Vec<String>,
    /// Patch a module: <module>=<path>(:<path>)*
    #[arg(long = "patch-module", value_name = "VALUE")]
    pub patch_module: Vec<String>,
    /// Module that owns files created outside any module root
    #[arg(long = "default-module-for-created-files", value_name = "MODULE")]
    pub default_module_for_created_files: Option<String>,
    /// Treat warnings as errors
    #[arg(long)]
    pub werror: bool,
}

impl ModuleArgs {
    fn to_options(&self) -> OptionsConfig {
        OptionsConfig {
            add_reads: self.add_reads.clone(),
            add_exports: self.add_exports.clone(),
            add_opens: self.add_opens.clone(),
            add_modules: self.add_modules.clone(),
            limit_modules: self.limit_modules.clone(),
            patch_module: self.patch_module.clone(),
            default_module_for_created_files: self.default_module_for_created_files.clone(),
        }
    }
}

/// Loaded project and output settings for one command
pub struct Session {
    pub config: Config,
    pub json: bool,
}

impl Session {
    /// Load strata.toml and layer the command line options on top
    pub fn open(
        project: Option<&Path>,
        args: &ModuleArgs,
        json: bool,
        no_color: bool,
    ) -> Result<Self> {
        let mut loader = ConfigLoader::new();
        let mut config = match project {
            Some(path) if path.is_file() => loader
                .load_from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            Some(dir) => loader
                .load_from_directory(dir)
                .with_context(|| format!("Failed to load configuration from {}", dir.display()))?,
            None => {
                let cwd = env::current_dir().context("Failed to read current directory")?;
                loader
                    .load_from_directory(&cwd)
                    .context("Failed to load configuration")?
            }
        };

        if !config.is_project() {
            bail!("no strata.toml found; run inside a project or pass --project");
        }

        config
            .project
            .options
            .get_or_insert_with(OptionsConfig::default)
            .extend(&args.to_options());
        if args.werror {
            config.project.compilation_mut().werror = Some(true);
        }

        let json = json || config.output_format() == "json";
        let color = !no_color && config.global.color().unwrap_or(true);
        if !color {
            colored::control::set_override(false);
        }

        debug!(
            project = config.project_name().unwrap_or("<unnamed>"),
            json, "session opened"
        );
        Ok(Self { config, json })
    }

    /// Assemble the module graph, reporting diagnostics of a failed stage
    pub fn graph(&self) -> Result<ModuleGraph> {
        match project::graph_builder(&self.config).build() {
            Ok(graph) => {
                info!(modules = graph.resolved().len(), "module graph resolved");
                Ok(graph)
            }
            Err(err) => {
                self.report(err.diagnostics())?;
                Err(anyhow!(err))
            }
        }
    }

    /// Print diagnostics: a JSON array on stdout, or human text on stderr
    pub fn report(&self, diagnostics: &[Diagnostic]) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(diagnostics)?);
            return Ok(());
        }
        for diag in diagnostics {
            eprint!("{}", format_diagnostic(diag));
        }
        Ok(())
    }
}

/// Human rendering with a colored header line
pub fn format_diagnostic(diag: &Diagnostic) -> String {
    let text = diag.to_human_string();
    let (header, rest) = text.split_once('\n').unwrap_or((text.as_str(), ""));
    let header = match diag.level {
        DiagnosticLevel::Error => header.red().bold(),
        DiagnosticLevel::Warning => header.yellow().bold(),
    };
    format!("{}\n{}", header, rest)
}
