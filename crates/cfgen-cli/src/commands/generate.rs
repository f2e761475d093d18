//! Generate command - Lower a graph document into Code-IR
//!
//! Runs import registration followed by symbol substitution and writes the
//! resulting module as JSON: the ordered import table plus every fixture
//! function with its rewritten body.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cfgen_config::CfgenConfig;
use cfgen_core::{
    import_symbols, replace_callables_and_configs_with_symbols, FixtureFunction, Import,
};
use clap::Args;
use serde::Serialize;
use tracing::info;

use super::{load_task, print_info};
use crate::GlobalOptions;

/// Arguments for the generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Graph document (JSON)
    input: PathBuf,

    /// Write output to a file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Emit compact JSON regardless of configuration
    #[arg(long)]
    compact: bool,
}

/// Generated module
#[derive(Debug, Serialize)]
pub struct GeneratedModule<'a> {
    /// Module imports in registration order
    pub imports: &'a [Import],
    /// Fixture functions, parents before children
    pub functions: Vec<&'a FixtureFunction>,
}

/// Execute the generate command
pub fn execute(args: GenerateArgs, global: &GlobalOptions, config: &CfgenConfig) -> Result<()> {
    let mut task = load_task(&args.input, config)?;

    let summary = import_symbols(&mut task).context("Failed to register imports")?;
    replace_callables_and_configs_with_symbols(&mut task)
        .context("Failed to replace config nodes with symbolic calls")?;

    let module = GeneratedModule {
        imports: task.import_manager.imports(),
        functions: task.all_fixture_functions(),
    };
    let json = if config.output.pretty && !args.compact {
        serde_json::to_string_pretty(&module)?
    } else {
        serde_json::to_string(&module)?
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_info(&format!("Wrote {}", path.display()), global.quiet);
        }
        None => println!("{}", json),
    }

    info!(
        functions = module.functions.len(),
        imports = module.imports.len(),
        config_nodes = summary.config_nodes,
        "generation complete"
    );
    Ok(())
}
