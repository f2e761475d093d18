//! Imports command - Show the import table for a graph document

use std::path::PathBuf;

use anyhow::{Context, Result};
use cfgen_config::CfgenConfig;
use cfgen_core::{import_symbols, Import, ImportSummary};
use clap::Args;
use serde::Serialize;

use super::load_task;
use crate::GlobalOptions;

/// Arguments for the imports command
#[derive(Args, Debug)]
pub struct ImportsArgs {
    /// Graph document (JSON)
    input: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Print import statements instead of a table
    #[arg(long, conflicts_with = "json")]
    statements: bool,
}

#[derive(Debug, Serialize)]
struct ImportsReport<'a> {
    imports: &'a [Import],
    config_nodes: usize,
    symbols: usize,
    skipped: usize,
}

/// Execute the imports command
pub fn execute(args: ImportsArgs, global: &GlobalOptions, config: &CfgenConfig) -> Result<()> {
    let mut task = load_task(&args.input, config)?;
    let summary = import_symbols(&mut task).context("Failed to register imports")?;
    let imports = task.import_manager.imports();

    if args.json {
        let report = ImportsReport {
            imports,
            config_nodes: summary.config_nodes,
            symbols: summary.symbols,
            skipped: summary.skipped,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if args.statements {
        for import in imports {
            println!("{}", import.statement());
        }
    } else {
        print_table(imports, &summary, global.quiet);
    }

    Ok(())
}

fn print_table(imports: &[Import], summary: &ImportSummary, quiet: bool) {
    let width = imports
        .iter()
        .map(|import| import.alias.len())
        .max()
        .unwrap_or(0)
        .max("ALIAS".len());

    println!("{:<width$}  MODULE", "ALIAS");
    for import in imports {
        println!("{:<width$}  {}", import.alias, import.module);
    }

    if !quiet {
        println!();
        println!(
            "{} import(s), {} config node(s), {} symbol(s), {} skipped",
            imports.len(),
            summary.config_nodes,
            summary.symbols,
            summary.skipped
        );
    }
}
