//! CLI command implementations

pub mod config;
pub mod generate;
pub mod imports;

use std::path::Path;

use anyhow::{Context, Result};
use cfgen_config::{CfgenConfig, CollisionPolicy, ConfigLoader};
use cfgen_core::{CodegenConfig, CodegenTask, CollisionStrategy, GraphDocument, ImportConfig};
use tracing::debug;

use crate::GlobalOptions;

/// Load and validate configuration, applying CLI overrides.
///
/// An explicit `--config` file replaces the global/local lookup.
pub fn load_config(global: &GlobalOptions) -> Result<CfgenConfig> {
    let overrides = global.to_config_overrides();
    let mut loader = ConfigLoader::new();

    let config = if let Some(ref config_path) = global.config {
        loader
            .load_file(config_path, Some(&overrides))
            .with_context(|| format!("Failed to load config file {}", config_path.display()))?
    } else {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        loader
            .load(&cwd, Some(&overrides))
            .context("Failed to load configuration")?
    };

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Map file-based configuration onto the code generator's settings.
pub fn codegen_config(config: &CfgenConfig) -> CodegenConfig {
    CodegenConfig {
        base_module: config.imports.base_module.clone(),
        imports: ImportConfig {
            aliases: config.imports.aliases.clone(),
            collision: match config.imports.collision {
                CollisionPolicy::Suffix => CollisionStrategy::Suffix,
                CollisionPolicy::Qualify => CollisionStrategy::Qualify,
            },
            reserved_names: config.imports.reserved_names.clone(),
        },
    }
}

/// Read a graph document and build a code generation task from it.
pub fn load_task(input: &Path, config: &CfgenConfig) -> Result<CodegenTask> {
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let document = GraphDocument::from_json(&json)
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    debug!(nodes = document.nodes.len(), input = %input.display(), "loaded graph document");

    document
        .into_task(codegen_config(config))
        .with_context(|| format!("Invalid graph document {}", input.display()))
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
