//! Config command - View and manage configuration
//!
//! - Show the effective configuration
//! - Show configuration file paths
//! - Create a default configuration file (local or global)

use std::path::PathBuf;

use anyhow::{Context, Result};
use cfgen_config::{CfgenConfig, ConfigLoader};
use clap::Subcommand;
use serde::Serialize;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show(ShowArgs),

    /// Show configuration file paths
    Path(PathArgs),

    /// Create a default configuration file
    Init(InitArgs),
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the init command
#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Create the global config (~/.cfgen/config.toml) instead of a local one
    #[arg(long)]
    global: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, config: &CfgenConfig) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => execute_show(args, config),
        ConfigCommand::Path(args) => execute_path(args),
        ConfigCommand::Init(args) => execute_init(args),
    }
}

fn execute_show(args: ShowArgs, config: &CfgenConfig) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

fn execute_path(args: PathArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let loader = ConfigLoader::new();

    let global = loader.global_config_path();
    let local = loader.local_config_path(&cwd);
    let paths = ConfigPaths {
        global_exists: global.as_ref().is_some_and(|p| p.exists()),
        local_exists: local.exists(),
        global,
        local,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
    } else {
        match paths.global {
            Some(ref path) => println!("global: {}{}", path.display(), marker(paths.global_exists)),
            None => println!("global: (no home directory)"),
        }
        println!("local:  {}{}", paths.local.display(), marker(paths.local_exists));
    }
    Ok(())
}

fn execute_init(args: InitArgs) -> Result<()> {
    let loader = ConfigLoader::new();
    let path = if args.global {
        loader
            .init_global()
            .context("Failed to create global config")?
    } else {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        loader
            .init_local(&cwd)
            .context("Failed to create local config")?
    };

    println!("{}", path.display());
    Ok(())
}

fn marker(exists: bool) -> &'static str {
    if exists {
        ""
    } else {
        " (not found)"
    }
}
