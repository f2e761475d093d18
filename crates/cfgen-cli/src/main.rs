//! cfgen CLI - Symbolic code generation for configuration graphs
//!
//! Reads a JSON graph document, runs the import registration and symbol
//! substitution passes, and writes the resulting imports and fixture bodies.
//!
//! # Usage
//!
//! ```bash
//! # Generate Code-IR for a graph document
//! cfgen generate model.json -o model.ir.json
//!
//! # Show the imports a document needs
//! cfgen imports model.json
//!
//! # Show the effective configuration
//! cfgen config show
//! ```

use std::path::PathBuf;

use anyhow::Result;
use cfgen_config::{CollisionPolicy, ConfigOverrides};
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

/// cfgen - Symbolic code generation for configuration graphs
#[derive(Parser, Debug)]
#[command(name = "cfgen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "CFGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Module providing the Config/Partial/ArgFactory wrapper types
    #[arg(long, global = true, env = "CFGEN_BASE_MODULE")]
    base_module: Option<String>,

    /// Import alias collision policy (suffix, qualify)
    #[arg(long, global = true, value_parser = parse_collision)]
    collision: Option<CollisionPolicy>,
}

/// Parse collision policy from string
fn parse_collision(s: &str) -> Result<CollisionPolicy, String> {
    s.parse()
        .map_err(|e: cfgen_config::ConfigError| e.to_string())
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_module: self.base_module.clone(),
            collision: self.collision,
            log_level: if self.quiet {
                Some("error".to_string())
            } else if self.verbose {
                Some("debug".to_string())
            } else {
                None
            },
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate Code-IR for a graph document
    Generate(commands::generate::GenerateArgs),

    /// Show the imports a graph document needs
    Imports(commands::imports::ImportsArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // --quiet/--verbose already override logging.level
    let config = commands::load_config(&cli.global)?;
    let log_level: Level = config.logging.level.parse().unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, &cli.global, &config),
        Commands::Imports(args) => commands::imports::execute(args, &cli.global, &config),
        Commands::Config(cmd) => commands::config::execute(cmd, &config),
    }
}
