//! cfgen Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.cfgen/config.toml`
//! - Local config: `.cfgen/config.toml` (in the project directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::{ConfigError, FileOp};
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default configuration library module.
pub const DEFAULT_BASE_MODULE: &str = "fiddle";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Root configuration for cfgen.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CfgenConfig {
    /// Import naming configuration
    pub imports: ImportsConfig,

    /// Output configuration
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Import naming configuration.
///
/// # Example TOML
///
/// ```toml
/// [imports]
/// base_module = "fiddle"
/// collision = "suffix"  # or "qualify"
/// reserved_names = ["config"]
///
/// [imports.aliases]
/// fiddle = "fdl"
/// "numpy" = "np"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportsConfig {
    /// Module providing the `Config`/`Partial`/`ArgFactory` wrapper types
    pub base_module: String,

    /// Preferred alias per module path
    pub aliases: BTreeMap<String, String>,

    /// Alias collision policy
    pub collision: CollisionPolicy,

    /// Names generated code must never bind
    pub reserved_names: Vec<String>,
}

impl Default for ImportsConfig {
    fn default() -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert(DEFAULT_BASE_MODULE.to_string(), "fdl".to_string());
        Self {
            base_module: DEFAULT_BASE_MODULE.to_string(),
            aliases,
            collision: CollisionPolicy::default(),
            reserved_names: Vec::new(),
        }
    }
}

impl ImportsConfig {
    /// Validate module paths and aliases.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_module_path(&self.base_module) {
            return Err(ConfigError::InvalidBaseModule(self.base_module.clone()));
        }
        for (module, alias) in &self.aliases {
            if !is_module_path(module) {
                return Err(ConfigError::InvalidAliasModule(module.clone()));
            }
            if !is_identifier(alias) {
                return Err(ConfigError::InvalidAlias {
                    module: module.clone(),
                    alias: alias.clone(),
                });
            }
        }
        Ok(())
    }
}

/// How module aliases are disambiguated when the preferred alias is taken.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Append `_2`, `_3`, ... (default)
    #[default]
    Suffix,
    /// Prefix more module path segments before falling back to suffixes
    Qualify,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Suffix => write!(f, "suffix"),
            Self::Qualify => write!(f, "qualify"),
        }
    }
}

impl std::str::FromStr for CollisionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "suffix" => Ok(Self::Suffix),
            "qualify" => Ok(Self::Qualify),
            _ => Err(ConfigError::UnknownCollisionPolicy(s.to_string())),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print generated JSON
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override base module
    pub base_module: Option<String>,

    /// Override collision policy
    pub collision: Option<CollisionPolicy>,

    /// Override log level
    pub log_level: Option<String>,

    /// Override pretty printing
    pub pretty: Option<bool>,
}

impl CfgenConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref module) = overrides.base_module {
            self.imports.base_module = module.clone();
        }

        if let Some(collision) = overrides.collision {
            self.imports.collision = collision;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }

        if let Some(pretty) = overrides.pretty {
            self.output.pretty = pretty;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.imports.validate()?;
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::UnknownLogLevel {
                level: self.logging.level.clone(),
                valid: LOG_LEVELS,
            });
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => chars.all(|c| c == '_' || c.is_alphanumeric()),
        _ => false,
    }
}

fn is_module_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(is_identifier)
}
