//! Configuration error types.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Filesystem operation that failed on a config path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Read,
    Write,
    CreateDir,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileOp::Read => "read config file",
            FileOp::Write => "write config file",
            FileOp::CreateDir => "create config directory",
        })
    }
}

/// Errors raised while loading, saving or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot {op} '{path}': {source}")]
    Io {
        op: FileOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot render config as TOML: {0}")]
    Render(#[from] toml::ser::Error),

    /// No home directory, so `~/.cfgen` cannot be located
    #[error("could not determine home directory")]
    NoHomeDir,

    /// `imports.base_module` is not a dotted module path
    #[error("imports.base_module: '{0}' is not a dotted module path")]
    InvalidBaseModule(String),

    /// A key of `[imports.aliases]` is not a dotted module path
    #[error("imports.aliases: '{0}' is not a dotted module path")]
    InvalidAliasModule(String),

    /// An alias that generated code could not bind
    #[error("imports.aliases.{module}: '{alias}' is not a valid identifier")]
    InvalidAlias { module: String, alias: String },

    #[error("imports.collision: unknown policy '{0}'. Valid values: suffix, qualify")]
    UnknownCollisionPolicy(String),

    #[error("logging.level: unknown level '{level}'. Valid values: {}", valid.join(", "))]
    UnknownLogLevel {
        level: String,
        valid: &'static [&'static str],
    },
}

impl ConfigError {
    pub(crate) fn io(op: FileOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
