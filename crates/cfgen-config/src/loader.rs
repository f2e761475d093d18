//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.cfgen/config.toml`
//! 2. Local config: `.cfgen/config.toml` (in the project directory)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::{ConfigError, FileOp};
use crate::{
    CfgenConfig, CollisionPolicy, ConfigOverrides, ImportsConfig, LoggingConfig, OutputConfig,
};
use crate::{DEFAULT_BASE_MODULE, DEFAULT_LOG_LEVEL};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".cfgen";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".cfgen";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.cfgen`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<CfgenConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.cfgen`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a project directory.
    pub fn local_config_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a project with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides.
    pub fn load(
        &mut self,
        project_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<CfgenConfig, ConfigError> {
        let mut config = CfgenConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(project_root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        Ok(config)
    }

    /// Load an explicit config file over the defaults, then apply overrides.
    ///
    /// Global and local files are not consulted.
    pub fn load_file(
        &self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<CfgenConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let mut config = merge_configs(CfgenConfig::default(), load_config_file(path)?);
        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<CfgenConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;
        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a project.
    pub fn load_local(&self, project_root: &Path) -> Result<Option<CfgenConfig>, ConfigError> {
        let local_path = self.local_config_path(project_root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Initialize the global configuration directory.
    ///
    /// Creates `~/.cfgen/config.toml` with default configuration.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };
        init_config_dir(global_dir)
    }

    /// Initialize local configuration for a project.
    ///
    /// Creates `.cfgen/config.toml` with default configuration.
    pub fn init_local(&self, project_root: &Path) -> Result<PathBuf, ConfigError> {
        init_config_dir(&project_root.join(LOCAL_CONFIG_DIR))
    }

    /// Clear cached global configuration.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

/// Write a default config file into `dir` unless one exists.
fn init_config_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::io(FileOp::CreateDir, dir, e))?;
    }

    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        save_config_file(&config_path, &CfgenConfig::default())?;
    }

    Ok(config_path)
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<CfgenConfig, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::io(FileOp::Read, path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &CfgenConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::io(FileOp::CreateDir, parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::io(FileOp::Write, path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// This performs a field-by-field merge, allowing partial configs.
fn merge_configs(base: CfgenConfig, overlay: CfgenConfig) -> CfgenConfig {
    CfgenConfig {
        imports: merge_imports(base.imports, overlay.imports),
        output: merge_output(base.output, overlay.output),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

/// Merge import config. Aliases and reserved names accumulate.
fn merge_imports(base: ImportsConfig, overlay: ImportsConfig) -> ImportsConfig {
    ImportsConfig {
        base_module: if overlay.base_module != DEFAULT_BASE_MODULE {
            overlay.base_module
        } else {
            base.base_module
        },
        aliases: {
            let mut aliases = base.aliases;
            aliases.extend(overlay.aliases);
            aliases
        },
        collision: if overlay.collision != CollisionPolicy::default() {
            overlay.collision
        } else {
            base.collision
        },
        reserved_names: {
            let mut names = base.reserved_names;
            for name in overlay.reserved_names {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            names
        },
    }
}

/// Merge output config; `pretty = false` from either side wins.
fn merge_output(base: OutputConfig, overlay: OutputConfig) -> OutputConfig {
    OutputConfig {
        pretty: base.pretty && overlay.pretty,
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    LoggingConfig {
        level: if overlay.level != DEFAULT_LOG_LEVEL {
            overlay.level
        } else {
            base.level
        },
    }
}
