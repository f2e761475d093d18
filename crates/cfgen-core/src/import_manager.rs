//! Import Management
//!
//! The [`ImportManager`] owns the import list of a generated module and the
//! name under which each symbol is referenced. Registration is idempotent:
//! asking for the same symbol twice yields the same name, and distinct
//! symbols never share a name.
//!
//! Modules are imported under a short alias (`import models.layers as
//! layers`), so a symbol name has the form `alias.qualname`. Symbols from the
//! builtins module are referenced by their bare name.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::namespace::Namespace;
use crate::value::{is_dotted_path, is_identifier, resolve_import_path, Symbol, BUILTINS_MODULE};

/// Errors raised while registering imports.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("cannot import '{symbol}': it has no stable module-qualified name")]
    Unresolvable { symbol: String },

    #[error("invalid module path '{0}'")]
    InvalidModulePath(String),
}

/// How a module alias is chosen when the preferred one is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionStrategy {
    /// `layers`, `layers_2`, `layers_3`, ...
    #[default]
    Suffix,
    /// `layers`, `nn_layers`, `models_nn_layers`, then suffixes
    Qualify,
}

/// Settings for an [`ImportManager`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportConfig {
    /// Preferred alias per module path
    pub aliases: BTreeMap<String, String>,
    pub collision: CollisionStrategy,
    /// Extra names generated code must not bind
    pub reserved_names: Vec<String>,
}

/// One `import module as alias` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    pub module: String,
    pub alias: String,
}

impl Import {
    /// Render as an import statement
    pub fn statement(&self) -> String {
        let last = self.module.rsplit('.').next().unwrap_or(&self.module);
        if self.module == self.alias {
            format!("import {}", self.module)
        } else if last == self.alias && self.module.contains('.') {
            let (package, _) = self.module.rsplit_once('.').unwrap_or(("", ""));
            format!("from {package} import {}", self.alias)
        } else {
            format!("import {} as {}", self.module, self.alias)
        }
    }
}

/// Registry of imports and symbol names for one generated module.
#[derive(Debug, Clone)]
pub struct ImportManager {
    config: ImportConfig,
    namespace: Namespace,
    imports: Vec<Import>,
    module_index: HashMap<String, usize>,
    names: HashMap<(String, String), String>,
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new(ImportConfig::default())
    }
}

impl ImportManager {
    /// Create an import manager.
    ///
    /// Configured aliases that are not identifiers are dropped with a
    /// warning.
    pub fn new(mut config: ImportConfig) -> Self {
        config.aliases.retain(|module, alias| {
            let valid = is_identifier(alias);
            if !valid {
                warn!(module = %module, alias = %alias, "ignoring invalid import alias");
            }
            valid
        });

        let mut namespace = Namespace::new();
        for name in &config.reserved_names {
            namespace.add(name.clone());
        }

        Self {
            config,
            namespace,
            imports: Vec::new(),
            module_index: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Register `symbol` and return the name generated code uses for it.
    pub fn add(&mut self, symbol: &Symbol) -> Result<String, ImportError> {
        let (module, qualname) = symbol.key();
        if let Some(name) = self.names.get(&(module.to_string(), qualname.to_string())) {
            trace!(symbol = %symbol, name = %name, "import already registered");
            return Ok(name.clone());
        }

        let path = resolve_import_path(symbol).ok_or_else(|| ImportError::Unresolvable {
            symbol: symbol.qualified_name(),
        })?;

        let name = if path.module == BUILTINS_MODULE && !self.is_alias(head(&path.qualname)) {
            self.namespace.add(head(&path.qualname));
            path.qualname
        } else {
            let alias = self.ensure_module(&path.module);
            format!("{alias}.{}", path.qualname)
        };

        debug!(symbol = %symbol, name = %name, "registered import");
        self.names
            .insert((path.module, symbol.qualname.clone()), name.clone());
        Ok(name)
    }

    /// Import a module without binding any symbol from it, returning its
    /// alias.
    pub fn add_by_name(&mut self, module: &str) -> Result<String, ImportError> {
        if !is_dotted_path(module) {
            return Err(ImportError::InvalidModulePath(module.to_string()));
        }
        Ok(self.ensure_module(module))
    }

    /// Imports in registration order
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Name already assigned to `symbol`, if any
    pub fn name_of(&self, symbol: &Symbol) -> Option<&str> {
        let (module, qualname) = symbol.key();
        self.names
            .get(&(module.to_string(), qualname.to_string()))
            .map(String::as_str)
    }

    /// Alias of an imported module
    pub fn alias_of(&self, module: &str) -> Option<&str> {
        self.module_index
            .get(module)
            .map(|&i| self.imports[i].alias.as_str())
    }

    /// Number of registered symbols
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Mutable access for later naming passes that bind their own names.
    pub fn namespace_mut(&mut self) -> &mut Namespace {
        &mut self.namespace
    }

    fn is_alias(&self, name: &str) -> bool {
        self.imports.iter().any(|import| import.alias == name)
    }

    fn ensure_module(&mut self, module: &str) -> String {
        if let Some(alias) = self.alias_of(module) {
            return alias.to_string();
        }

        let alias = self.choose_alias(module);
        self.namespace.add(alias.clone());
        self.module_index
            .insert(module.to_string(), self.imports.len());
        self.imports.push(Import {
            module: module.to_string(),
            alias: alias.clone(),
        });
        debug!(module = %module, alias = %alias, "added module import");
        alias
    }

    fn choose_alias(&mut self, module: &str) -> String {
        let segments: Vec<&str> = module.split('.').collect();
        let preferred = match self.config.aliases.get(module) {
            Some(alias) => alias.clone(),
            None => segments.last().copied().unwrap_or(module).to_string(),
        };
        if !self.namespace.contains(&preferred) {
            return preferred;
        }

        if self.config.collision == CollisionStrategy::Qualify {
            for n in 2..=segments.len() {
                let candidate = segments[segments.len() - n..].join("_");
                if !self.namespace.contains(&candidate) {
                    return candidate;
                }
            }
        }
        self.namespace.get_new_name(&preferred)
    }
}

/// First dotted segment of a name.
fn head(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}
