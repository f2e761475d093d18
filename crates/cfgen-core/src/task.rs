//! A unit of code generation work.

use std::collections::BTreeMap;

use crate::code_ir::{CallInstance, FixtureFunction};
use crate::graph::{BuildableKind, ConfigGraph};
use crate::import_manager::{ImportConfig, ImportManager};
use crate::value::Symbol;

/// Default configuration library module
pub const DEFAULT_BASE_MODULE: &str = "fiddle";

/// Default alias of the configuration library module
pub const DEFAULT_BASE_ALIAS: &str = "fdl";

/// Settings for a [`CodegenTask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenConfig {
    /// Module providing the `Config`/`Partial`/`ArgFactory` wrapper types
    pub base_module: String,
    pub imports: ImportConfig,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert(
            DEFAULT_BASE_MODULE.to_string(),
            DEFAULT_BASE_ALIAS.to_string(),
        );
        Self {
            base_module: DEFAULT_BASE_MODULE.to_string(),
            imports: ImportConfig {
                aliases,
                ..ImportConfig::default()
            },
        }
    }
}

/// Graph, imports and fixture tree being generated.
///
/// Passes mutate the task in place: the import manager accumulates names and
/// fixture bodies are rewritten into Code-IR.
#[derive(Debug, Clone)]
pub struct CodegenTask {
    pub graph: ConfigGraph,
    pub import_manager: ImportManager,
    pub top_level_call: CallInstance,
    pub(crate) base_module: String,
}

impl CodegenTask {
    /// Create a task with the default configuration.
    pub fn new(graph: ConfigGraph, top_level_call: CallInstance) -> Self {
        Self::with_config(graph, top_level_call, CodegenConfig::default())
    }

    pub fn with_config(graph: ConfigGraph, top_level_call: CallInstance, config: CodegenConfig) -> Self {
        Self {
            graph,
            import_manager: ImportManager::new(config.imports),
            top_level_call,
            base_module: config.base_module,
        }
    }

    pub fn base_module(&self) -> &str {
        &self.base_module
    }

    /// Wrapper type symbol for a buildable kind in this task's base module
    pub fn wrapper_symbol(&self, kind: BuildableKind) -> Symbol {
        kind.wrapper_symbol(&self.base_module)
    }

    pub fn all_fixture_functions(&self) -> Vec<&FixtureFunction> {
        self.top_level_call.all_fixture_functions()
    }
}
