//! cfgen Core - Code generation passes for configuration graphs
//!
//! This crate lowers a graph of deferred calls ("buildables") into Code-IR
//! for a generated module:
//! - Arena-backed configuration graph with identity-based sharing
//! - Import manager assigning stable, collision-free names
//! - Memoized traversal visiting each shared node exactly once
//! - Import registration and symbol substitution passes
//! - JSON graph documents as pass input

pub mod classify;
pub mod code_ir;
pub mod document;
pub mod error;
pub mod graph;
pub mod import_manager;
pub mod namespace;
pub mod symbolic_references;
pub mod task;
pub mod traversal;
pub mod value;

// Re-exports for convenience
pub use classify::{classify, Classification};
pub use code_ir::{
    noop_history_comments, CallInstance, CodeIr, FixtureFunction, HistoryComments,
    SymbolOrFixtureCall, VariableDeclaration, WithTagsCall,
};
pub use document::{DocumentError, GraphDocument};
pub use error::CodegenError;
pub use graph::{Arguments, Buildable, BuildableKind, ConfigGraph, GraphError, NodeId};
pub use import_manager::{CollisionStrategy, Import, ImportConfig, ImportError, ImportManager};
pub use namespace::Namespace;
pub use symbolic_references::{
    import_symbols, replace_callables_and_configs_with_symbols,
    replace_callables_and_configs_with_symbols_with_history, ImportSummary,
};
pub use task::{CodegenConfig, CodegenTask, DEFAULT_BASE_ALIAS, DEFAULT_BASE_MODULE};
pub use traversal::{iterate, iterate_all, MemoizedTraversal, Path, PathElement, State, Transform, Visit};
pub use value::{resolve_import_path, ImportPath, Symbol, SymbolKind, Tag, Value};
