//! Code generation error types.

use thiserror::Error;

use crate::graph::GraphError;
use crate::import_manager::ImportError;
use crate::traversal::Path;

/// Errors raised by code generation passes.
#[derive(Error, Debug)]
pub enum CodegenError {
    /// A field carries tags but has no value to attach them to
    #[error(
        "Tagged field '{field}' of {node} is not found in its arguments: {arguments:?}. \
         This is likely because the tagged field doesn't yet have a value. Consider \
         assigning a value to the field first or removing field tags from your config, \
         for example using `ConfigGraph::clear_tags` (at {path})."
    )]
    TaggedFieldNotSet {
        field: String,
        node: String,
        arguments: Vec<String>,
        path: Path,
    },

    /// A required symbol could not be imported
    #[error(transparent)]
    Import(#[from] ImportError),

    /// The graph referenced by the task is inconsistent
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl CodegenError {
    /// Create a new TaggedFieldNotSet error.
    pub fn tagged_field_not_set(
        field: impl Into<String>,
        node: impl ToString,
        arguments: impl IntoIterator<Item = impl Into<String>>,
        path: Path,
    ) -> Self {
        Self::TaggedFieldNotSet {
            field: field.into(),
            node: node.to_string(),
            arguments: arguments.into_iter().map(Into::into).collect(),
            path,
        }
    }
}
