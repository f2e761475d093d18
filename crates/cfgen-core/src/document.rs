//! JSON Graph Documents
//!
//! A [`GraphDocument`] is the serialized input of code generation: a list of
//! config nodes keyed by string ids, and the fixture tree whose bodies
//! reference them.
//!
//! ```json
//! {
//!   "nodes": [
//!     {"id": "enc", "callable": {"module": "models", "qualname": "Encoder", "kind": "class"},
//!      "arguments": [{"name": "dim", "value": {"int": 128}, "tags": []}]}
//!   ],
//!   "fixture": {"name": "build", "output": {"node": "enc"}}
//! }
//! ```
//!
//! Nodes are created first and their arguments assigned afterwards, so the
//! order of `nodes` does not matter. Cycles are rejected by the graph.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::code_ir::{CallInstance, FixtureFunction, VariableDeclaration};
use crate::graph::{Buildable, BuildableKind, ConfigGraph, GraphError, NodeId};
use crate::task::{CodegenConfig, CodegenTask};
use crate::value::{Symbol, Tag, Value};

/// Errors raised while loading a graph document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to parse graph document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("unknown node id '{0}'")]
    UnknownNode(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Serialized code generation input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    pub fixture: FixtureDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: String,
    #[serde(default)]
    pub kind: BuildableKind,
    pub callable: Symbol,
    #[serde(default)]
    pub arguments: Vec<ArgumentDocument>,
}

/// A field of a node. A field may carry tags without a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ValueDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Serialized [`Value`]; node references are by document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueDocument {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ValueDocument>),
    Tuple(Vec<ValueDocument>),
    Dict(Vec<(String, ValueDocument)>),
    Node(String),
    Symbol(Symbol),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDocument {
    pub name: String,
    pub value: ValueDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureDocument {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub variables: Vec<VariableDocument>,
    pub output: ValueDocument,
    #[serde(default)]
    pub children: Vec<FixtureDocument>,
}

impl GraphDocument {
    /// Parse a document from JSON
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the config graph, returning it with the id of every node.
    pub fn build_graph(&self) -> Result<(ConfigGraph, HashMap<String, NodeId>), DocumentError> {
        let mut graph = ConfigGraph::new();
        let mut ids = HashMap::with_capacity(self.nodes.len());

        for node in &self.nodes {
            if ids.contains_key(&node.id) {
                return Err(DocumentError::DuplicateNode(node.id.clone()));
            }
            let id = graph.add_node(Buildable::new(node.kind, node.callable.clone()))?;
            ids.insert(node.id.clone(), id);
        }

        for node in &self.nodes {
            let id = ids[&node.id];
            for argument in &node.arguments {
                if let Some(value) = &argument.value {
                    graph.set_argument(id, argument.name.clone(), value.to_value(&ids)?)?;
                }
                for tag in &argument.tags {
                    graph.add_tag(id, argument.name.clone(), tag.clone())?;
                }
            }
        }

        debug!(nodes = graph.node_count(), "built config graph from document");
        Ok((graph, ids))
    }

    /// Build a code generation task from this document.
    pub fn into_task(self, config: CodegenConfig) -> Result<CodegenTask, DocumentError> {
        let (graph, ids) = self.build_graph()?;
        let top_level_call = self.fixture.to_call(&ids)?;
        Ok(CodegenTask::with_config(graph, top_level_call, config))
    }
}

impl FixtureDocument {
    fn to_call(&self, ids: &HashMap<String, NodeId>) -> Result<CallInstance, DocumentError> {
        let mut fixture = FixtureFunction::new(self.name.clone(), self.output.to_value(ids)?);
        fixture.parameters = self.parameters.clone();
        for variable in &self.variables {
            fixture = fixture.with_variable(VariableDeclaration::new(
                variable.name.clone(),
                variable.value.to_value(ids)?,
            ));
        }

        let mut call = CallInstance::new(fixture);
        for child in &self.children {
            call = call.with_child(child.to_call(ids)?);
        }
        Ok(call)
    }
}

impl ValueDocument {
    /// Resolve node ids into graph identities.
    pub fn to_value(&self, ids: &HashMap<String, NodeId>) -> Result<Value, DocumentError> {
        let convert_all = |items: &[ValueDocument]| -> Result<Vec<Value>, DocumentError> {
            items.iter().map(|item| item.to_value(ids)).collect()
        };

        Ok(match self {
            ValueDocument::None => Value::None,
            ValueDocument::Bool(b) => Value::Bool(*b),
            ValueDocument::Int(n) => Value::Int(*n),
            ValueDocument::Float(x) => Value::Float(*x),
            ValueDocument::Str(s) => Value::Str(s.clone()),
            ValueDocument::List(items) => Value::List(convert_all(items)?),
            ValueDocument::Tuple(items) => Value::Tuple(convert_all(items)?),
            ValueDocument::Dict(entries) => Value::Dict(
                entries
                    .iter()
                    .map(|(key, item)| item.to_value(ids).map(|value| (key.clone(), value)))
                    .collect::<Result<_, _>>()?,
            ),
            ValueDocument::Node(name) => ids
                .get(name)
                .copied()
                .map(Value::Node)
                .ok_or_else(|| DocumentError::UnknownNode(name.clone()))?,
            ValueDocument::Symbol(symbol) => Value::Symbol(symbol.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHARED: &str = r#"{
        "nodes": [
            {"id": "head", "callable": {"module": "models", "qualname": "Head", "kind": "class"},
             "arguments": [{"name": "encoder", "value": {"node": "enc"}}]},
            {"id": "enc", "callable": {"module": "models", "qualname": "Encoder", "kind": "class"},
             "arguments": [
                {"name": "dim", "value": {"int": 128}},
                {"name": "dropout", "tags": [{"module": "models.tags", "qualname": "Rate", "kind": "class"}]}
             ]}
        ],
        "fixture": {
            "name": "build",
            "variables": [{"name": "shared", "value": {"node": "enc"}}],
            "output": {"tuple": [{"node": "head"}, {"node": "enc"}, "none"]}
        }
    }"#;

    #[test]
    fn test_build_graph_from_json() {
        let doc = GraphDocument::from_json(SHARED).unwrap();
        let (graph, ids) = doc.build_graph().unwrap();

        assert_eq!(graph.node_count(), 2);
        let enc = ids["enc"];
        assert_eq!(graph.parents(enc), vec![ids["head"]]);
        let node = graph.node(enc).unwrap();
        assert_eq!(node.arguments().get("dim"), Some(&Value::Int(128)));
        assert!(!node.arguments().contains("dropout"));
        assert_eq!(node.tags_for("dropout").count(), 1);
    }

    #[test]
    fn test_into_task() {
        let doc = GraphDocument::from_json(SHARED).unwrap();
        let task = doc.into_task(CodegenConfig::default()).unwrap();
        let fixture = &task.top_level_call.fixture;

        assert_eq!(fixture.name, "build");
        assert_eq!(fixture.variables.len(), 1);
        assert!(matches!(fixture.output_value, Value::Tuple(ref items) if items.len() == 3));
    }

    #[test]
    fn test_unknown_node_reference() {
        let json = r#"{"fixture": {"name": "build", "output": {"node": "missing"}}}"#;
        let err = GraphDocument::from_json(json)
            .unwrap()
            .into_task(CodegenConfig::default())
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnknownNode(ref id) if id == "missing"));
    }

    #[test]
    fn test_duplicate_node_id() {
        let json = r#"{
            "nodes": [
                {"id": "a", "callable": {"module": "m", "qualname": "f"}},
                {"id": "a", "callable": {"module": "m", "qualname": "g"}}
            ],
            "fixture": {"name": "build", "output": "none"}
        }"#;
        let err = GraphDocument::from_json(json).unwrap().build_graph().unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateNode(_)));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let json = r#"{
            "nodes": [
                {"id": "a", "callable": {"module": "m", "qualname": "f"},
                 "arguments": [{"name": "x", "value": {"node": "b"}}]},
                {"id": "b", "callable": {"module": "m", "qualname": "g"},
                 "arguments": [{"name": "y", "value": {"node": "a"}}]}
            ],
            "fixture": {"name": "build", "output": {"node": "a"}}
        }"#;
        let err = GraphDocument::from_json(json).unwrap().build_graph().unwrap_err();
        assert!(matches!(err, DocumentError::Graph(GraphError::Cycle { .. })));
    }

    #[test]
    fn test_invalid_json() {
        let err = GraphDocument::from_json("{").unwrap_err();
        assert!(err.to_string().starts_with("failed to parse graph document"));
    }
}
