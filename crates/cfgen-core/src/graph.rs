//! Configuration Graph
//!
//! Config nodes ("buildables") live in an arena backed by
//! `petgraph::StableGraph`. A node is identified by its [`NodeId`]; every
//! argument value that references another node is mirrored as an edge
//! labelled with the argument name. Sharing a sub-configuration is therefore
//! just two edges into the same node, and identity never depends on value
//! equality.
//!
//! The graph is kept acyclic: assignments that would close a cycle are
//! rejected with [`GraphError::Cycle`].

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::value::{Symbol, Tag, Value};

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by graph mutation and lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("unknown config node {0}")]
    UnknownNode(NodeId),

    #[error("assigning '{argument}' of {parent} would create a cycle through {child}")]
    Cycle {
        parent: NodeId,
        child: NodeId,
        argument: String,
    },
}

// ============================================================================
// Node Identity
// ============================================================================

/// Arena identity of a config node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NodeIndex);

impl NodeId {
    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0.index()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0.index())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0.index() as u64)
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Named arguments of a config node, in insertion order.
///
/// Replacing an existing argument keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Arguments {
    entries: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set an argument, returning the previous value if there was one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.get_mut(&name) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let position = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(position).1)
    }

    /// Argument names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut arguments = Arguments::new();
        for (name, value) in iter {
            arguments.insert(name, value);
        }
        arguments
    }
}

impl IntoIterator for Arguments {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ============================================================================
// Buildables
// ============================================================================

/// How a config node is materialized.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BuildableKind {
    /// Calls the callable when built
    #[default]
    Config,
    /// Builds to a partially-applied callable
    Partial,
    /// Builds to a factory producing fresh argument values
    ArgFactory,
}

impl BuildableKind {
    /// Name of the wrapper type in the configuration library
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildableKind::Config => "Config",
            BuildableKind::Partial => "Partial",
            BuildableKind::ArgFactory => "ArgFactory",
        }
    }

    /// The wrapper type symbol, e.g. `fiddle.Config`.
    pub fn wrapper_symbol(&self, base_module: &str) -> Symbol {
        Symbol::class(base_module, self.as_str())
    }
}

/// A deferred call: a callable plus its (possibly partial) arguments.
///
/// Tags may name fields that have no value yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Buildable {
    kind: BuildableKind,
    callable: Symbol,
    arguments: Arguments,
    argument_tags: BTreeMap<String, BTreeSet<Tag>>,
}

impl Buildable {
    pub fn new(kind: BuildableKind, callable: Symbol) -> Self {
        Self {
            kind,
            callable,
            arguments: Arguments::new(),
            argument_tags: BTreeMap::new(),
        }
    }

    /// Create a `Config` buildable
    pub fn config(callable: Symbol) -> Self {
        Self::new(BuildableKind::Config, callable)
    }

    /// Create a `Partial` buildable
    pub fn partial(callable: Symbol) -> Self {
        Self::new(BuildableKind::Partial, callable)
    }

    /// Builder: set an argument
    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name, value);
        self
    }

    /// Builder: tag a field
    pub fn with_tag(mut self, name: impl Into<String>, tag: Tag) -> Self {
        self.argument_tags.entry(name.into()).or_default().insert(tag);
        self
    }

    pub fn kind(&self) -> BuildableKind {
        self.kind
    }

    pub fn callable(&self) -> &Symbol {
        &self.callable
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn argument_tags(&self) -> &BTreeMap<String, BTreeSet<Tag>> {
        &self.argument_tags
    }

    /// Tags on a single field
    pub fn tags_for(&self, name: &str) -> impl Iterator<Item = &Tag> {
        self.argument_tags.get(name).into_iter().flatten()
    }
}

impl fmt::Display for Buildable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.arguments.names().collect();
        write!(
            f,
            "<{}[{}({})]>",
            self.kind.as_str(),
            self.callable,
            names.join(", ")
        )
    }
}

// ============================================================================
// Graph
// ============================================================================

/// Edge payload: the argument through which the parent references the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentEdge {
    pub argument: String,
}

/// Arena of config nodes with argument-labelled reference edges.
#[derive(Debug, Clone, Default)]
pub struct ConfigGraph {
    graph: StableGraph<Buildable, ArgumentEdge, petgraph::Directed>,
}

impl ConfigGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Node Operations
    // ------------------------------------------------------------------------

    /// Add a node, returning its identity.
    ///
    /// Every node referenced from the buildable's arguments must already be
    /// in the graph. A fresh node has no parents, so this cannot create a
    /// cycle.
    pub fn add_node(&mut self, buildable: Buildable) -> Result<NodeId, GraphError> {
        let mut children = Vec::new();
        for (name, value) in buildable.arguments.iter() {
            for child in value.node_references() {
                self.check_exists(child)?;
                children.push((name.to_string(), child));
            }
        }

        let idx = self.graph.add_node(buildable);
        for (argument, child) in children {
            self.graph.add_edge(idx, child.0, ArgumentEdge { argument });
        }
        Ok(NodeId(idx))
    }

    /// Get a node by identity
    pub fn get(&self, id: NodeId) -> Option<&Buildable> {
        self.graph.node_weight(id.0)
    }

    /// Get a node by identity, failing if it is not in the graph
    pub fn node(&self, id: NodeId) -> Result<&Buildable, GraphError> {
        self.get(id).ok_or(GraphError::UnknownNode(id))
    }

    /// Check if the graph contains the node
    pub fn contains(&self, id: NodeId) -> bool {
        self.graph.contains_node(id.0)
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Iterate over all nodes in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Buildable)> {
        self.graph
            .node_indices()
            .filter_map(move |idx| Some((NodeId(idx), self.graph.node_weight(idx)?)))
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Assign an argument, returning the value it replaced.
    ///
    /// Fails without modifying the graph when the value references an unknown
    /// node or a node from which `id` is reachable.
    pub fn set_argument(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, GraphError> {
        let name = name.into();
        let value = value.into();
        self.check_exists(id)?;

        let children = value.node_references();
        for &child in &children {
            self.check_exists(child)?;
            if child == id || has_path_connecting(&self.graph, child.0, id.0, None) {
                return Err(GraphError::Cycle {
                    parent: id,
                    child,
                    argument: name,
                });
            }
        }

        let stale: Vec<EdgeIndex> = self
            .graph
            .edges_directed(id.0, Direction::Outgoing)
            .filter(|edge| edge.weight().argument == name)
            .map(|edge| edge.id())
            .collect();
        for edge in stale {
            self.graph.remove_edge(edge);
        }
        for child in children {
            self.graph.add_edge(
                id.0,
                child.0,
                ArgumentEdge {
                    argument: name.clone(),
                },
            );
        }

        let node = self.node_mut(id)?;
        Ok(node.arguments.insert(name, value))
    }

    /// Tag a field. Returns `false` if the tag was already present.
    pub fn add_tag(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        tag: Tag,
    ) -> Result<bool, GraphError> {
        let node = self.node_mut(id)?;
        Ok(node.argument_tags.entry(name.into()).or_default().insert(tag))
    }

    /// Remove a tag from a field. Returns `false` if it was not present.
    pub fn remove_tag(&mut self, id: NodeId, name: &str, tag: &Tag) -> Result<bool, GraphError> {
        let node = self.node_mut(id)?;
        let Some(tags) = node.argument_tags.get_mut(name) else {
            return Ok(false);
        };
        let removed = tags.remove(tag);
        if tags.is_empty() {
            node.argument_tags.remove(name);
        }
        Ok(removed)
    }

    /// Remove every tag from every field of a node.
    pub fn clear_tags(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.node_mut(id)?.argument_tags.clear();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Structure Queries
    // ------------------------------------------------------------------------

    /// Distinct nodes that reference `id`, sorted by identity.
    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        let parents: BTreeSet<NodeId> = self
            .graph
            .edges_directed(id.0, Direction::Incoming)
            .map(|edge| NodeId(edge.source()))
            .collect();
        parents.into_iter().collect()
    }

    /// Whether more than one reference points at this node.
    pub fn is_shared(&self, id: NodeId) -> bool {
        self.graph
            .edges_directed(id.0, Direction::Incoming)
            .nth(1)
            .is_some()
    }

    /// Nodes reachable from the node references inside `root`, each once,
    /// in depth-first discovery order.
    pub fn reachable(&self, root: &Value) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        for start in root.node_references() {
            if !self.contains(start) || seen.contains(&start) {
                continue;
            }
            let mut dfs = Dfs::new(&self.graph, start.0);
            while let Some(idx) = dfs.next(&self.graph) {
                if seen.insert(NodeId(idx)) {
                    order.push(NodeId(idx));
                }
            }
        }
        order
    }

    fn check_exists(&self, id: NodeId) -> Result<(), GraphError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Buildable, GraphError> {
        self.graph
            .node_weight_mut(id.0)
            .ok_or(GraphError::UnknownNode(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> Buildable {
        Buildable::config(Symbol::class("models", "Encoder"))
    }

    #[test]
    fn test_add_node_and_lookup() {
        let mut graph = ConfigGraph::new();
        let id = graph
            .add_node(encoder().with_argument("dim", 128).with_argument("act", "relu"))
            .unwrap();

        assert_eq!(graph.node_count(), 1);
        let node = graph.node(id).unwrap();
        assert_eq!(node.kind(), BuildableKind::Config);
        assert_eq!(node.arguments().get("dim"), Some(&Value::Int(128)));
        let names: Vec<&str> = node.arguments().names().collect();
        assert_eq!(names, vec!["dim", "act"]);
    }

    #[test]
    fn test_add_node_with_unknown_reference() {
        let mut other = ConfigGraph::new();
        let foreign = other.add_node(encoder()).unwrap();

        let mut graph = ConfigGraph::new();
        let result = graph.add_node(encoder().with_argument("inner", foreign));
        assert_eq!(result, Err(GraphError::UnknownNode(foreign)));
    }

    #[test]
    fn test_shared_node_has_two_parents() {
        let mut graph = ConfigGraph::new();
        let shared = graph.add_node(encoder()).unwrap();
        let a = graph
            .add_node(Buildable::config(Symbol::class("models", "Head")).with_argument("enc", shared))
            .unwrap();
        let b = graph
            .add_node(Buildable::config(Symbol::class("models", "Head")).with_argument("enc", shared))
            .unwrap();

        assert!(graph.is_shared(shared));
        assert!(!graph.is_shared(a));
        assert_eq!(graph.parents(shared), vec![a, b]);
    }

    #[test]
    fn test_set_argument_replaces_edges() {
        let mut graph = ConfigGraph::new();
        let first = graph.add_node(encoder()).unwrap();
        let second = graph.add_node(encoder()).unwrap();
        let parent = graph
            .add_node(Buildable::config(Symbol::class("models", "Head")).with_argument("enc", first))
            .unwrap();

        let previous = graph.set_argument(parent, "enc", second).unwrap();
        assert_eq!(previous, Some(Value::Node(first)));
        assert!(graph.parents(first).is_empty());
        assert_eq!(graph.parents(second), vec![parent]);
    }

    #[test]
    fn test_set_argument_rejects_cycle() {
        let mut graph = ConfigGraph::new();
        let child = graph.add_node(encoder()).unwrap();
        let parent = graph
            .add_node(encoder().with_argument("inner", Value::List(vec![child.into()])))
            .unwrap();

        let err = graph.set_argument(child, "outer", parent).unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
        assert!(!graph.node(child).unwrap().arguments().contains("outer"));

        let err = graph.set_argument(child, "me", child).unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
    }

    #[test]
    fn test_tags_on_unset_field() {
        let mut graph = ConfigGraph::new();
        let id = graph.add_node(encoder()).unwrap();
        let tag = Tag::new("models.tags", "Dropout");

        assert!(graph.add_tag(id, "rate", tag.clone()).unwrap());
        assert!(!graph.add_tag(id, "rate", tag.clone()).unwrap());
        let node = graph.node(id).unwrap();
        assert_eq!(node.tags_for("rate").count(), 1);
        assert!(!node.arguments().contains("rate"));

        assert!(graph.remove_tag(id, "rate", &tag).unwrap());
        assert!(graph.node(id).unwrap().argument_tags().is_empty());

        graph.add_tag(id, "rate", tag).unwrap();
        graph.clear_tags(id).unwrap();
        assert!(graph.node(id).unwrap().argument_tags().is_empty());
    }

    #[test]
    fn test_reachable_visits_each_node_once() {
        let mut graph = ConfigGraph::new();
        let leaf = graph.add_node(encoder()).unwrap();
        let left = graph.add_node(encoder().with_argument("x", leaf)).unwrap();
        let right = graph.add_node(encoder().with_argument("x", leaf)).unwrap();
        let root = Value::Tuple(vec![left.into(), right.into(), Value::Int(3)]);

        let reachable = graph.reachable(&root);
        assert_eq!(reachable.len(), 3);
        assert_eq!(reachable[0], left);
    }

    #[test]
    fn test_buildable_display() {
        let node = encoder().with_argument("dim", 4).with_argument("act", "relu");
        assert_eq!(node.to_string(), "<Config[models.Encoder(dim, act)]>");
    }

    #[test]
    fn test_wrapper_symbol() {
        let symbol = BuildableKind::Partial.wrapper_symbol("fiddle");
        assert_eq!(symbol.qualified_name(), "fiddle.Partial");
        assert_eq!(BuildableKind::ArgFactory.as_str(), "ArgFactory");
    }
}
