//! Memoized Graph Traversal
//!
//! Passes rewrite value trees through a [`Transform`]. The traversal engine
//! hands each value to the transform together with a [`State`] that can
//! recurse into children; config nodes are memoized by identity, so a node
//! reachable along several paths is transformed exactly once and every
//! reference to it receives the same result.
//!
//! ```text
//! run(root)
//!   └─ call(value) ──▶ transform(visit, state)
//!                        ├─ state.map_children(value)   containers, IR
//!                        └─ state.map_arguments(node)   node arguments
//!                              └─ call(child) ...
//! ```
//!
//! [`iterate`] walks the same structure read-only, yielding each node once.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::code_ir::{CodeIr, SymbolOrFixtureCall, WithTagsCall};
use crate::graph::{Arguments, Buildable, ConfigGraph, GraphError, NodeId};
use crate::value::Value;

// ============================================================================
// Paths
// ============================================================================

/// One step from a value to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    /// Named argument or field
    Attr(String),
    /// Sequence position
    Index(usize),
    /// Dict key
    Key(String),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Attr(name) => write!(f, ".{name}"),
            PathElement::Index(index) => write!(f, "[{index}]"),
            PathElement::Key(key) => write!(f, "['{key}']"),
        }
    }
}

/// Location of a value relative to the traversal root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathElement>);

impl Path {
    /// The empty path
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.0
    }

    pub fn push(&mut self, element: PathElement) {
        self.0.push(element);
    }

    pub fn pop(&mut self) -> Option<PathElement> {
        self.0.pop()
    }

    /// A new path one step below this one
    pub fn child(&self, element: PathElement) -> Path {
        let mut path = self.clone();
        path.push(element);
        path
    }
}

impl From<Vec<PathElement>> for Path {
    fn from(elements: Vec<PathElement>) -> Self {
        Self(elements)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for element in &self.0 {
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Transform
// ============================================================================

/// What a transform is asked to handle.
#[derive(Debug, Clone, Copy)]
pub enum Visit<'a> {
    /// A config node, resolved from the graph
    Node { id: NodeId, node: &'a Buildable },
    /// Any other value
    Value(&'a Value),
}

/// A per-value rewrite driven by [`MemoizedTraversal`].
///
/// Implementations recurse by calling back into `state`; returning without
/// recursing keeps children out of the result.
pub trait Transform {
    type Error: From<GraphError>;

    fn transform(&mut self, visit: Visit<'_>, state: &mut State<'_>) -> Result<Value, Self::Error>;
}

/// Traversal state shared by all calls of one traversal.
#[derive(Debug)]
pub struct State<'g> {
    graph: &'g ConfigGraph,
    memo: HashMap<NodeId, Value>,
    /// Shared Code-IR keyed by allocation; the original is held so its
    /// address cannot be reused while the entry lives.
    ir_memo: HashMap<*const (), (CodeIr, Value)>,
    path: Path,
}

impl<'g> State<'g> {
    fn new(graph: &'g ConfigGraph) -> Self {
        Self {
            graph,
            memo: HashMap::new(),
            ir_memo: HashMap::new(),
            path: Path::root(),
        }
    }

    pub fn graph(&self) -> &'g ConfigGraph {
        self.graph
    }

    /// Path of the value currently being transformed
    pub fn current_path(&self) -> &Path {
        &self.path
    }

    /// Transform a value. Config nodes and shared Code-IR already seen
    /// return their memoized result without invoking the transform again.
    pub fn call<T>(&mut self, transform: &mut T, value: &Value) -> Result<Value, T::Error>
    where
        T: Transform + ?Sized,
    {
        let id = match value {
            Value::Node(id) => id,
            Value::Ir(ir) => return self.call_ir(transform, value, ir),
            _ => return transform.transform(Visit::Value(value), self),
        };

        if let Some(result) = self.memo.get(id) {
            return Ok(result.clone());
        }
        let graph = self.graph;
        let node = graph.node(*id)?;
        let result = transform.transform(Visit::Node { id: *id, node }, self)?;
        self.memo.insert(*id, result.clone());
        Ok(result)
    }

    fn call_ir<T>(&mut self, transform: &mut T, value: &Value, ir: &CodeIr) -> Result<Value, T::Error>
    where
        T: Transform + ?Sized,
    {
        let Some(key) = ir_identity(ir) else {
            return transform.transform(Visit::Value(value), self);
        };
        if let Some((_, result)) = self.ir_memo.get(&key) {
            return Ok(result.clone());
        }
        let result = transform.transform(Visit::Value(value), self)?;
        self.ir_memo.insert(key, (ir.clone(), result.clone()));
        Ok(result)
    }

    /// Rebuild a value with each child transformed. Leaves, including node
    /// references, are returned as they are.
    pub fn map_children<T>(&mut self, transform: &mut T, value: &Value) -> Result<Value, T::Error>
    where
        T: Transform + ?Sized,
    {
        Ok(match value {
            Value::List(items) => Value::List(self.map_sequence(transform, items)?),
            Value::Tuple(items) => Value::Tuple(self.map_sequence(transform, items)?),
            Value::Dict(entries) => {
                let mut mapped = Vec::with_capacity(entries.len());
                for (key, item) in entries {
                    let item = self.descend(PathElement::Key(key.clone()), |state| {
                        state.call(transform, item)
                    })?;
                    mapped.push((key.clone(), item));
                }
                Value::Dict(mapped)
            }
            Value::Ir(ir) => Value::Ir(self.map_ir(transform, ir)?),
            leaf => leaf.clone(),
        })
    }

    /// Transform every argument of a node, in argument order.
    pub fn map_arguments<T>(&mut self, transform: &mut T, id: NodeId) -> Result<Arguments, T::Error>
    where
        T: Transform + ?Sized,
    {
        let graph = self.graph;
        let node = graph.node(id)?;
        self.map_named(transform, node.arguments())
    }

    fn map_named<T>(&mut self, transform: &mut T, arguments: &Arguments) -> Result<Arguments, T::Error>
    where
        T: Transform + ?Sized,
    {
        let mut mapped = Arguments::new();
        for (name, value) in arguments.iter() {
            let value = self.descend(PathElement::Attr(name.to_string()), |state| {
                state.call(transform, value)
            })?;
            mapped.insert(name, value);
        }
        Ok(mapped)
    }

    fn map_sequence<T>(&mut self, transform: &mut T, items: &[Value]) -> Result<Vec<Value>, T::Error>
    where
        T: Transform + ?Sized,
    {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.descend(PathElement::Index(i), |state| state.call(transform, item)))
            .collect()
    }

    fn map_ir<T>(&mut self, transform: &mut T, ir: &CodeIr) -> Result<CodeIr, T::Error>
    where
        T: Transform + ?Sized,
    {
        Ok(match ir {
            CodeIr::SymbolReference(_) => ir.clone(),
            CodeIr::Call(call) => {
                let positional_arg_expressions = self.map_sequence(transform, &call.positional_arg_expressions)?;
                let arg_expressions = self.map_named(transform, &call.arg_expressions)?;
                CodeIr::Call(Rc::new(SymbolOrFixtureCall {
                    symbol_expression: call.symbol_expression.clone(),
                    positional_arg_expressions,
                    arg_expressions,
                    history_comments: call.history_comments.clone(),
                }))
            }
            CodeIr::WithTags(tagged) => {
                let item_to_tag = self.descend(PathElement::Attr("item_to_tag".to_string()), |state| {
                    state.call(transform, &tagged.item_to_tag)
                })?;
                CodeIr::WithTags(Rc::new(WithTagsCall {
                    tag_symbol_expressions: tagged.tag_symbol_expressions.clone(),
                    item_to_tag,
                }))
            }
        })
    }

    fn descend<R>(&mut self, element: PathElement, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push(element);
        let result = f(self);
        self.path.pop();
        result
    }
}

/// Allocation identity of a shared Code-IR node.
fn ir_identity(ir: &CodeIr) -> Option<*const ()> {
    match ir {
        CodeIr::SymbolReference(_) => None,
        CodeIr::Call(call) => Some(Rc::as_ptr(call).cast()),
        CodeIr::WithTags(tagged) => Some(Rc::as_ptr(tagged).cast()),
    }
}

// ============================================================================
// Traversal
// ============================================================================

/// A traversal whose node memo survives across several roots.
///
/// Running each body expression of a fixture through the same traversal
/// makes a node shared between expressions produce one shared result.
#[derive(Debug)]
pub struct MemoizedTraversal<'g> {
    state: State<'g>,
}

impl<'g> MemoizedTraversal<'g> {
    pub fn new(graph: &'g ConfigGraph) -> Self {
        Self {
            state: State::new(graph),
        }
    }

    /// Transform `root`, with paths reported relative to it.
    pub fn run<T>(&mut self, transform: &mut T, root: &Value) -> Result<Value, T::Error>
    where
        T: Transform + ?Sized,
    {
        self.run_at(transform, root, Path::root())
    }

    /// Transform `root`, with paths reported below `prefix`.
    pub fn run_at<T>(&mut self, transform: &mut T, root: &Value, prefix: Path) -> Result<Value, T::Error>
    where
        T: Transform + ?Sized,
    {
        self.state.path = prefix;
        let result = self.state.call(transform, root);
        self.state.path = Path::root();
        result
    }

    /// Number of distinct nodes transformed so far
    pub fn memoized(&self) -> usize {
        self.state.memo.len()
    }
}

/// Transform a single root with a fresh memo.
pub fn run<T>(graph: &ConfigGraph, transform: &mut T, root: &Value) -> Result<Value, T::Error>
where
    T: Transform + ?Sized,
{
    MemoizedTraversal::new(graph).run(transform, root)
}

// ============================================================================
// Iteration
// ============================================================================

/// Every value reachable from `root` in pre-order, each config node once.
pub fn iterate<'a>(graph: &'a ConfigGraph, root: &'a Value) -> Result<Vec<(Visit<'a>, Path)>, GraphError> {
    iterate_all(graph, [(root, Path::root())])
}

/// Like [`iterate`] over several roots, sharing one set of seen nodes.
pub fn iterate_all<'a, I>(graph: &'a ConfigGraph, roots: I) -> Result<Vec<(Visit<'a>, Path)>, GraphError>
where
    I: IntoIterator<Item = (&'a Value, Path)>,
{
    let mut walker = Walker {
        graph,
        seen: HashSet::new(),
        out: Vec::new(),
    };
    for (root, mut path) in roots {
        walker.walk(root, &mut path)?;
    }
    Ok(walker.out)
}

struct Walker<'a> {
    graph: &'a ConfigGraph,
    seen: HashSet<NodeId>,
    out: Vec<(Visit<'a>, Path)>,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, value: &'a Value, path: &mut Path) -> Result<(), GraphError> {
        match value {
            Value::Node(id) => {
                if !self.seen.insert(*id) {
                    return Ok(());
                }
                let graph = self.graph;
                let node = graph.node(*id)?;
                self.out.push((Visit::Node { id: *id, node }, path.clone()));
                self.walk_named(node.arguments(), path)?;
            }
            Value::List(items) | Value::Tuple(items) => {
                self.out.push((Visit::Value(value), path.clone()));
                self.walk_sequence(items, path)?;
            }
            Value::Dict(entries) => {
                self.out.push((Visit::Value(value), path.clone()));
                for (key, item) in entries {
                    path.push(PathElement::Key(key.clone()));
                    self.walk(item, path)?;
                    path.pop();
                }
            }
            Value::Ir(ir) => {
                self.out.push((Visit::Value(value), path.clone()));
                match ir {
                    CodeIr::SymbolReference(_) => {}
                    CodeIr::Call(call) => {
                        self.walk_sequence(&call.positional_arg_expressions, path)?;
                        self.walk_named(&call.arg_expressions, path)?;
                    }
                    CodeIr::WithTags(tagged) => {
                        path.push(PathElement::Attr("item_to_tag".to_string()));
                        self.walk(&tagged.item_to_tag, path)?;
                        path.pop();
                    }
                }
            }
            _ => self.out.push((Visit::Value(value), path.clone())),
        }
        Ok(())
    }

    fn walk_sequence(&mut self, items: &'a [Value], path: &mut Path) -> Result<(), GraphError> {
        for (i, item) in items.iter().enumerate() {
            path.push(PathElement::Index(i));
            self.walk(item, path)?;
            path.pop();
        }
        Ok(())
    }

    fn walk_named(&mut self, arguments: &'a Arguments, path: &mut Path) -> Result<(), GraphError> {
        for (name, item) in arguments.iter() {
            path.push(PathElement::Attr(name.to_string()));
            self.walk(item, path)?;
            path.pop();
        }
        Ok(())
    }
}
