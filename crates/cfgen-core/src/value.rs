//! Value Model for Configuration Graphs
//!
//! A single [`Value`] tree carries both sides of code generation: the input
//! configuration (literals, containers, references to config nodes, symbols)
//! and the generated Code-IR. Passes rewrite one into the other without
//! switching representations, which is what lets already-generated IR pass
//! through a traversal untouched.
//!
//! Symbols carry their own import metadata. [`resolve_import_path`] decides
//! whether a symbol has a stable module-qualified name that generated code
//! can import.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::code_ir::CodeIr;
use crate::graph::NodeId;

/// Module whose symbols are referenced without an import.
pub const BUILTINS_MODULE: &str = "builtins";

/// Module name given to code run as a script; never importable.
const MAIN_MODULE: &str = "__main__";

// ============================================================================
// Symbols
// ============================================================================

/// What kind of named entity a [`Symbol`] refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Plain function
    #[default]
    Function,
    /// Class or other type
    Class,
    /// Member of an enumeration (qualname is `Enum.MEMBER`)
    EnumMember,
    /// Module-level instance; has a name but is not a plain symbol
    Object,
}

impl SymbolKind {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::EnumMember => "enum_member",
            SymbolKind::Object => "object",
        }
    }
}

/// A named entity that generated code may reference.
///
/// Two symbols with the same `module` and `qualname` are the same symbol for
/// import purposes; see [`Symbol::key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    /// Dotted module path (e.g. `models.layers`)
    pub module: String,
    /// Dotted name within the module (e.g. `Encoder` or `Activation.RELU`)
    pub qualname: String,
    /// Kind of entity
    #[serde(default)]
    pub kind: SymbolKind,
}

impl Symbol {
    /// Create a symbol of the given kind.
    pub fn new(module: impl Into<String>, qualname: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            module: module.into(),
            qualname: qualname.into(),
            kind,
        }
    }

    /// Create a function symbol
    pub fn function(module: impl Into<String>, qualname: impl Into<String>) -> Self {
        Self::new(module, qualname, SymbolKind::Function)
    }

    /// Create a class symbol
    pub fn class(module: impl Into<String>, qualname: impl Into<String>) -> Self {
        Self::new(module, qualname, SymbolKind::Class)
    }

    /// Create an enum member symbol, e.g. `Activation.RELU`.
    pub fn enum_member(module: impl Into<String>, enum_qualname: &str, member: &str) -> Self {
        Self::new(
            module,
            format!("{enum_qualname}.{member}"),
            SymbolKind::EnumMember,
        )
    }

    /// Create a symbol for a module-level object
    pub fn object(module: impl Into<String>, qualname: impl Into<String>) -> Self {
        Self::new(module, qualname, SymbolKind::Object)
    }

    /// Create a symbol from the builtins module
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::function(BUILTINS_MODULE, name)
    }

    /// Identity used for import deduplication.
    pub fn key(&self) -> (&str, &str) {
        (&self.module, &self.qualname)
    }

    /// Fully qualified dotted name (`module.qualname`).
    pub fn qualified_name(&self) -> String {
        if self.module.is_empty() {
            self.qualname.clone()
        } else {
            format!("{}.{}", self.module, self.qualname)
        }
    }

    /// Check if this symbol lives in the builtins module
    pub fn is_builtin(&self) -> bool {
        self.module == BUILTINS_MODULE
    }

    /// Functions, classes and enum members; objects are excluded.
    pub fn is_plain_symbol_or_enum_value(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Function | SymbolKind::Class | SymbolKind::EnumMember
        )
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// Module and qualified name under which a symbol can be imported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportPath {
    pub module: String,
    pub qualname: String,
}

/// Resolve the import path of a symbol.
///
/// Returns `None` when the symbol has no stable import identity: an empty or
/// `__main__` module, or a module/qualname segment that is not an identifier
/// (which covers `<lambda>` and `<locals>` scopes).
pub fn resolve_import_path(symbol: &Symbol) -> Option<ImportPath> {
    if symbol.module == MAIN_MODULE || !is_dotted_path(&symbol.module) {
        return None;
    }
    if !is_dotted_path(&symbol.qualname) {
        return None;
    }
    Some(ImportPath {
        module: symbol.module.clone(),
        qualname: symbol.qualname.clone(),
    })
}

/// Check whether `name` is a valid identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// Check whether `path` is a non-empty sequence of dot-separated identifiers.
pub fn is_dotted_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(is_identifier)
}

// ============================================================================
// Tags
// ============================================================================

/// Opaque metadata marker attached to a config node argument.
///
/// A tag carries no value; only its identity (the symbol naming it) matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(Symbol);

impl Tag {
    /// Create a tag named by a class in `module`.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self(Symbol::class(module, name))
    }

    /// The symbol naming this tag
    pub fn symbol(&self) -> &Symbol {
        &self.0
    }
}

impl From<Symbol> for Tag {
    fn from(symbol: Symbol) -> Self {
        Self(symbol)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Values
// ============================================================================

/// A value in a configuration graph or in generated Code-IR.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Ordered sequence
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Mapping with insertion-ordered string keys
    Dict(Vec<(String, Value)>),
    /// Reference to a config node in a [`ConfigGraph`](crate::graph::ConfigGraph)
    Node(NodeId),
    Symbol(Symbol),
    /// Generated code
    Ir(CodeIr),
}

impl Value {
    /// Check if this is a literal (none, bool, number or string)
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    /// Check if this is a list, tuple or dict
    pub fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Tuple(_) | Value::Dict(_))
    }

    /// Get the referenced config node, if any
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Get the Code-IR, if any
    pub fn as_ir(&self) -> Option<&CodeIr> {
        match self {
            Value::Ir(ir) => Some(ir),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Node(_) => "node",
            Value::Symbol(_) => "symbol",
            Value::Ir(ir) => ir.type_name(),
        }
    }

    /// All config nodes referenced directly by this value, nested containers
    /// and IR included, in traversal order. Nodes are not followed.
    pub fn node_references(&self) -> Vec<NodeId> {
        let mut refs = Vec::new();
        self.collect_node_references(&mut refs);
        refs
    }

    fn collect_node_references(&self, refs: &mut Vec<NodeId>) {
        match self {
            Value::Node(id) => refs.push(*id),
            Value::List(items) | Value::Tuple(items) => {
                for item in items {
                    item.collect_node_references(refs);
                }
            }
            Value::Dict(entries) => {
                for (_, item) in entries {
                    item.collect_node_references(refs);
                }
            }
            Value::Ir(ir) => {
                for child in ir.children() {
                    child.collect_node_references(refs);
                }
            }
            Value::None
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Str(_)
            | Value::Symbol(_) => {}
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Value::Node(id)
    }
}

impl From<Symbol> for Value {
    fn from(symbol: Symbol) -> Self {
        Value::Symbol(symbol)
    }
}

impl From<CodeIr> for Value {
    fn from(ir: CodeIr) -> Self {
        Value::Ir(ir)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}
