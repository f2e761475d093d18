//! Code-IR: intermediate representation of generated code.
//!
//! Code generation lowers a configuration into one or more fixture
//! functions. Each function body is a list of variable declarations plus an
//! output expression, all held as [`Value`] trees that mix plain values with
//! IR nodes.
//!
//! Call and tag nodes sit behind `Rc` so that a node substituted once can be
//! referenced from several places in the output without being duplicated.

use std::rc::Rc;

use serde::Serialize;

use crate::graph::{Arguments, Buildable};
use crate::traversal::{Path, PathElement};
use crate::value::{Symbol, Value};

// ============================================================================
// Expressions
// ============================================================================

/// A Code-IR node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeIr {
    /// Bare reference to an imported symbol
    SymbolReference(Symbol),
    /// Call of a wrapper type or fixture
    Call(Rc<SymbolOrFixtureCall>),
    /// Argument wrapped with tag metadata
    WithTags(Rc<WithTagsCall>),
}

impl CodeIr {
    pub fn type_name(&self) -> &'static str {
        match self {
            CodeIr::SymbolReference(_) => "symbol_reference",
            CodeIr::Call(_) => "call",
            CodeIr::WithTags(_) => "with_tags",
        }
    }

    /// Child values of this node, positional arguments before keyword ones.
    pub fn children(&self) -> Vec<&Value> {
        match self {
            CodeIr::SymbolReference(_) => Vec::new(),
            CodeIr::Call(call) => call
                .positional_arg_expressions
                .iter()
                .chain(call.arg_expressions.iter().map(|(_, value)| value))
                .collect(),
            CodeIr::WithTags(tagged) => vec![&tagged.item_to_tag],
        }
    }
}

/// Call expression: `symbol_expression(*positional, **arguments)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolOrFixtureCall {
    /// Rendered callee, e.g. `fdl.Config`
    pub symbol_expression: String,
    pub positional_arg_expressions: Vec<Value>,
    pub arg_expressions: Arguments,
    #[serde(skip_serializing_if = "HistoryComments::is_empty")]
    pub history_comments: HistoryComments,
}

/// Tag wrapper expression: `TagA.new(TagB.new(item))`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithTagsCall {
    /// Rendered tag names, in sorted tag order
    pub tag_symbol_expressions: Vec<String>,
    pub item_to_tag: Value,
}

/// Per-argument provenance comments attached to a generated call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryComments {
    pub per_argument: Vec<(String, String)>,
}

impl HistoryComments {
    pub fn is_empty(&self) -> bool {
        self.per_argument.is_empty()
    }

    /// Builder: add a comment for an argument
    pub fn with_comment(mut self, argument: impl Into<String>, comment: impl Into<String>) -> Self {
        self.per_argument.push((argument.into(), comment.into()));
        self
    }
}

/// History formatter that produces no comments.
pub fn noop_history_comments(_: &Buildable) -> HistoryComments {
    HistoryComments::default()
}

// ============================================================================
// Fixtures
// ============================================================================

/// `name = expression` inside a fixture body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclaration {
    pub name: String,
    pub expression: Value,
}

impl VariableDeclaration {
    pub fn new(name: impl Into<String>, expression: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

/// A generated function returning the configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureFunction {
    pub name: String,
    pub parameters: Vec<String>,
    pub variables: Vec<VariableDeclaration>,
    pub output_value: Value,
}

impl FixtureFunction {
    pub fn new(name: impl Into<String>, output_value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            variables: Vec::new(),
            output_value: output_value.into(),
        }
    }

    /// Builder: add a parameter
    pub fn with_parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(name.into());
        self
    }

    /// Builder: add a variable declaration
    pub fn with_variable(mut self, variable: VariableDeclaration) -> Self {
        self.variables.push(variable);
        self
    }

    /// Body expressions with their paths: each variable's expression, then
    /// the output value.
    pub fn body_slots(&self) -> Vec<(&Value, Path)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, variable)| (&variable.expression, Self::variable_path(i)))
            .chain(std::iter::once((&self.output_value, Self::output_path())))
            .collect()
    }

    /// Replace the body wholesale.
    pub fn replace_body(&mut self, variables: Vec<VariableDeclaration>, output_value: Value) {
        self.variables = variables;
        self.output_value = output_value;
    }

    pub(crate) fn variable_path(index: usize) -> Path {
        Path::from(vec![
            PathElement::Attr("variables".to_string()),
            PathElement::Index(index),
            PathElement::Attr("expression".to_string()),
        ])
    }

    pub(crate) fn output_path() -> Path {
        Path::from(vec![PathElement::Attr("output_value".to_string())])
    }
}

/// A fixture function together with the fixtures it calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallInstance {
    pub fixture: FixtureFunction,
    pub children: Vec<CallInstance>,
}

impl CallInstance {
    pub fn new(fixture: FixtureFunction) -> Self {
        Self {
            fixture,
            children: Vec::new(),
        }
    }

    /// Builder: add a child call
    pub fn with_child(mut self, child: CallInstance) -> Self {
        self.children.push(child);
        self
    }

    /// Every fixture in this call tree, parents before children.
    pub fn all_fixture_functions(&self) -> Vec<&FixtureFunction> {
        let mut out = Vec::new();
        self.collect_fixtures(&mut out);
        out
    }

    /// Mutable variant of [`all_fixture_functions`](Self::all_fixture_functions).
    pub fn all_fixture_functions_mut(&mut self) -> Vec<&mut FixtureFunction> {
        let mut out = Vec::new();
        self.collect_fixtures_mut(&mut out);
        out
    }

    fn collect_fixtures<'a>(&'a self, out: &mut Vec<&'a FixtureFunction>) {
        out.push(&self.fixture);
        for child in &self.children {
            child.collect_fixtures(out);
        }
    }

    fn collect_fixtures_mut<'a>(&'a mut self, out: &mut Vec<&'a mut FixtureFunction>) {
        let CallInstance { fixture, children } = self;
        out.push(fixture);
        for child in children {
            child.collect_fixtures_mut(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> FixtureFunction {
        FixtureFunction::new(name, Value::None)
    }

    #[test]
    fn test_all_fixture_functions_order() {
        let call = CallInstance::new(fixture("root"))
            .with_child(CallInstance::new(fixture("a")).with_child(CallInstance::new(fixture("a1"))))
            .with_child(CallInstance::new(fixture("b")));

        let names: Vec<&str> = call
            .all_fixture_functions()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn test_all_fixture_functions_mut() {
        let mut call = CallInstance::new(fixture("root")).with_child(CallInstance::new(fixture("a")));
        for f in call.all_fixture_functions_mut() {
            f.parameters.push("seed".to_string());
        }
        assert!(call
            .all_fixture_functions()
            .iter()
            .all(|f| f.parameters == vec!["seed".to_string()]));
    }

    #[test]
    fn test_body_slots_paths() {
        let f = FixtureFunction::new("build", Value::Int(1))
            .with_variable(VariableDeclaration::new("encoder", Value::Int(2)));
        let slots = f.body_slots();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].1.to_string(), ".variables[0].expression");
        assert_eq!(slots[1].1.to_string(), ".output_value");
        assert_eq!(slots[1].0, &Value::Int(1));
    }

    #[test]
    fn test_call_children() {
        let mut arguments = Arguments::new();
        arguments.insert("dim", 4);
        let call = CodeIr::Call(Rc::new(SymbolOrFixtureCall {
            symbol_expression: "fdl.Config".to_string(),
            positional_arg_expressions: vec![Value::Ir(CodeIr::SymbolReference(Symbol::class(
                "models", "Encoder",
            )))],
            arg_expressions: arguments,
            history_comments: HistoryComments::default(),
        }));
        assert_eq!(call.children().len(), 2);
        assert_eq!(call.children()[1], &Value::Int(4));
    }

    #[test]
    fn test_noop_history_comments() {
        let node = Buildable::config(Symbol::class("models", "Encoder"));
        assert!(noop_history_comments(&node).is_empty());
        assert!(!HistoryComments::default()
            .with_comment("dim", "set in base config")
            .is_empty());
    }
}
