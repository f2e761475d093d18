//! Symbolic Reference Passes
//!
//! Two passes run over every fixture of a [`CodegenTask`]:
//!
//! 1. [`import_symbols`] registers everything the generated module will
//!    reference (wrapper types, callables, tags, plain symbols) so that later
//!    naming passes see the final set of import aliases.
//! 2. [`replace_callables_and_configs_with_symbols`] rewrites each fixture
//!    body: config nodes become wrapper-type calls, importable symbols become
//!    symbol references, and tagged arguments are wrapped with their tags.
//!
//! Both passes must run before any pass that binds local variable names.

use std::rc::Rc;

use tracing::{debug, info, trace};

use crate::classify::{classify, Classification};
use crate::code_ir::{
    noop_history_comments, CodeIr, HistoryComments, SymbolOrFixtureCall, VariableDeclaration,
    WithTagsCall,
};
use crate::error::CodegenError;
use crate::graph::{Buildable, NodeId};
use crate::import_manager::ImportManager;
use crate::task::CodegenTask;
use crate::traversal::{iterate_all, MemoizedTraversal, State, Transform, Visit};
use crate::value::Value;

/// Produces per-argument history comments for a generated call.
pub type HistoryFormatter<'a> = &'a dyn Fn(&Buildable) -> HistoryComments;

// ============================================================================
// Import Registration
// ============================================================================

/// Counts from an [`import_symbols`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Config nodes visited (once per fixture that reaches them)
    pub config_nodes: usize,
    /// Plain symbols registered
    pub symbols: usize,
    /// Plain symbols skipped because they cannot be imported
    pub skipped: usize,
}

impl ImportSummary {
    /// Whether the base configuration module was imported
    pub fn needs_base_module(&self) -> bool {
        self.config_nodes > 0
    }
}

/// Register every symbol the task's fixtures will reference.
///
/// For each config node the callable, the wrapper type and every tag are
/// added; failures there are errors. Plain symbols that cannot be imported
/// are skipped. The base module is imported only if a config node was seen.
pub fn import_symbols(task: &mut CodegenTask) -> Result<ImportSummary, CodegenError> {
    let CodegenTask {
        graph,
        import_manager,
        top_level_call,
        base_module,
    } = task;
    let mut summary = ImportSummary::default();

    for fixture in top_level_call.all_fixture_functions() {
        for (visit, path) in iterate_all(graph, fixture.body_slots())? {
            match visit {
                Visit::Node { node, .. } => {
                    summary.config_nodes += 1;
                    import_manager.add(node.callable())?;
                    import_manager.add(&node.kind().wrapper_symbol(base_module))?;
                    for tag in node.argument_tags().values().flatten() {
                        import_manager.add(tag.symbol())?;
                    }
                }
                Visit::Value(Value::Symbol(symbol)) if symbol.is_plain_symbol_or_enum_value() => {
                    match import_manager.add(symbol) {
                        Ok(_) => summary.symbols += 1,
                        Err(err) => {
                            trace!(path = %path, error = %err, "skipping symbol without import path");
                            summary.skipped += 1;
                        }
                    }
                }
                Visit::Value(_) => {}
            }
        }
    }

    if summary.needs_base_module() {
        import_manager.add_by_name(base_module)?;
    }

    info!(
        config_nodes = summary.config_nodes,
        symbols = summary.symbols,
        skipped = summary.skipped,
        imports = import_manager.imports().len(),
        "registered imports"
    );
    Ok(summary)
}

// ============================================================================
// Symbol Substitution
// ============================================================================

/// Rewrite every fixture body into Code-IR, without history comments.
pub fn replace_callables_and_configs_with_symbols(
    task: &mut CodegenTask,
) -> Result<(), CodegenError> {
    replace_callables_and_configs_with_symbols_with_history(task, &noop_history_comments)
}

/// Rewrite every fixture body into Code-IR.
///
/// Within a fixture, each config node is rewritten once and every reference
/// to it receives the same shared call. Existing Code-IR is kept as is
/// (apart from its children) so the pass can run over partially generated
/// bodies.
pub fn replace_callables_and_configs_with_symbols_with_history(
    task: &mut CodegenTask,
    format_history: HistoryFormatter<'_>,
) -> Result<(), CodegenError> {
    let CodegenTask {
        graph,
        import_manager,
        top_level_call,
        base_module,
    } = task;
    let mut substitution = SymbolSubstitution {
        imports: import_manager,
        base_module: base_module.as_str(),
        format_history,
    };

    for fixture in top_level_call.all_fixture_functions_mut() {
        let mut traversal = MemoizedTraversal::new(graph);
        let slots = fixture.body_slots();
        let mut rewritten = Vec::with_capacity(slots.len());
        for (value, path) in slots {
            rewritten.push(traversal.run_at(&mut substitution, value, path)?);
        }

        let output_value = rewritten.pop().unwrap_or(Value::None);
        let variables = fixture
            .variables
            .iter()
            .zip(rewritten)
            .map(|(variable, expression)| VariableDeclaration {
                name: variable.name.clone(),
                expression,
            })
            .collect();
        fixture.replace_body(variables, output_value);
        debug!(
            fixture = %fixture.name,
            config_nodes = traversal.memoized(),
            "replaced config nodes with symbolic calls"
        );
    }
    Ok(())
}

struct SymbolSubstitution<'a> {
    imports: &'a mut ImportManager,
    base_module: &'a str,
    format_history: HistoryFormatter<'a>,
}

impl SymbolSubstitution<'_> {
    fn rewrite_node(
        &mut self,
        id: NodeId,
        node: &Buildable,
        state: &mut State<'_>,
    ) -> Result<Value, CodegenError> {
        let symbol_expression = self
            .imports
            .add(&node.kind().wrapper_symbol(self.base_module))?;
        self.imports.add(node.callable())?;

        let mut arguments = state.map_arguments(self, id)?;
        for (field, tags) in node.argument_tags() {
            if tags.is_empty() {
                continue;
            }
            if !arguments.contains(field) {
                return Err(CodegenError::tagged_field_not_set(
                    field.as_str(),
                    node,
                    arguments.names(),
                    state.current_path().clone(),
                ));
            }

            let tag_symbol_expressions = tags
                .iter()
                .map(|tag| self.imports.add(tag.symbol()))
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(slot) = arguments.get_mut(field) {
                let item_to_tag = std::mem::replace(slot, Value::None);
                *slot = CodeIr::WithTags(Rc::new(WithTagsCall {
                    tag_symbol_expressions,
                    item_to_tag,
                }))
                .into();
            }
        }

        trace!(node = %id, path = %state.current_path(), "rewrote config node");
        Ok(CodeIr::Call(Rc::new(SymbolOrFixtureCall {
            symbol_expression,
            positional_arg_expressions: vec![CodeIr::SymbolReference(node.callable().clone()).into()],
            arg_expressions: arguments,
            history_comments: (self.format_history)(node),
        }))
        .into())
    }
}

impl Transform for SymbolSubstitution<'_> {
    type Error = CodegenError;

    fn transform(&mut self, visit: Visit<'_>, state: &mut State<'_>) -> Result<Value, CodegenError> {
        match visit {
            Visit::Node { id, node } => self.rewrite_node(id, node, state),
            Visit::Value(value) => match (classify(value), value) {
                (Classification::ImportableSymbol, Value::Symbol(symbol)) => {
                    self.imports.add(symbol)?;
                    Ok(CodeIr::SymbolReference(symbol.clone()).into())
                }
                _ => state.map_children(self, value),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_ir::{CallInstance, FixtureFunction};
    use crate::graph::ConfigGraph;
    use crate::value::{Symbol, Tag};

    fn task_for(graph: ConfigGraph, output: Value) -> CodegenTask {
        CodegenTask::new(graph, CallInstance::new(FixtureFunction::new("build", output)))
    }

    fn output_of(task: &CodegenTask) -> &Value {
        &task.top_level_call.fixture.output_value
    }

    #[test]
    fn test_import_symbols_registers_node_symbols() {
        let mut graph = ConfigGraph::new();
        let id = graph
            .add_node(
                Buildable::config(Symbol::class("models.layers", "Encoder"))
                    .with_argument("act", Symbol::function("models.activations", "gelu"))
                    .with_tag("dim", Tag::new("models.tags", "Width")),
            )
            .unwrap();
        let mut task = task_for(graph, Value::Node(id));

        let summary = import_symbols(&mut task).unwrap();
        assert_eq!(summary.config_nodes, 1);
        assert_eq!(summary.symbols, 1);
        assert!(summary.needs_base_module());

        let modules: Vec<&str> = task
            .import_manager
            .imports()
            .iter()
            .map(|import| import.module.as_str())
            .collect();
        assert_eq!(
            modules,
            vec!["models.layers", "fiddle", "models.tags", "models.activations"]
        );
    }

    #[test]
    fn test_import_symbols_skips_unimportable() {
        let output = Value::List(vec![
            Symbol::function("models", "<lambda>").into(),
            Symbol::object("models", "DEFAULTS").into(),
        ]);
        let mut task = task_for(ConfigGraph::new(), output);

        let summary = import_symbols(&mut task).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.symbols, 0);
        assert!(task.import_manager.imports().is_empty());
    }

    #[test]
    fn test_partial_uses_partial_wrapper() {
        let mut graph = ConfigGraph::new();
        let id = graph
            .add_node(Buildable::partial(Symbol::function("train", "step")).with_argument("lr", 0.1))
            .unwrap();
        let mut task = task_for(graph, Value::Node(id));

        replace_callables_and_configs_with_symbols(&mut task).unwrap();
        let Value::Ir(CodeIr::Call(call)) = output_of(&task) else {
            panic!("expected call");
        };
        assert_eq!(call.symbol_expression, "fdl.Partial");
        assert_eq!(call.arg_expressions.get("lr"), Some(&Value::Float(0.1)));
    }

    #[test]
    fn test_history_formatter_is_applied() {
        let mut graph = ConfigGraph::new();
        let id = graph
            .add_node(Buildable::config(Symbol::class("models", "Encoder")).with_argument("dim", 4))
            .unwrap();
        let mut task = task_for(graph, Value::Node(id));

        let formatter = |node: &Buildable| {
            node.arguments()
                .names()
                .fold(HistoryComments::default(), |comments, name| {
                    comments.with_comment(name, "set by test")
                })
        };
        replace_callables_and_configs_with_symbols_with_history(&mut task, &formatter).unwrap();

        let Value::Ir(CodeIr::Call(call)) = output_of(&task) else {
            panic!("expected call");
        };
        assert_eq!(
            call.history_comments.per_argument,
            vec![("dim".to_string(), "set by test".to_string())]
        );
    }
}
