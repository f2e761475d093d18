//! Classification of values seen during code generation.

use crate::value::{resolve_import_path, Value};

/// How the symbol substitution pass treats a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Reference to a config node; rewritten into a wrapper-type call
    ConfigNode,
    /// Plain function, class or enum member with a stable import path;
    /// rewritten into a symbol reference
    ImportableSymbol,
    /// Everything else, including Code-IR; left as is apart from its children
    OrdinaryValue,
}

/// Classify a value.
pub fn classify(value: &Value) -> Classification {
    match value {
        Value::Node(_) => Classification::ConfigNode,
        Value::Symbol(symbol)
            if symbol.is_plain_symbol_or_enum_value() && resolve_import_path(symbol).is_some() =>
        {
            Classification::ImportableSymbol
        }
        _ => Classification::OrdinaryValue,
    }
}
