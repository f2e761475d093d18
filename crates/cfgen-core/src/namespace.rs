//! Names bound in the generated module.

use std::collections::HashSet;

use crate::value::is_identifier;

/// Keywords and builtins that generated code must never shadow.
const RESERVED_NAMES: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield", "bool", "dict", "float", "int", "len", "list", "object", "print",
    "range", "set", "str", "super", "tuple", "type",
];

/// Set of names already bound in a generated module.
#[derive(Debug, Clone)]
pub struct Namespace {
    names: HashSet<String>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    /// Create a namespace holding only the reserved names
    pub fn new() -> Self {
        Self {
            names: RESERVED_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Bind a name. Returns `false` if it was already bound.
    pub fn add(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Bind a fresh name derived from `base`.
    ///
    /// `base` is sanitized into an identifier; if that is taken, `_2`, `_3`,
    /// ... are appended until a free name is found.
    pub fn get_new_name(&mut self, base: &str) -> String {
        let base = sanitize(base);
        if self.add(base.clone()) {
            return base;
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{base}_{suffix}");
            if self.add(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn sanitize(base: &str) -> String {
    let mut name: String = base
        .chars()
        .map(|c| if c == '_' || c.is_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() {
        name.push('v');
    }
    if !is_identifier(&name) {
        name.insert(0, '_');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names() {
        let namespace = Namespace::new();
        assert!(namespace.contains("lambda"));
        assert!(namespace.contains("list"));
        assert!(!namespace.contains("encoder"));
    }

    #[test]
    fn test_get_new_name_suffixes() {
        let mut namespace = Namespace::new();
        assert_eq!(namespace.get_new_name("layers"), "layers");
        assert_eq!(namespace.get_new_name("layers"), "layers_2");
        assert_eq!(namespace.get_new_name("layers"), "layers_3");
        assert_eq!(namespace.get_new_name("list"), "list_2");
    }

    #[test]
    fn test_get_new_name_sanitizes() {
        let mut namespace = Namespace::new();
        assert_eq!(namespace.get_new_name("my-module"), "my_module");
        assert_eq!(namespace.get_new_name("3d"), "_3d");
        assert_eq!(namespace.get_new_name(""), "v");
    }
}
