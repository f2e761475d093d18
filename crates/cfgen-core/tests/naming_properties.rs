//! Property tests for import naming.

use std::collections::HashMap;

use cfgen_core::{CollisionStrategy, ImportConfig, ImportManager, Symbol};
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("models".to_string()),
        Just("layers".to_string()),
        Just("nn".to_string()),
        Just("list".to_string()),
        "[a-z][a-z0-9_]{0,5}",
    ]
}

fn module_symbol() -> impl Strategy<Value = Symbol> {
    (
        prop::collection::vec(segment(), 1..4),
        "[A-Z][a-zA-Z0-9]{0,5}",
    )
        .prop_map(|(modules, name)| Symbol::class(modules.join("."), name))
}

/// Builtins are named bare, so they compete with module aliases.
fn builtin_symbol() -> impl Strategy<Value = Symbol> {
    segment().prop_map(Symbol::builtin)
}

fn symbol() -> impl Strategy<Value = Symbol> {
    prop_oneof![3 => module_symbol(), 1 => builtin_symbol()]
}

fn strategy() -> impl Strategy<Value = CollisionStrategy> {
    prop_oneof![Just(CollisionStrategy::Suffix), Just(CollisionStrategy::Qualify)]
}

proptest! {
    #[test]
    fn test_add_is_idempotent(symbols in prop::collection::vec(symbol(), 1..30), collision in strategy()) {
        let mut manager = ImportManager::new(ImportConfig { collision, ..ImportConfig::default() });
        let first: Vec<String> = symbols.iter().map(|s| manager.add(s).unwrap()).collect();
        let second: Vec<String> = symbols.iter().map(|s| manager.add(s).unwrap()).collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_names_are_injective(symbols in prop::collection::vec(symbol(), 1..30), collision in strategy()) {
        let mut manager = ImportManager::new(ImportConfig { collision, ..ImportConfig::default() });
        let mut owners: HashMap<String, (String, String)> = HashMap::new();
        for symbol in &symbols {
            let name = manager.add(symbol).unwrap();
            let key = (symbol.module.clone(), symbol.qualname.clone());
            let owner = owners.entry(name).or_insert_with(|| key.clone());
            prop_assert_eq!(owner, &key);
        }
    }

    #[test]
    fn test_module_aliases_are_unique(symbols in prop::collection::vec(symbol(), 1..30), collision in strategy()) {
        let mut manager = ImportManager::new(ImportConfig { collision, ..ImportConfig::default() });
        for symbol in &symbols {
            manager.add(symbol).unwrap();
        }
        for symbol in symbols.iter().filter(|s| s.is_builtin()) {
            let name = manager.name_of(symbol).unwrap();
            let builtins_name = format!("builtins.{}", symbol.qualname);
            prop_assert!(name == symbol.qualname || name == builtins_name);
        }
        let mut aliases: Vec<&str> = manager.imports().iter().map(|i| i.alias.as_str()).collect();
        let count = aliases.len();
        aliases.sort_unstable();
        aliases.dedup();
        prop_assert_eq!(aliases.len(), count);
        prop_assert!(aliases.iter().all(|alias| !["list", "lambda", "class"].contains(alias)));
    }
}
