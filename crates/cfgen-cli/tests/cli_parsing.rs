//! CLI parsing tests for the cfgen command
//!
//! Tests that verify CLI argument parsing and the end-to-end command flow.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const MODEL: &str = r#"{
    "nodes": [
        {"id": "head", "callable": {"module": "models", "qualname": "Head", "kind": "class"},
         "arguments": [
            {"name": "encoder", "value": {"node": "enc"}},
            {"name": "activation", "value": {"symbol": {"module": "models.ops", "qualname": "gelu"}}}
         ]},
        {"id": "enc", "callable": {"module": "models", "qualname": "Encoder", "kind": "class"},
         "arguments": [{"name": "dim", "value": {"int": 128}}]}
    ],
    "fixture": {
        "name": "build",
        "output": {"node": "head"}
    }
}"#;

const UNSET_TAG: &str = r#"{
    "nodes": [
        {"id": "enc", "callable": {"module": "models", "qualname": "Encoder", "kind": "class"},
         "arguments": [{"name": "dropout", "tags": [{"module": "models.tags", "qualname": "Rate", "kind": "class"}]}]}
    ],
    "fixture": {"name": "build", "output": {"node": "enc"}}
}"#;

/// Get a Command for the cfgen binary, isolated from user configuration
#[allow(deprecated)]
fn cfgen(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cfgen").expect("Failed to find cfgen binary");
    cmd.env("HOME", home.path())
        .env_remove("CFGEN_CONFIG")
        .env_remove("CFGEN_BASE_MODULE")
        .current_dir(home.path());
    cmd
}

fn write_document(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("Failed to write document");
    path
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_shows_all_commands() {
    let home = TempDir::new().unwrap();
    cfgen(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("imports"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    cfgen(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cfgen"));
}

// ============================================================================
// Global Options Tests
// ============================================================================

#[test]
fn test_global_options_in_help() {
    let home = TempDir::new().unwrap();
    cfgen(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--quiet"))
        .stdout(predicate::str::contains("--base-module"))
        .stdout(predicate::str::contains("--collision"));
}

#[test]
fn test_invalid_collision_policy() {
    let home = TempDir::new().unwrap();
    cfgen(&home)
        .args(["--collision", "rename", "config", "show"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_config_file_fails_command() {
    let home = TempDir::new().unwrap();
    let input = write_document(&home, "model.json", MODEL);
    let config = write_document(&home, "bad.toml", "[logging]\nlevel = \"loud\"\n");

    cfgen(&home)
        .arg("--config")
        .arg(&config)
        .arg("generate")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"))
        .stderr(predicate::str::contains("unknown level 'loud'"));
}

#[test]
fn test_invalid_local_alias_fails_imports() {
    let home = TempDir::new().unwrap();
    let input = write_document(&home, "model.json", MODEL);
    std::fs::create_dir(home.path().join(".cfgen")).unwrap();
    write_document(
        &home,
        ".cfgen/config.toml",
        "[imports.aliases]\nmodels = \"not-an-alias\"\n",
    );

    cfgen(&home)
        .arg("imports")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "imports.aliases.models: 'not-an-alias' is not a valid identifier",
        ));
}

// ============================================================================
// Generate Command Tests
// ============================================================================

#[test]
fn test_generate_help() {
    let home = TempDir::new().unwrap();
    cfgen(&home)
        .args(["generate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--compact"));
}

#[test]
fn test_generate_emits_wrapper_calls() {
    let home = TempDir::new().unwrap();
    let input = write_document(&home, "model.json", MODEL);

    cfgen(&home)
        .arg("generate")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"fdl\""))
        .stdout(predicate::str::contains("fdl.Config"))
        .stdout(predicate::str::contains("\"Encoder\""))
        .stdout(predicate::str::contains("\"gelu\""));
}

#[test]
fn test_generate_base_module_override() {
    let home = TempDir::new().unwrap();
    let input = write_document(&home, "model.json", MODEL);

    cfgen(&home)
        .args(["--base-module", "acme.config", "generate", "--compact"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"acme.config\""));
}

#[test]
fn test_generate_writes_output_file() {
    let home = TempDir::new().unwrap();
    let input = write_document(&home, "model.json", MODEL);
    let output = home.path().join("model.ir.json");

    cfgen(&home)
        .arg("generate")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("\"imports\""));
    assert!(written.contains("\"functions\""));
}

#[test]
fn test_generate_missing_input() {
    let home = TempDir::new().unwrap();
    cfgen(&home)
        .args(["generate", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_generate_reports_unset_tagged_field() {
    let home = TempDir::new().unwrap();
    let input = write_document(&home, "tagged.json", UNSET_TAG);

    cfgen(&home)
        .arg("generate")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("dropout"));
}

// ============================================================================
// Imports Command Tests
// ============================================================================

#[test]
fn test_imports_table() {
    let home = TempDir::new().unwrap();
    let input = write_document(&home, "model.json", MODEL);

    cfgen(&home)
        .arg("imports")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("ALIAS"))
        .stdout(predicate::str::contains("models.ops"))
        .stdout(predicate::str::contains("fiddle"));
}

#[test]
fn test_imports_statements() {
    let home = TempDir::new().unwrap();
    let input = write_document(&home, "model.json", MODEL);

    cfgen(&home)
        .args(["imports", "--statements"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("import fiddle as fdl"))
        .stdout(predicate::str::contains("import models"));
}

#[test]
fn test_imports_json_and_statements_conflict() {
    let home = TempDir::new().unwrap();
    let input = write_document(&home, "model.json", MODEL);

    cfgen(&home)
        .args(["imports", "--json", "--statements"])
        .arg(&input)
        .assert()
        .failure();
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_show_defaults() {
    let home = TempDir::new().unwrap();
    cfgen(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_module = \"fiddle\""));
}

#[test]
fn test_config_path_json() {
    let home = TempDir::new().unwrap();
    cfgen(&home)
        .args(["config", "path", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"local_exists\": false"));
}

#[test]
fn test_config_init_local() {
    let home = TempDir::new().unwrap();
    cfgen(&home).args(["config", "init"]).assert().success();

    cfgen(&home)
        .args(["config", "path", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"local_exists\": true"));
}
