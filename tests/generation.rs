//! File-driven generation flow: templates and variable sets on disk

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tempfile::tempdir;

use themeweave::cli::theme_file_name;
use themeweave::{compare, substitute, Template, VariableStore};

const TEMPLATE: &str = r##"{
    "name": "{{ meta.name }}",
    "colors": {
        "editor.background": "{{ palette.base }}",
        "editor.foreground": "{{ palette.text }}"
    }
}"##;

fn write_variables(dir: &Path, file: &str, value: &Value) -> std::path::PathBuf {
    let path = dir.join(file);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

// ========================================================================
// Single generation from files
// ========================================================================

#[test]
fn generates_theme_from_files_on_disk() {
    let dir = tempdir().unwrap();
    let template_path = dir.path().join("template.json");
    fs::write(&template_path, TEMPLATE).unwrap();
    let vars_path = write_variables(
        dir.path(),
        "dusk.json",
        &json!({
            "meta": { "name": "Dusk" },
            "palette": { "base": "#1E1E2E", "text": "#CDD6F4" }
        }),
    );

    let template = Template::parse(&fs::read_to_string(&template_path).unwrap()).unwrap();
    let store = VariableStore::from_json(&fs::read_to_string(&vars_path).unwrap()).unwrap();
    let doc = substitute(&template, &store).unwrap();

    assert_eq!(doc["name"], json!("Dusk"));
    assert_eq!(doc["colors"]["editor.background"], json!("#1e1e2e"));
}

#[test]
fn written_theme_reloads_identically() {
    let dir = tempdir().unwrap();
    let template = Template::parse(TEMPLATE).unwrap();
    let store = VariableStore::from_value(json!({
        "meta": { "name": "Dusk" },
        "palette": { "base": "#1E1E2E", "text": "#CDD6F4" }
    }))
    .unwrap();

    let doc = substitute(&template, &store).unwrap();
    let out_path = dir.path().join(theme_file_name(&doc, Path::new("dusk.json")));
    fs::write(&out_path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    let reloaded: Value = serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
    assert!(compare(&doc, &reloaded).is_identical());
}

// ========================================================================
// Batch generation: one template, several variable sets
// ========================================================================

#[test]
fn one_failing_variable_set_does_not_block_siblings() {
    let template = Template::parse(TEMPLATE).unwrap();

    let complete = VariableStore::from_value(json!({
        "meta": { "name": "Light" },
        "palette": { "base": "#FAFAFA", "text": "#333333" }
    }))
    .unwrap();
    let incomplete = VariableStore::from_value(json!({
        "meta": { "name": "Broken" },
        "palette": { "base": "#000000" }
    }))
    .unwrap();

    // The incomplete set fails on palette.text; the complete one still works
    assert!(substitute(&template, &incomplete).is_err());
    let doc = substitute(&template, &complete).unwrap();
    assert_eq!(doc["colors"]["editor.foreground"], json!("#333333"));
}

#[test]
fn output_names_come_from_theme_name_then_file_stem() {
    let named = json!({"name": "Rose Pine Moon"});
    assert_eq!(
        theme_file_name(&named, Path::new("vars/moon.json")),
        "rose-pine-moon.json"
    );

    let unnamed = json!({"colors": {}});
    assert_eq!(
        theme_file_name(&unnamed, Path::new("vars/moon.json")),
        "moon.json"
    );
}

// ========================================================================
// Malformed inputs
// ========================================================================

#[test]
fn malformed_variable_file_is_rejected() {
    assert!(VariableStore::from_json("{ not json").is_err());
    assert!(VariableStore::from_json("[1, 2]").is_err());
}

#[test]
fn malformed_template_file_is_rejected() {
    assert!(Template::parse("{ not json").is_err());
}
