//! Layered context store shared by every action and oracle call.
//!
//! Four layers, each a string-keyed map of JSON values:
//!
//! - **static**: system description and action catalog, fixed at construction.
//! - **semi-static**: project facts (root path, discovered files).
//! - **dynamic**: objective plus accumulated action results.
//! - **execution state**: last action, latest evaluation verdict.
//!
//! Reads never mutate. Writes are last-writer-wins per key within a layer.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::action::catalog_value;

/// A single context layer.
pub type Layer = Map<String, Value>;

const DESCRIPTION: &str =
    "Plans and executes documentation and maintenance tasks for a project, one action at a time.";
const GENERATED_CONTENT: &str = "generated_content";

/// Full four-layer view handed to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    #[serde(rename = "static")]
    pub static_layer: Layer,
    pub semi_static: Layer,
    pub dynamic: Layer,
    pub execution_state: Layer,
}

impl ContextSnapshot {
    pub fn to_json_pretty(&self) -> String {
        // Maps of JSON values with string keys always serialize.
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextStore {
    static_layer: Layer,
    semi_static: Layer,
    dynamic: Layer,
    execution_state: Layer,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    pub fn new() -> Self {
        let mut static_layer = Layer::new();
        static_layer.insert("description".to_string(), Value::from(DESCRIPTION));
        static_layer.insert("available_actions".to_string(), catalog_value());
        Self {
            static_layer,
            semi_static: Layer::new(),
            dynamic: Layer::new(),
            execution_state: Layer::new(),
        }
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            static_layer: self.static_layer.clone(),
            semi_static: self.semi_static.clone(),
            dynamic: self.dynamic.clone(),
            execution_state: self.execution_state.clone(),
        }
    }

    pub fn static_layer(&self) -> &Layer {
        &self.static_layer
    }

    pub fn semi_static(&self) -> &Layer {
        &self.semi_static
    }

    pub fn dynamic(&self) -> &Layer {
        &self.dynamic
    }

    pub fn execution_state(&self) -> &Layer {
        &self.execution_state
    }

    /// Dynamic-layer lookup; `None` is the absent sentinel.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.dynamic.get(key)
    }

    pub fn objective(&self) -> Option<&str> {
        self.dynamic.get("objective").and_then(Value::as_str)
    }

    /// Reset the dynamic layer to `{objective: text}`.
    pub fn set_objective(&mut self, objective: impl Into<String>) {
        self.dynamic = Layer::new();
        self.dynamic
            .insert("objective".to_string(), Value::String(objective.into()));
    }

    /// Insert or overwrite a dynamic-layer entry.
    pub fn update(&mut self, key: impl Into<String>, value: Value) {
        self.dynamic.insert(key.into(), value);
    }

    /// Merge `partial` into the execution-state layer.
    pub fn update_execution_state(&mut self, partial: Layer) {
        self.execution_state.extend(partial);
    }

    /// Replace the semi-static layer with the project root and file list.
    pub fn set_project(&mut self, root: &Path, files: Vec<String>) {
        self.semi_static = Layer::new();
        self.semi_static
            .insert("path".to_string(), Value::String(root.display().to_string()));
        self.refresh_files(files);
    }

    pub fn refresh_files(&mut self, files: Vec<String>) {
        self.semi_static.insert(
            "files".to_string(),
            Value::Array(files.into_iter().map(Value::String).collect()),
        );
    }

    /// Record generated content under the dynamic `generated_content` map.
    pub fn save_generated_content(&mut self, key: impl Into<String>, content: Value) {
        let entry = self
            .dynamic
            .entry(GENERATED_CONTENT)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(key.into(), content);
        }
    }

    pub fn reset_dynamic(&mut self) {
        self.dynamic = Layer::new();
    }

    pub fn reset_execution_state(&mut self) {
        self.execution_state = Layer::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer(value: Value) -> Layer {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn static_layer_lists_catalog() {
        let store = ContextStore::new();
        let actions = store.static_layer()["available_actions"]
            .as_array()
            .expect("array");
        assert!(actions.iter().any(|a| a["name"] == "evaluate_state"));
        assert!(store.static_layer().contains_key("description"));
    }

    #[test]
    fn set_objective_resets_dynamic_layer() {
        let mut store = ContextStore::new();
        store.update("stale", json!(1));
        store.set_objective("document all functions");
        assert_eq!(store.dynamic(), &layer(json!({"objective": "document all functions"})));
        assert_eq!(store.objective(), Some("document all functions"));
    }

    #[test]
    fn absent_keys_read_as_none() {
        let store = ContextStore::new();
        assert!(store.get("missing").is_none());
        assert!(store.objective().is_none());
    }

    /// Last writer wins per key in both the dynamic and execution layers.
    #[test]
    fn writes_are_last_writer_wins() {
        let mut store = ContextStore::new();
        store.update("k", json!("A"));
        store.update("k", json!("B"));
        assert_eq!(store.get("k"), Some(&json!("B")));

        store.update_execution_state(layer(json!({"k": "A", "other": 1})));
        store.update_execution_state(layer(json!({"k": "B"})));
        assert_eq!(store.execution_state(), &layer(json!({"k": "B", "other": 1})));
    }

    #[test]
    fn snapshot_is_union_of_layers() {
        let mut store = ContextStore::new();
        store.set_project(Path::new("/proj"), vec!["a.py".to_string()]);
        store.set_objective("obj");
        store.update_execution_state(layer(json!({"last_action": "analyze_project"})));

        let snapshot = store.snapshot();
        let value = serde_json::to_value(&snapshot).expect("serialize");
        assert_eq!(value["semi_static"]["files"], json!(["a.py"]));
        assert_eq!(value["dynamic"]["objective"], json!("obj"));
        assert_eq!(value["execution_state"]["last_action"], json!("analyze_project"));
        assert!(value["static"]["available_actions"].is_array());
    }

    #[test]
    fn snapshot_does_not_alias_store() {
        let mut store = ContextStore::new();
        let before = store.snapshot();
        store.update("k", json!(1));
        assert!(!before.dynamic.contains_key("k"));
    }

    #[test]
    fn refresh_files_keeps_project_path() {
        let mut store = ContextStore::new();
        store.set_project(Path::new("/proj"), Vec::new());
        store.refresh_files(vec!["b.rs".to_string()]);
        assert_eq!(store.semi_static()["path"], json!("/proj"));
        assert_eq!(store.semi_static()["files"], json!(["b.rs"]));
    }

    #[test]
    fn generated_content_accumulates() {
        let mut store = ContextStore::new();
        store.save_generated_content("first", json!("one"));
        store.save_generated_content("second", json!("two"));
        assert_eq!(
            store.get("generated_content"),
            Some(&json!({"first": "one", "second": "two"}))
        );
    }

    #[test]
    fn resets_clear_only_their_layer() {
        let mut store = ContextStore::new();
        store.set_objective("obj");
        store.update_execution_state(layer(json!({"last_action": "x"})));
        store.reset_dynamic();
        assert!(store.dynamic().is_empty());
        assert!(!store.execution_state().is_empty());
        store.reset_execution_state();
        assert!(store.execution_state().is_empty());
        assert!(!store.static_layer().is_empty());
    }
}
