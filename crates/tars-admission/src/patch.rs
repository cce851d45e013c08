//! Incremental construction of RFC 6902 patches.
//!
//! Every operation handed to [`PatchBuilder`] is applied to a private working
//! copy of the object before it is recorded. Later operations therefore see
//! the document exactly as the API server will see it once the preceding
//! operations have been applied, which keeps array indices correct after
//! removals and lets the helpers skip operations that would not change
//! anything.

use json_patch::{AddOperation, Patch, PatchOperation, RemoveOperation, ReplaceOperation};
use jsonptr::PointerBuf;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::errors::Result;

#[derive(Debug)]
pub struct PatchBuilder {
    working: Value,
    operations: Vec<PatchOperation>,
}

/// Build a json pointer out of unescaped tokens. `/` and `~` inside a token
/// are escaped as `~1` and `~0`.
pub fn pointer<'a>(tokens: impl IntoIterator<Item = &'a str>) -> PointerBuf {
    PointerBuf::from_tokens(tokens)
}

impl PatchBuilder {
    pub fn new(object: &Value) -> Self {
        PatchBuilder {
            working: object.clone(),
            operations: Vec::new(),
        }
    }

    /// The object with all the operations recorded so far applied.
    pub fn working(&self) -> &Value {
        &self.working
    }

    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let path = pointer(path.iter().copied());
        self.working.pointer(path.as_str())
    }

    fn contains(&self, path: &[&str]) -> bool {
        self.get(path).is_some()
    }

    fn push(&mut self, operation: PatchOperation) -> Result<()> {
        json_patch::patch(&mut self.working, std::slice::from_ref(&operation))?;
        self.operations.push(operation);
        Ok(())
    }

    pub fn add(&mut self, path: &[&str], value: Value) -> Result<()> {
        self.push(PatchOperation::Add(AddOperation {
            path: pointer(path.iter().copied()),
            value,
        }))
    }

    pub fn replace(&mut self, path: &[&str], value: Value) -> Result<()> {
        self.push(PatchOperation::Replace(ReplaceOperation {
            path: pointer(path.iter().copied()),
            value,
        }))
    }

    /// Remove the value at `path`. Nothing is emitted when the path does not
    /// exist; returns whether an operation was recorded.
    pub fn remove(&mut self, path: &[&str]) -> Result<bool> {
        if !self.contains(path) {
            return Ok(false);
        }
        self.push(PatchOperation::Remove(RemoveOperation {
            path: pointer(path.iter().copied()),
        }))?;
        Ok(true)
    }

    /// Make the value at `path` equal to `value`: `add` when it is missing,
    /// `replace` when it differs, nothing when it already matches.
    pub fn set(&mut self, path: &[&str], value: Value) -> Result<()> {
        match self.get(path) {
            Some(current) if *current == value => Ok(()),
            Some(_) => self.replace(path, value),
            None => self.add(path, value),
        }
    }

    /// Make sure `path` holds a map, adding an empty one when it is missing
    /// or null.
    pub fn ensure_object(&mut self, path: &[&str]) -> Result<()> {
        match self.get(path) {
            Some(Value::Object(_)) => Ok(()),
            Some(Value::Null) => self.replace(path, Value::Object(Map::new())),
            Some(_) => Ok(()),
            None => self.add(path, Value::Object(Map::new())),
        }
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        string_map(self.get(&["metadata", "labels"]))
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        string_map(self.get(&["metadata", "annotations"]))
    }

    pub fn set_label(&mut self, key: &str, value: &str) -> Result<()> {
        self.ensure_object(&["metadata"])?;
        self.ensure_object(&["metadata", "labels"])?;
        self.set(&["metadata", "labels", key], Value::String(value.to_owned()))
    }

    pub fn remove_label(&mut self, key: &str) -> Result<bool> {
        self.remove(&["metadata", "labels", key])
    }

    pub fn remove_annotation(&mut self, key: &str) -> Result<bool> {
        self.remove(&["metadata", "annotations", key])
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn build(self) -> Patch {
        Patch(self.operations)
    }
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_owned())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rendered(builder: PatchBuilder) -> Value {
        serde_json::to_value(builder.build()).unwrap()
    }

    #[test]
    fn label_keys_are_escaped() {
        let mut builder = PatchBuilder::new(&json!({"metadata": {"labels": {}}}));
        builder.set_label("tars.io/ServerApp", "Test").unwrap();

        assert_eq!(
            rendered(builder),
            json!([{"op": "add", "path": "/metadata/labels/tars.io~1ServerApp", "value": "Test"}])
        );
    }

    #[test]
    fn tilde_is_escaped() {
        assert_eq!(pointer(["a~b", "c/d"]).as_str(), "/a~0b/c~1d");
    }

    #[test]
    fn missing_labels_map_is_created_first() {
        let mut builder = PatchBuilder::new(&json!({"metadata": {"name": "a"}}));
        builder.set_label("tars.io/ServerApp", "Test").unwrap();

        assert_eq!(
            rendered(builder),
            json!([
                {"op": "add", "path": "/metadata/labels", "value": {}},
                {"op": "add", "path": "/metadata/labels/tars.io~1ServerApp", "value": "Test"}
            ])
        );
    }

    #[test]
    fn set_is_a_noop_when_value_matches() {
        let mut builder =
            PatchBuilder::new(&json!({"metadata": {"labels": {"tars.io/ServerApp": "Test"}}}));
        builder.set_label("tars.io/ServerApp", "Test").unwrap();
        assert!(builder.is_empty());
    }

    #[test]
    fn set_replaces_stale_value() {
        let mut builder =
            PatchBuilder::new(&json!({"metadata": {"labels": {"tars.io/ServerApp": "Old"}}}));
        builder.set_label("tars.io/ServerApp", "New").unwrap();

        assert_eq!(
            rendered(builder),
            json!([{"op": "replace", "path": "/metadata/labels/tars.io~1ServerApp", "value": "New"}])
        );
    }

    #[test]
    fn remove_of_missing_path_is_skipped() {
        let mut builder = PatchBuilder::new(&json!({"spec": {}}));
        assert!(!builder.remove(&["spec", "password"]).unwrap());
        assert!(builder.is_empty());
    }

    #[test]
    fn indices_follow_previous_removals() {
        let mut builder = PatchBuilder::new(&json!({"items": ["a", "b", "c"]}));
        builder.remove(&["items", "0"]).unwrap();
        builder.remove(&["items", "0"]).unwrap();

        assert_eq!(builder.working(), &json!({"items": ["c"]}));
        assert_eq!(
            rendered(builder),
            json!([
                {"op": "remove", "path": "/items/0"},
                {"op": "remove", "path": "/items/0"}
            ])
        );
    }

    #[test]
    fn patch_applies_to_original_document() {
        let original = json!({"metadata": {"name": "a"}, "spec": {"password": "x"}});
        let mut builder = PatchBuilder::new(&original);
        builder.set_label("tars.io/Parent", "root").unwrap();
        builder.remove(&["spec", "password"]).unwrap();
        let expected = builder.working().clone();

        let mut document = original;
        json_patch::patch(&mut document, &builder.build()).unwrap();
        assert_eq!(document, expected);
    }
}
