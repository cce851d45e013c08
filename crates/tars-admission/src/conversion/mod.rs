//! Schema conversion between the served versions of the Tars custom
//! resources.
//!
//! Every converter is a pure function from one object to its counterpart in
//! the desired version. Fields the older version cannot express travel in a
//! JSON annotation on the way down and are restored from it on the way up.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::constants::{
    TARS_GROUP_VERSION_V1BETA1, TARS_GROUP_VERSION_V1BETA2, TARS_GROUP_VERSION_V1BETA3,
    TFRAMEWORK_CONFIG_KIND, TSERVER_KIND,
};

mod tframeworkconfig;
mod tserver;

pub type ConvertFn = fn(&Value) -> Value;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConverterKey {
    pub kind: String,
    pub from: String,
    pub to: String,
}

impl ConverterKey {
    pub fn new(kind: &str, from: &str, to: &str) -> Self {
        ConverterKey {
            kind: kind.to_owned(),
            from: from.to_owned(),
            to: to.to_owned(),
        }
    }
}

/// The converters known to the webhook. Filled once at startup, read-only
/// afterwards.
#[derive(Default)]
pub struct ConversionRegistry {
    converters: HashMap<ConverterKey, ConvertFn>,
}

impl ConversionRegistry {
    pub fn new() -> Self {
        ConversionRegistry::default()
    }

    /// Register `converter`, replacing any previous converter for the same key.
    pub fn register(&mut self, kind: &str, from: &str, to: &str, converter: ConvertFn) {
        self.converters
            .insert(ConverterKey::new(kind, from, to), converter);
    }

    pub fn lookup(&self, key: &ConverterKey) -> Option<ConvertFn> {
        self.converters.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

/// This models the apiextensions/v1/ConversionRequest object of Kubernetes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub uid: String,
    #[serde(rename = "desiredAPIVersion")]
    pub desired_api_version: String,
    #[serde(default)]
    pub objects: Vec<Value>,
}

/// This models the apiextensions/v1/ConversionResponse object of Kubernetes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub uid: String,
    pub result: ConversionResult,
    pub converted_objects: Vec<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConversionResult {
    pub fn success() -> Self {
        ConversionResult {
            status: "Success".to_owned(),
            message: None,
        }
    }
}

pub struct ConversionEngine {
    registry: ConversionRegistry,
}

impl Default for ConversionEngine {
    fn default() -> Self {
        ConversionEngine::new()
    }
}

impl ConversionEngine {
    /// An engine knowing every conversion served by the Tars CRDs.
    pub fn new() -> Self {
        let mut registry = ConversionRegistry::new();

        let tserver: [(&str, &str, ConvertFn); 6] = [
            (TARS_GROUP_VERSION_V1BETA1, TARS_GROUP_VERSION_V1BETA2, tserver::v1beta1_to_v1beta2),
            (TARS_GROUP_VERSION_V1BETA2, TARS_GROUP_VERSION_V1BETA1, tserver::v1beta2_to_v1beta1),
            (TARS_GROUP_VERSION_V1BETA1, TARS_GROUP_VERSION_V1BETA3, tserver::v1beta1_to_v1beta3),
            (TARS_GROUP_VERSION_V1BETA3, TARS_GROUP_VERSION_V1BETA1, tserver::v1beta3_to_v1beta1),
            (TARS_GROUP_VERSION_V1BETA2, TARS_GROUP_VERSION_V1BETA3, tserver::v1beta2_to_v1beta3),
            (TARS_GROUP_VERSION_V1BETA3, TARS_GROUP_VERSION_V1BETA2, tserver::v1beta3_to_v1beta2),
        ];
        for (from, to, converter) in tserver {
            registry.register(TSERVER_KIND, from, to, converter);
        }

        registry.register(
            TFRAMEWORK_CONFIG_KIND,
            TARS_GROUP_VERSION_V1BETA2,
            TARS_GROUP_VERSION_V1BETA3,
            tframeworkconfig::v1beta2_to_v1beta3,
        );
        registry.register(
            TFRAMEWORK_CONFIG_KIND,
            TARS_GROUP_VERSION_V1BETA3,
            TARS_GROUP_VERSION_V1BETA2,
            tframeworkconfig::v1beta3_to_v1beta2,
        );

        ConversionEngine { registry }
    }

    pub fn with_registry(registry: ConversionRegistry) -> Self {
        ConversionEngine { registry }
    }

    /// Convert every object of the request to the desired version.
    ///
    /// The converter is chosen from the kind and version of the first object:
    /// the API server only batches objects of one kind and version. When no
    /// converter is registered the objects are returned untouched.
    pub fn convert(&self, request: &ConversionRequest) -> ConversionResponse {
        let converter = request.objects.first().and_then(|first| {
            let key = ConverterKey::new(
                first.get("kind").and_then(Value::as_str).unwrap_or_default(),
                first.get("apiVersion").and_then(Value::as_str).unwrap_or_default(),
                &request.desired_api_version,
            );
            let converter = self.registry.lookup(&key);
            if converter.is_none() {
                debug!(
                    kind = %key.kind,
                    from = %key.from,
                    to = %key.to,
                    "no converter registered, echoing objects"
                );
            }
            converter
        });

        let converted_objects = match converter {
            Some(convert) => request.objects.iter().map(convert).collect(),
            None => request.objects.clone(),
        };

        ConversionResponse {
            uid: request.uid.clone(),
            result: ConversionResult::success(),
            converted_objects,
        }
    }
}

/// The payload of a conversion annotation.
#[derive(Debug, Default, Deserialize)]
struct Stash {
    #[serde(default)]
    append: Map<String, Value>,
}

/// Record `append` under the `annotation` of `object`.
fn stash(object: &mut Value, annotation: &str, append: Map<String, Value>) {
    let Some(annotations) = object
        .as_object_mut()
        .and_then(|object| child_object(object, "metadata"))
        .and_then(|metadata| child_object(metadata, "annotations"))
    else {
        return;
    };
    let mut stash = Map::new();
    stash.insert("append".to_owned(), Value::Object(append));
    annotations.insert(
        annotation.to_owned(),
        Value::String(Value::Object(stash).to_string()),
    );
}

/// Remove `annotation` from `object`, returning the fields it carried.
/// A missing, empty or unreadable annotation carries nothing.
fn unstash(object: &mut Value, annotation: &str) -> Map<String, Value> {
    let raw = object
        .pointer_mut("/metadata/annotations")
        .and_then(Value::as_object_mut)
        .and_then(|annotations| annotations.remove(annotation));

    match raw.as_ref().and_then(Value::as_str) {
        None | Some("") => Map::new(),
        Some(raw) => match serde_json::from_str::<Stash>(raw) {
            Ok(stash) => stash.append,
            Err(error) => {
                warn!(annotation, error = %error, "cannot read conversion annotation");
                Map::new()
            }
        },
    }
}

/// The object stored under `key`, created when absent or null.
fn child_object<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
) -> Option<&'a mut Map<String, Value>> {
    let child = parent
        .entry(key.to_owned())
        .or_insert_with(|| Value::Object(Map::new()));
    if child.is_null() {
        *child = Value::Object(Map::new());
    }
    child.as_object_mut()
}

fn set_api_version(object: &mut Value, api_version: &str) {
    if let Some(object) = object.as_object_mut() {
        object.insert(
            "apiVersion".to_owned(),
            Value::String(api_version.to_owned()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(desired: &str, objects: Vec<Value>) -> ConversionRequest {
        ConversionRequest {
            uid: "705ab4f5-6393-11e8-b7cc-42010a800002".to_owned(),
            desired_api_version: desired.to_owned(),
            objects,
        }
    }

    #[test]
    fn registered_pairs() {
        let engine = ConversionEngine::new();
        assert_eq!(engine.registry.len(), 8);
        assert!(
            engine
                .registry
                .lookup(&ConverterKey::new("TServer", "k8s.tars.io/v1beta3", "k8s.tars.io/v1beta1"))
                .is_some()
        );
        assert!(
            engine
                .registry
                .lookup(&ConverterKey::new(
                    "TFrameworkConfig",
                    "k8s.tars.io/v1beta1",
                    "k8s.tars.io/v1beta3"
                ))
                .is_none()
        );
    }

    #[test]
    fn unregistered_pair_is_echoed() {
        let engine = ConversionEngine::new();
        let objects = vec![
            json!({"apiVersion": "k8s.tars.io/v1beta2", "kind": "TConfig", "metadata": {"name": "a"}}),
            json!({"apiVersion": "k8s.tars.io/v1beta2", "kind": "TConfig", "metadata": {"name": "b"}}),
        ];
        let response = engine.convert(&request("k8s.tars.io/v1beta3", objects.clone()));

        assert_eq!(response.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert_eq!(response.result, ConversionResult::success());
        assert_eq!(response.converted_objects, objects);
    }

    #[test]
    fn every_object_is_converted() {
        let engine = ConversionEngine::new();
        let objects = ["a", "b"]
            .into_iter()
            .map(|name| {
                json!({
                    "apiVersion": "k8s.tars.io/v1beta3",
                    "kind": "TFrameworkConfig",
                    "metadata": {"name": name},
                    "imageUpload": {"registry": "docker.io/tars", "secret": "tars-image-secret"}
                })
            })
            .collect();
        let response = engine.convert(&request("k8s.tars.io/v1beta2", objects));

        assert_eq!(response.converted_objects.len(), 2);
        for converted in &response.converted_objects {
            assert_eq!(converted["apiVersion"], "k8s.tars.io/v1beta2");
            assert_eq!(converted["imageRegistry"]["registry"], "docker.io/tars");
        }
    }

    #[test]
    fn empty_request() {
        let response = ConversionEngine::new().convert(&request("k8s.tars.io/v1beta3", vec![]));
        assert!(response.converted_objects.is_empty());
        assert_eq!(response.result.status, "Success");
    }

    #[test]
    fn custom_registry() {
        fn rename(object: &Value) -> Value {
            let mut converted = object.clone();
            set_api_version(&mut converted, "example.io/v2");
            converted
        }

        let mut registry = ConversionRegistry::new();
        registry.register("Widget", "example.io/v1", "example.io/v2", rename);
        let engine = ConversionEngine::with_registry(registry);

        let response = engine.convert(&request(
            "example.io/v2",
            vec![json!({"apiVersion": "example.io/v1", "kind": "Widget"})],
        ));
        assert_eq!(
            response.converted_objects,
            vec![json!({"apiVersion": "example.io/v2", "kind": "Widget"})]
        );
    }

    #[test]
    fn unreadable_stash_is_dropped() {
        let mut object = json!({"metadata": {"annotations": {"tars.io/Conversion.1b21b3": "{not json"}}});
        assert!(unstash(&mut object, "tars.io/Conversion.1b21b3").is_empty());
        assert_eq!(object, json!({"metadata": {"annotations": {}}}));
    }
}
