use chrono::{TimeZone, Utc};
use kube::core::DynamicObject;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::admission_request::AdmissionRequest;
use crate::cache::{InMemoryCache, WatchedKind};
use crate::constants::DEFAULT_CONTROLLER_SERVICE_ACCOUNT;
use crate::environment::{AdmissionEnvironment, ControllerIdentity, FixedClock};
use crate::translator::TServerTranslator;

pub(crate) const CONTROLLER: &str = DEFAULT_CONTROLLER_SERVICE_ACCOUNT;
pub(crate) const NAMESPACE: &str = "tars";

/// 2023-04-05T06:07:08Z
pub(crate) fn fixed_clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2023, 4, 5, 6, 7, 8).unwrap())
}

pub(crate) fn environment(cache: InMemoryCache) -> AdmissionEnvironment {
    AdmissionEnvironment {
        cache: Arc::new(cache),
        translator: Arc::new(TServerTranslator),
        controller: ControllerIdentity::new(CONTROLLER),
        clock: Arc::new(fixed_clock()),
    }
}

pub(crate) fn synced_environment() -> AdmissionEnvironment {
    environment(InMemoryCache::new().all_synced())
}

pub(crate) fn cached(kind: WatchedKind, value: Value) -> DynamicObject {
    let mut value = value;
    if value.pointer("/metadata/namespace").is_none() {
        value["metadata"]["namespace"] = json!(NAMESPACE);
    }
    value["apiVersion"] = json!("k8s.tars.io/v1beta3");
    value["kind"] = json!(kind.kind());
    serde_json::from_value(value).unwrap()
}

/// An AdmissionRequest for a `k8s.tars.io/v1beta3` resource.
pub(crate) fn request(
    kind: &str,
    operation: &str,
    username: &str,
    object: Option<Value>,
    old_object: Option<Value>,
) -> AdmissionRequest {
    request_for("k8s.tars.io", "v1beta3", kind, operation, username, object, old_object)
}

pub(crate) fn request_for(
    group: &str,
    version: &str,
    kind: &str,
    operation: &str,
    username: &str,
    object: Option<Value>,
    old_object: Option<Value>,
) -> AdmissionRequest {
    let name = object
        .as_ref()
        .or(old_object.as_ref())
        .and_then(|o| o.pointer("/metadata/name"))
        .cloned()
        .unwrap_or(Value::Null);
    serde_json::from_value(json!({
        "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
        "kind": {"group": group, "version": version, "kind": kind},
        "name": name,
        "namespace": NAMESPACE,
        "operation": operation,
        "userInfo": {"username": username},
        "object": object,
        "oldObject": old_object
    }))
    .unwrap()
}

/// Apply a patch to a copy of `object`.
pub(crate) fn patched(object: &Value, patch: &json_patch::Patch) -> Value {
    let mut document = object.clone();
    json_patch::patch(&mut document, patch).unwrap();
    document
}
