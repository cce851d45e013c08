use serde_json::{Map, Value, json};

use super::{child_object, set_api_version, stash, unstash};
use crate::constants::{
    CONVERSION_ANNOTATION_1B1_1B2, CONVERSION_ANNOTATION_1B1_1B3, CONVERSION_ANNOTATION_1B2_1B3,
    DEFAULT_IMAGE_PULL_POLICY, DEFAULT_LAUNCHER_TYPE, TARS_GROUP_VERSION_V1BETA1,
    TARS_GROUP_VERSION_V1BETA2, TARS_GROUP_VERSION_V1BETA3,
};

const NODE_RELEASE_FIELDS: [&str; 2] = ["nodeImage", "nodeSecret"];

/// What the older version of a pair cannot hold.
struct Difference {
    annotation: &'static str,
    /// `spec.k8s` fields missing from the older version.
    k8s_fields: &'static [&'static str],
    /// The older release carries no node image.
    node_release: bool,
    /// The older version has a single `readinessGate` instead of a list.
    single_gate: bool,
}

const V1BETA1_V1BETA2: Difference = Difference {
    annotation: CONVERSION_ANNOTATION_1B1_1B2,
    k8s_fields: &["updateStrategy", "imagePullPolicy", "launcherType"],
    node_release: true,
    single_gate: false,
};

const V1BETA1_V1BETA3: Difference = Difference {
    annotation: CONVERSION_ANNOTATION_1B1_1B3,
    k8s_fields: &[
        "updateStrategy",
        "imagePullPolicy",
        "launcherType",
        "command",
        "args",
    ],
    node_release: true,
    single_gate: true,
};

const V1BETA2_V1BETA3: Difference = Difference {
    annotation: CONVERSION_ANNOTATION_1B2_1B3,
    k8s_fields: &["command", "args"],
    node_release: false,
    single_gate: true,
};

pub(super) fn v1beta1_to_v1beta2(object: &Value) -> Value {
    upgrade(object, TARS_GROUP_VERSION_V1BETA2, &V1BETA1_V1BETA2)
}

pub(super) fn v1beta2_to_v1beta1(object: &Value) -> Value {
    downgrade(object, TARS_GROUP_VERSION_V1BETA1, &V1BETA1_V1BETA2)
}

pub(super) fn v1beta1_to_v1beta3(object: &Value) -> Value {
    upgrade(object, TARS_GROUP_VERSION_V1BETA3, &V1BETA1_V1BETA3)
}

pub(super) fn v1beta3_to_v1beta1(object: &Value) -> Value {
    downgrade(object, TARS_GROUP_VERSION_V1BETA1, &V1BETA1_V1BETA3)
}

pub(super) fn v1beta2_to_v1beta3(object: &Value) -> Value {
    upgrade(object, TARS_GROUP_VERSION_V1BETA3, &V1BETA2_V1BETA3)
}

pub(super) fn v1beta3_to_v1beta2(object: &Value) -> Value {
    downgrade(object, TARS_GROUP_VERSION_V1BETA2, &V1BETA2_V1BETA3)
}

/// Value of a `spec.k8s` field when converting up without a stash.
fn k8s_default(field: &str) -> Value {
    match field {
        "updateStrategy" => json!({"type": "RollingUpdate", "rollingUpdate": {"partition": 0}}),
        "imagePullPolicy" => json!(DEFAULT_IMAGE_PULL_POLICY),
        "launcherType" => json!(DEFAULT_LAUNCHER_TYPE),
        _ => json!([]),
    }
}

fn downgrade(object: &Value, api_version: &str, difference: &Difference) -> Value {
    let mut converted = object.clone();
    let mut append = Map::new();

    if let Some(k8s) = converted
        .pointer_mut("/spec/k8s")
        .and_then(Value::as_object_mut)
    {
        for field in difference.k8s_fields {
            if let Some(value) = k8s.remove(*field) {
                append.insert((*field).to_owned(), value);
            }
        }

        if difference.single_gate {
            let mut gates = match k8s.remove("readinessGates") {
                Some(Value::Array(gates)) => gates.into_iter(),
                _ => Vec::new().into_iter(),
            };
            if let Some(first) = gates.next() {
                k8s.insert("readinessGate".to_owned(), first);
            }
            let others: Vec<Value> = gates.collect();
            if !others.is_empty() {
                append.insert("readinessGates".to_owned(), Value::Array(others));
            }
        }
    }

    if difference.node_release {
        if let Some(release) = converted
            .pointer_mut("/spec/release")
            .and_then(Value::as_object_mut)
        {
            for field in NODE_RELEASE_FIELDS {
                if let Some(value) = release.remove(field) {
                    append.insert(field.to_owned(), value);
                }
            }
        }
    }

    stash(&mut converted, difference.annotation, append);
    set_api_version(&mut converted, api_version);
    converted
}

fn upgrade(object: &Value, api_version: &str, difference: &Difference) -> Value {
    let mut converted = object.clone();
    let append = unstash(&mut converted, difference.annotation);

    let k8s = converted
        .as_object_mut()
        .and_then(|object| child_object(object, "spec"))
        .and_then(|spec| child_object(spec, "k8s"));
    if let Some(k8s) = k8s {
        for field in difference.k8s_fields {
            let value = append
                .get(*field)
                .filter(|value| !value.is_null())
                .cloned()
                .unwrap_or_else(|| k8s_default(field));
            k8s.insert((*field).to_owned(), value);
        }

        if difference.single_gate {
            let mut gates: Vec<Value> = k8s
                .remove("readinessGate")
                .filter(|gate| gate.as_str().is_some_and(|gate| !gate.is_empty()))
                .into_iter()
                .collect();
            if let Some(Value::Array(others)) = append.get("readinessGates") {
                gates.extend(others.iter().cloned());
            }
            k8s.insert("readinessGates".to_owned(), Value::Array(gates));
        }
    }

    // node fields only make sense on a released server
    if difference.node_release {
        if let Some(release) = converted
            .pointer_mut("/spec/release")
            .and_then(Value::as_object_mut)
        {
            for field in NODE_RELEASE_FIELDS {
                if let Some(value) = append.get(field).filter(|value| !value.is_null()) {
                    release.insert(field.to_owned(), value.clone());
                }
            }
        }
    }

    set_api_version(&mut converted, api_version);
    converted
}
