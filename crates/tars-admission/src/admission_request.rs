use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::errors::{AdmissionError, Result};
use crate::registry::GroupVersion;

/// This models the admission/v1/AdmissionRequest object of Kubernetes,
/// limited to the fields the engines look at.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    pub uid: String,
    pub kind: GroupVersionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_kind: Option<GroupVersionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub operation: Operation,
    #[serde(default)]
    pub user_info: k8s_openapi::api::authentication::v1::UserInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    /// `group/version`, with the empty core group rendered as `core`.
    pub fn group_version(&self) -> String {
        GroupVersion::from(self).to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Connect,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AdmissionRequest {
    pub fn username(&self) -> &str {
        self.user_info.username.as_deref().unwrap_or_default()
    }

    /// Namespace the request targets, empty for cluster scoped resources.
    pub fn target_namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }

    pub fn object(&self) -> Result<&Value> {
        self.object
            .as_ref()
            .filter(|v| !v.is_null())
            .ok_or(AdmissionError::MissingObject("object"))
    }

    pub fn old_object(&self) -> Result<&Value> {
        self.old_object
            .as_ref()
            .filter(|v| !v.is_null())
            .ok_or(AdmissionError::MissingObject("oldObject"))
    }

    /// Decode the incoming object into one of the typed views.
    pub fn decode_object<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        decode(&self.kind.kind, self.object()?)
    }

    pub fn decode_old_object<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        decode(&self.kind.kind, self.old_object()?)
    }
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(kind: &str, value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|source| AdmissionError::Decode {
        kind: kind.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_admission_request() {
        let request: AdmissionRequest = serde_json::from_value(json!({
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "kind": {"group": "k8s.tars.io", "version": "v1beta3", "kind": "TServer"},
            "name": "test-testserver",
            "namespace": "tars",
            "operation": "UPDATE",
            "userInfo": {"username": "alice"},
            "object": {"metadata": {"name": "test-testserver"}},
            "oldObject": null
        }))
        .unwrap();

        assert_eq!(request.operation, Operation::Update);
        assert_eq!(request.username(), "alice");
        assert_eq!(request.kind.group_version(), "k8s.tars.io/v1beta3");
        assert!(request.object().is_ok());
        assert!(matches!(
            request.old_object(),
            Err(AdmissionError::MissingObject("oldObject"))
        ));
    }

    #[test]
    fn core_group_version() {
        let gvk = GroupVersionKind {
            group: String::new(),
            version: "v1".to_owned(),
            kind: "Service".to_owned(),
        };
        assert_eq!(gvk.group_version(), "core/v1");
    }
}
