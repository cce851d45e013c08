//! Typed, read-only views of the `k8s.tars.io/v1beta3` resources.
//!
//! Only the fields the engines inspect are modelled. Everything is
//! defaulted so that partially filled objects still decode; patches are
//! always computed against the raw json document, never re-serialized from
//! these types.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::MASTER_POD_SEQ;

pub trait HasMetadata {
    fn metadata(&self) -> &ObjectMeta;

    fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    fn namespace(&self) -> &str {
        self.metadata().namespace.as_deref().unwrap_or_default()
    }

    fn label(&self, key: &str) -> Option<&str> {
        self.metadata()
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }

    fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata()
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(key))
            .map(String::as_str)
    }
}

macro_rules! has_metadata {
    ($($t:ty),+) => {
        $(impl HasMetadata for $t {
            fn metadata(&self) -> &ObjectMeta {
                &self.metadata
            }
        })+
    };
}

has_metadata!(TServer, TConfig, TTree, TAccount, TImage, TTemplate, TFrameworkConfig);

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TServer {
    pub metadata: ObjectMeta,
    pub spec: TServerSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TServerSpec {
    pub app: String,
    pub server: String,
    pub sub_type: String,
    pub tars: Option<TServerTars>,
    pub normal: Option<TServerNormal>,
    pub k8s: TServerK8S,
    pub release: Option<TServerRelease>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TServerTars {
    pub template: String,
    pub profile: String,
    pub servants: Vec<TServerServant>,
    pub ports: Vec<TServerPort>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TServerServant {
    pub name: String,
    pub port: i32,
    pub is_tars: bool,
    pub is_tcp: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TServerPort {
    pub name: String,
    pub port: i32,
    pub is_tcp: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TServerNormal {
    /// `None` when the field is absent from the object.
    pub ports: Option<Vec<TServerPort>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TServerK8S {
    pub service_account: String,
    #[serde(rename = "hostIPC")]
    pub host_ipc: bool,
    pub host_network: bool,
    pub host_ports: Vec<TK8SHostPort>,
    pub mounts: Vec<TK8SMount>,
    pub daemon_set: bool,
    pub not_stacked: bool,
    pub replicas: i32,
    pub readiness_gates: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TK8SHostPort {
    pub name_ref: String,
    pub port: i32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TK8SMount {
    pub name: String,
    pub source: TK8SMountSource,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TK8SMountSource {
    pub t_local_volume: Option<Value>,
    pub persistent_volume_claim_template: Option<Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TServerRelease {
    pub id: String,
    pub image: String,
    pub secret: String,
    pub time: Option<String>,
    pub node_image: Option<String>,
    pub node_secret: Option<String>,
}

impl TServer {
    pub fn is_tars(&self) -> bool {
        self.spec.tars.is_some()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TConfig {
    pub metadata: ObjectMeta,
    pub app: String,
    pub server: String,
    pub pod_seq: String,
    pub config_name: String,
    pub version: String,
    pub config_content: String,
    pub update_time: Option<String>,
    pub update_person: String,
    pub update_reason: String,
    pub activated: bool,
}

impl TConfig {
    /// A config without podSeq is the master.
    pub fn pod_seq(&self) -> &str {
        if self.pod_seq.is_empty() {
            MASTER_POD_SEQ
        } else {
            &self.pod_seq
        }
    }

    pub fn is_master(&self) -> bool {
        self.pod_seq() == MASTER_POD_SEQ
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TTree {
    pub metadata: ObjectMeta,
    pub businesses: Vec<TTreeBusiness>,
    pub apps: Vec<TTreeApp>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TTreeBusiness {
    pub name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TTreeApp {
    pub name: String,
    pub business_ref: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TAccount {
    pub metadata: ObjectMeta,
    pub spec: TAccountSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TAccountSpec {
    pub username: String,
    pub authentication: TAccountAuthentication,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TAccountAuthentication {
    pub password: Option<String>,
    pub bcrypt_password: Option<String>,
    pub tokens: Option<Vec<Value>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TImage {
    pub metadata: ObjectMeta,
    pub image_type: String,
    pub supported_type: Vec<String>,
    pub releases: Vec<TImageRelease>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TImageRelease {
    pub id: String,
    pub image: String,
    pub create_time: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TTemplate {
    pub metadata: ObjectMeta,
    pub spec: TTemplateSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TTemplateSpec {
    pub content: String,
    pub parent: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TFrameworkConfig {
    pub metadata: ObjectMeta,
    pub node_image: TFrameworkNodeImage,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TFrameworkNodeImage {
    pub image: String,
    pub secret: String,
}
