//! Read-only views over the resources the validation and mutation rules
//! consult: TServer, TTemplate, TTree, TConfig and TFrameworkConfig.
//!
//! The caches are eventually consistent. Lookups done before the initial
//! listing of a kind has completed fail with
//! [`AdmissionError::CacheNotSynced`], which callers turn into a "not ready"
//! rejection instead of a policy decision.

use kube::core::DynamicObject;
use serde::de::DeserializeOwned;
use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::admission_request::decode;
use crate::constants::{
    TCONFIG_KIND, TFRAMEWORK_CONFIG_KIND, TSERVER_KIND, TTEMPLATE_KIND, TTREE_KIND,
};
use crate::errors::{AdmissionError, Result};

pub mod memory;
pub mod reflector;

pub use memory::InMemoryCache;
pub use reflector::KubeCache;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WatchedKind {
    TServer,
    TTemplate,
    TTree,
    TConfig,
    TFrameworkConfig,
}

impl WatchedKind {
    pub const ALL: [WatchedKind; 5] = [
        WatchedKind::TServer,
        WatchedKind::TTemplate,
        WatchedKind::TTree,
        WatchedKind::TConfig,
        WatchedKind::TFrameworkConfig,
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            WatchedKind::TServer => TSERVER_KIND,
            WatchedKind::TTemplate => TTEMPLATE_KIND,
            WatchedKind::TTree => TTREE_KIND,
            WatchedKind::TConfig => TCONFIG_KIND,
            WatchedKind::TFrameworkConfig => TFRAMEWORK_CONFIG_KIND,
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            WatchedKind::TServer => "tservers",
            WatchedKind::TTemplate => "ttemplates",
            WatchedKind::TTree => "ttrees",
            WatchedKind::TConfig => "tconfigs",
            WatchedKind::TFrameworkConfig => "tframeworkconfigs",
        }
    }
}

impl fmt::Display for WatchedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Requirement {
    Equals(String, String),
    DoesNotExist(String),
}

/// A conjunction of label requirements, the subset of the Kubernetes label
/// selector syntax the rules need.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn new() -> Self {
        LabelSelector::default()
    }

    pub fn equals(mut self, key: &str, value: &str) -> Self {
        self.requirements
            .push(Requirement::Equals(key.to_owned(), value.to_owned()));
        self
    }

    pub fn does_not_exist(mut self, key: &str) -> Self {
        self.requirements
            .push(Requirement::DoesNotExist(key.to_owned()));
        self
    }

    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        self.requirements.iter().all(|requirement| match requirement {
            Requirement::Equals(key, value) => {
                labels.and_then(|l| l.get(key)) == Some(value)
            }
            Requirement::DoesNotExist(key) => !labels.is_some_and(|l| l.contains_key(key)),
        })
    }
}

pub trait ResourceCache: Send + Sync {
    /// Whether the initial listing of `kind` has completed.
    fn is_synced(&self, kind: WatchedKind) -> bool;

    /// Find an object by namespace and name, regardless of the sync state.
    fn lookup(&self, kind: WatchedKind, namespace: &str, name: &str)
    -> Option<Arc<DynamicObject>>;

    /// All the objects of `namespace` matching `selector`, regardless of the
    /// sync state.
    fn select(
        &self,
        kind: WatchedKind,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Vec<Arc<DynamicObject>>;

    fn get(
        &self,
        kind: WatchedKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Arc<DynamicObject>>> {
        self.ensure_synced(kind)?;
        Ok(self.lookup(kind, namespace, name))
    }

    fn list(
        &self,
        kind: WatchedKind,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Arc<DynamicObject>>> {
        self.ensure_synced(kind)?;
        Ok(self.select(kind, namespace, selector))
    }

    fn ensure_synced(&self, kind: WatchedKind) -> Result<()> {
        if self.is_synced(kind) {
            Ok(())
        } else {
            Err(AdmissionError::CacheNotSynced(kind.kind().to_owned()))
        }
    }
}

/// Decode a cached object into one of the typed views.
pub fn typed<T: DeserializeOwned>(kind: WatchedKind, object: &DynamicObject) -> Result<T> {
    let value = serde_json::to_value(object).map_err(|source| AdmissionError::Decode {
        kind: kind.kind().to_owned(),
        source,
    })?;
    decode(kind.kind(), &value)
}

pub(crate) fn same_object(object: &DynamicObject, namespace: &str, name: &str) -> bool {
    object.metadata.name.as_deref() == Some(name)
        && object.metadata.namespace.as_deref().unwrap_or_default() == namespace
}
