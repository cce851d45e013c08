//! Two-level handler tables shared by the admission engines.
//!
//! The first level is keyed by the [`GroupVersion`], the second by the pair
//! `(operation, kind)`. Tables are filled once when an engine is built and
//! are read-only afterwards.

use std::{collections::HashMap, fmt};

use crate::admission_request::{GroupVersionKind, Operation};
use crate::errors::{AdmissionError, Result};

/// API group and version. The core group is stored empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

impl GroupVersion {
    /// Parse `group/version`. Both `core/v1` and a bare `v1` name the core group.
    pub fn parse(group_version: &str) -> Self {
        let (group, version) = group_version.split_once('/').unwrap_or(("", group_version));
        GroupVersion {
            group: if group == "core" { "" } else { group }.to_owned(),
            version: version.to_owned(),
        }
    }
}

impl From<&GroupVersionKind> for GroupVersion {
    fn from(gvk: &GroupVersionKind) -> Self {
        GroupVersion {
            group: gvk.group.clone(),
            version: gvk.version.clone(),
        }
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let group = if self.group.is_empty() { "core" } else { &self.group };
        write!(f, "{}/{}", group, self.version)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HandlerKey {
    pub operation: Operation,
    pub kind: String,
}

pub struct HandlerTable<F> {
    engine: &'static str,
    tables: HashMap<GroupVersion, HashMap<HandlerKey, F>>,
}

impl<F: Copy> HandlerTable<F> {
    pub fn new(engine: &'static str) -> Self {
        HandlerTable {
            engine,
            tables: HashMap::new(),
        }
    }

    pub fn register(&mut self, group_version: &str, operation: Operation, kind: &str, handler: F) {
        self.tables
            .entry(GroupVersion::parse(group_version))
            .or_default()
            .insert(
                HandlerKey {
                    operation,
                    kind: kind.to_owned(),
                },
                handler,
            );
    }

    pub fn lookup(&self, gvk: &GroupVersionKind, operation: Operation) -> Result<F> {
        let group_version = GroupVersion::from(gvk);
        let table = self
            .tables
            .get(&group_version)
            .ok_or_else(|| AdmissionError::UnsupportedGroupVersion {
                engine: self.engine,
                group_version: group_version.to_string(),
                kind: gvk.kind.clone(),
            })?;

        let key = HandlerKey {
            operation,
            kind: gvk.kind.clone(),
        };
        table
            .get(&key)
            .copied()
            .ok_or_else(|| AdmissionError::Unsupported {
                engine: self.engine,
                operation: operation.to_string(),
                version: gvk.version.clone(),
                kind: gvk.kind.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
