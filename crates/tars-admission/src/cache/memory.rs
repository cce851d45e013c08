use kube::core::DynamicObject;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use super::{LabelSelector, ResourceCache, WatchedKind, same_object};

/// A fixed set of objects. Used when the webhook runs without access to the
/// cluster, in which case no kind is ever synced, and by tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCache {
    synced: BTreeSet<WatchedKind>,
    objects: BTreeMap<WatchedKind, Vec<Arc<DynamicObject>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        InMemoryCache::default()
    }

    /// Mark every kind as synced.
    pub fn all_synced(mut self) -> Self {
        self.synced.extend(WatchedKind::ALL);
        self
    }

    pub fn synced(mut self, kind: WatchedKind) -> Self {
        self.synced.insert(kind);
        self
    }

    pub fn with_object(mut self, kind: WatchedKind, object: DynamicObject) -> Self {
        self.objects.entry(kind).or_default().push(Arc::new(object));
        self
    }
}

impl ResourceCache for InMemoryCache {
    fn is_synced(&self, kind: WatchedKind) -> bool {
        self.synced.contains(&kind)
    }

    fn lookup(
        &self,
        kind: WatchedKind,
        namespace: &str,
        name: &str,
    ) -> Option<Arc<DynamicObject>> {
        self.objects
            .get(&kind)?
            .iter()
            .find(|o| same_object(o, namespace, name))
            .cloned()
    }

    fn select(
        &self,
        kind: WatchedKind,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Vec<Arc<DynamicObject>> {
        self.objects
            .get(&kind)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|o| o.metadata.namespace.as_deref().unwrap_or_default() == namespace)
                    .filter(|o| selector.matches(o.metadata.labels.as_ref()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
