use futures::{StreamExt, TryStreamExt, future::ready};
use kube::{
    ResourceExt,
    api::{Api, ApiResource},
    core::{DynamicObject, GroupVersionKind},
    runtime::{
        WatchStreamExt,
        reflector::{self, ObjectRef, Store, store::Writer},
        watcher,
    },
};
use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::{debug, info, warn};

use super::{LabelSelector, ResourceCache, WatchedKind};
use crate::constants::{LAST_APPLIED_CONFIGURATION_ANNOTATION, TARS_GROUP};

const WATCHED_VERSION: &str = "v1beta3";

struct WatchedStore {
    reader: Store<DynamicObject>,
    synced: Arc<AtomicBool>,
}

/// Keeps an in-memory copy of the watched Tars resources.
///
/// Each kind is listed and then watched by its own reflector running in a
/// background tokio task. The objects are stripped of `managedFields` and of
/// the last applied configuration to reduce memory consumption.
///
/// ## Stale data
///
/// Changes reach the reflectors with some delay, so the cache can lag behind
/// the cluster. A kind becomes usable only once its initial listing has been
/// received; until then every lookup reports the kind as not synced.
pub struct KubeCache {
    stores: BTreeMap<WatchedKind, WatchedStore>,
}

impl KubeCache {
    /// Create the reflectors and start the tokio tasks that keep them
    /// updated. Must be called from within a tokio runtime.
    pub fn start(client: kube::Client, namespace: Option<&str>) -> Self {
        let stores = WatchedKind::ALL
            .into_iter()
            .map(|kind| (kind, watch(client.clone(), namespace, kind)))
            .collect();
        KubeCache { stores }
    }
}

fn api_resource(kind: WatchedKind) -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(TARS_GROUP, WATCHED_VERSION, kind.kind()),
        kind.plural(),
    )
}

/// Key of an object inside the store of `kind`. The dynamic type must match
/// the one the store writer was created with.
fn object_ref(kind: WatchedKind, namespace: &str, name: &str) -> ObjectRef<DynamicObject> {
    let object_ref = ObjectRef::new_with(name, api_resource(kind));
    if namespace.is_empty() {
        object_ref
    } else {
        object_ref.within(namespace)
    }
}

fn watch(client: kube::Client, namespace: Option<&str>, kind: WatchedKind) -> WatchedStore {
    let resource = api_resource(kind);
    let namespace = namespace.map(str::to_owned);

    info!(kind = kind.kind(), ?namespace, "creating new reflector");

    let api = match namespace {
        Some(ref ns) => Api::<DynamicObject>::namespaced_with(client, ns, &resource),
        None => Api::<DynamicObject>::all_with(client, &resource),
    };

    let writer = Writer::new(resource);
    let reader = writer.as_reader();

    let stream = watcher(api, watcher::Config::default())
        .map_ok(|ev| ev.modify(modify_object));
    let rf = reflector::reflector(writer, stream);

    tokio::spawn(async move {
        let infinite_watch = rf.default_backoff().touched_objects().for_each(|obj| {
            match obj {
                Ok(o) => debug!(
                    kind = kind.kind(),
                    ?namespace,
                    object = %o.name_any(),
                    "watcher saw object"
                ),
                Err(e) => warn!(kind = kind.kind(), ?namespace, error = ?e, "watcher error"),
            };
            ready(())
        });
        infinite_watch.await
    });

    let synced = Arc::new(AtomicBool::new(false));
    let ready_reader = reader.clone();
    let ready_flag = synced.clone();
    tokio::spawn(async move {
        match ready_reader.wait_until_ready().await {
            Ok(()) => {
                ready_flag.store(true, Ordering::Release);
                info!(kind = kind.kind(), "reflector synced");
            }
            Err(e) => warn!(kind = kind.kind(), error = ?e, "reflector stopped before syncing"),
        }
    });

    WatchedStore { reader, synced }
}

fn modify_object(obj: &mut DynamicObject) {
    // clear managed fields to reduce memory usage
    obj.managed_fields_mut().clear();
    obj.annotations_mut()
        .remove(LAST_APPLIED_CONFIGURATION_ANNOTATION);
}

impl ResourceCache for KubeCache {
    fn is_synced(&self, kind: WatchedKind) -> bool {
        self.stores
            .get(&kind)
            .is_some_and(|s| s.synced.load(Ordering::Acquire))
    }

    fn lookup(
        &self,
        kind: WatchedKind,
        namespace: &str,
        name: &str,
    ) -> Option<Arc<DynamicObject>> {
        let store = self.stores.get(&kind)?;
        store.reader.get(&object_ref(kind, namespace, name))
    }

    fn select(
        &self,
        kind: WatchedKind,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Vec<Arc<DynamicObject>> {
        let Some(store) = self.stores.get(&kind) else {
            return Vec::new();
        };
        store
            .reader
            .state()
            .into_iter()
            .filter(|o| o.metadata.namespace.as_deref().unwrap_or_default() == namespace)
            .filter(|o| selector.matches(o.metadata.labels.as_ref()))
            .collect()
    }
}
