use axum::Router;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tars_admission::cache::{InMemoryCache, WatchedKind};
use tars_webhook::{config::Config, TarsWebhook};

pub(crate) const CONTROLLER: &str = "system:serviceaccount:tars-system:tars-controller";

pub(crate) fn default_test_config() -> Config {
    Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
        tls_config: None,
        controller_username: CONTROLLER.to_owned(),
        watch_namespace: None,
        ignore_kubernetes_connection_failure: true,
        workers: 2,
        read_timeout: Duration::from_secs(5),
        write_timeout: Duration::from_secs(12),
        log_level: "info".to_owned(),
        log_fmt: "json".to_owned(),
        log_no_color: false,
    }
}

/// A synced cache holding the `tars.cpp` template.
pub(crate) fn default_cache() -> InMemoryCache {
    let template = serde_json::from_value(json!({
        "apiVersion": "k8s.tars.io/v1beta3",
        "kind": "TTemplate",
        "metadata": {"name": "tars.cpp", "namespace": "tars"},
        "spec": {"content": "<tars>\n</tars>", "parent": "tars.default"}
    }))
    .unwrap();

    InMemoryCache::new()
        .all_synced()
        .with_object(WatchedKind::TTemplate, template)
}

pub(crate) fn app(cache: InMemoryCache) -> Router {
    TarsWebhook::new(default_test_config(), Arc::new(cache)).router()
}
