pub mod api;
mod certs;
pub mod cli;
pub mod config;
pub mod tracing;

use ::tracing::{info, warn};
use anyhow::{anyhow, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tower_http::{
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};

use tars_admission::{
    cache::{InMemoryCache, KubeCache, ResourceCache},
    conversion::ConversionEngine,
    environment::{AdmissionEnvironment, ControllerIdentity, SystemClock},
    mutating::MutationEngine,
    translator::TServerTranslator,
    validating::ValidationEngine,
};

use crate::api::{
    handlers::{conversion_handler, mutating_handler, validating_handler},
    readiness_handler,
    state::ApiServerState,
};
use crate::certs::create_tls_config_and_watch_certificate_changes;
use crate::config::{Config, TlsConfig};

pub struct TarsWebhook {
    state: Arc<ApiServerState>,
    addr: SocketAddr,
    tls_config: Option<TlsConfig>,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl TarsWebhook {
    /// Build the webhook on top of the given cache.
    pub fn new(config: Config, cache: Arc<dyn ResourceCache>) -> Self {
        let environment = AdmissionEnvironment {
            cache,
            translator: Arc::new(TServerTranslator),
            controller: ControllerIdentity::new(config.controller_username),
            clock: Arc::new(SystemClock),
        };

        let state = Arc::new(ApiServerState {
            semaphore: Semaphore::new(config.workers),
            environment: Arc::new(environment),
            mutation: MutationEngine::new(),
            validation: ValidationEngine::new(),
            conversion: ConversionEngine::new(),
        });

        TarsWebhook {
            state,
            addr: config.addr,
            tls_config: config.tls_config,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        }
    }

    /// Connect to the cluster and start watching the Tars resources.
    ///
    /// When the cluster cannot be reached and
    /// `ignore_kubernetes_connection_failure` is set, the webhook starts with
    /// caches that never sync: every decision depending on them is rejected
    /// as not ready.
    pub async fn new_from_config(config: Config) -> Result<Self> {
        let cache: Arc<dyn ResourceCache> = match kube::Client::try_default().await {
            Ok(client) => Arc::new(KubeCache::start(
                client,
                config.watch_namespace.as_deref(),
            )),
            Err(e) if config.ignore_kubernetes_connection_failure => {
                warn!(
                    error = %e,
                    "cannot connect to Kubernetes cluster, starting with empty caches"
                );
                Arc::new(InMemoryCache::new())
            }
            Err(e) => return Err(anyhow!("Cannot connect to Kubernetes cluster: {e}")),
        };

        Ok(Self::new(config, cache))
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/mutating", post(mutating_handler))
            .route("/validating", post(validating_handler))
            .route("/conversion", post(conversion_handler))
            .route("/readiness", get(readiness_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyTimeoutLayer::new(self.read_timeout))
            .layer(TimeoutLayer::new(self.write_timeout))
    }

    pub async fn run(self) -> Result<()> {
        let router = self.router();

        match self.tls_config {
            Some(tls_config) => {
                let rustls_config =
                    create_tls_config_and_watch_certificate_changes(tls_config).await?;
                info!(addr = %self.addr, "started HTTPS server");
                axum_server::bind_rustls(self.addr, rustls_config)
                    .serve(router.into_make_service())
                    .await?;
            }
            None => {
                warn!(addr = %self.addr, "TLS is disabled, started HTTP server");
                axum_server::bind(self.addr)
                    .serve(router.into_make_service())
                    .await?;
            }
        }

        Ok(())
    }
}
