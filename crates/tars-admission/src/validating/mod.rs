//! Admission decisions for the Tars custom resources and for the workload
//! objects the controller derives from them.

use tracing::debug;

use crate::admission_request::{AdmissionRequest, Operation};
use crate::admission_response::AdmissionResponse;
use crate::cache::{WatchedKind, typed};
use crate::constants::{
    DAEMONSET_KIND, SERVICE_KIND, STATEFULSET_KIND, TACCOUNT_KIND, TARS_GROUP_VERSION_V1BETA3,
    TCONFIG_KIND, TSERVER_KIND, TTEMPLATE_KIND, TTREE_KIND,
};
use crate::crd::TServer;
use crate::environment::AdmissionEnvironment;
use crate::errors::{AdmissionError, Result};
use crate::registry::HandlerTable;

mod apps;
mod service;
mod taccount;
mod tconfig;
mod tserver;
mod ttemplate;
mod ttree;

pub type ValidateFn = fn(&AdmissionEnvironment, &AdmissionRequest) -> Result<()>;

const APPS_V1: &str = "apps/v1";
const CORE_V1: &str = "core/v1";

pub struct ValidationEngine {
    handlers: HandlerTable<ValidateFn>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        ValidationEngine::new()
    }
}

impl ValidationEngine {
    pub fn new() -> Self {
        let mut handlers: HandlerTable<ValidateFn> = HandlerTable::new("validating");

        let registrations: [(&str, &str, [ValidateFn; 3]); 8] = [
            (
                TARS_GROUP_VERSION_V1BETA3,
                TSERVER_KIND,
                [tserver::validate_create, tserver::validate_update, allow],
            ),
            (
                TARS_GROUP_VERSION_V1BETA3,
                TCONFIG_KIND,
                [tconfig::validate_create, tconfig::validate_update, tconfig::validate_delete],
            ),
            (
                TARS_GROUP_VERSION_V1BETA3,
                TTREE_KIND,
                [ttree::validate_create, ttree::validate_update, ttree::validate_delete],
            ),
            (
                TARS_GROUP_VERSION_V1BETA3,
                TTEMPLATE_KIND,
                [ttemplate::validate_create, ttemplate::validate_update, ttemplate::validate_delete],
            ),
            (
                TARS_GROUP_VERSION_V1BETA3,
                TACCOUNT_KIND,
                [taccount::validate_create, taccount::validate_update, allow],
            ),
            (
                APPS_V1,
                STATEFULSET_KIND,
                [apps::validate_create_statefulset, apps::validate_update_statefulset, allow],
            ),
            (
                APPS_V1,
                DAEMONSET_KIND,
                [apps::validate_create_daemonset, apps::validate_update_daemonset, allow],
            ),
            (
                CORE_V1,
                SERVICE_KIND,
                [service::validate_create_service, service::validate_update_service, allow],
            ),
        ];

        for (group_version, kind, [create, update, delete]) in registrations {
            handlers.register(group_version, Operation::Create, kind, create);
            handlers.register(group_version, Operation::Update, kind, update);
            handlers.register(group_version, Operation::Delete, kind, delete);
        }

        ValidationEngine { handlers }
    }

    pub fn validate(
        &self,
        env: &AdmissionEnvironment,
        request: &AdmissionRequest,
    ) -> AdmissionResponse {
        let result = self
            .handlers
            .lookup(&request.kind, request.operation)
            .and_then(|handler| handler(env, request));

        match result {
            Ok(()) => AdmissionResponse::allow(request.uid.clone()),
            Err(error) => {
                debug!(error = %error, "request rejected");
                AdmissionResponse::from_error(request.uid.clone(), &error)
            }
        }
    }
}

fn allow(_env: &AdmissionEnvironment, _request: &AdmissionRequest) -> Result<()> {
    Ok(())
}

/// Workload objects may only be created by the controller.
fn authorize_create(env: &AdmissionEnvironment, request: &AdmissionRequest, kind: &str) -> Result<()> {
    if env.controller.authorizes(request.username()) {
        return Ok(());
    }
    Err(AdmissionError::Forbidden(format!(
        "only use authorized account can create {kind}"
    )))
}

/// The TServer owning the workload object `namespace/name`.
fn owning_tserver(env: &AdmissionEnvironment, namespace: &str, name: &str) -> Result<TServer> {
    let object = env
        .cache
        .get(WatchedKind::TServer, namespace, name)?
        .ok_or_else(|| AdmissionError::ResourceGet {
            kind: "tserver".to_owned(),
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            reason: "not found".to_owned(),
        })?;
    typed(WatchedKind::TServer, &object)
}

fn modified_outside_tserver() -> AdmissionError {
    AdmissionError::Forbidden("resource should be modified through tserver".to_owned())
}
