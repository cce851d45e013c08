use k8s_openapi::api::apps::v1::{DaemonSet, StatefulSet};

use super::{authorize_create, modified_outside_tserver, owning_tserver};
use crate::admission_request::AdmissionRequest;
use crate::environment::AdmissionEnvironment;
use crate::errors::Result;

pub(super) fn validate_create_statefulset(
    env: &AdmissionEnvironment,
    request: &AdmissionRequest,
) -> Result<()> {
    authorize_create(env, request, "statefulset")
}

pub(super) fn validate_update_statefulset(
    env: &AdmissionEnvironment,
    request: &AdmissionRequest,
) -> Result<()> {
    if env.controller.authorizes(request.username()) {
        return Ok(());
    }

    let statefulset: StatefulSet = request.decode_object()?;
    let name = statefulset.metadata.name.as_deref().unwrap_or_default();
    let tserver = owning_tserver(env, request.target_namespace(), name)?;

    if env.translator.dry_run_sync_statefulset(&tserver, &statefulset) {
        return Err(modified_outside_tserver());
    }
    Ok(())
}

pub(super) fn validate_create_daemonset(
    env: &AdmissionEnvironment,
    request: &AdmissionRequest,
) -> Result<()> {
    authorize_create(env, request, "daemonset")
}

pub(super) fn validate_update_daemonset(
    env: &AdmissionEnvironment,
    request: &AdmissionRequest,
) -> Result<()> {
    if env.controller.authorizes(request.username()) {
        return Ok(());
    }

    let daemonset: DaemonSet = request.decode_object()?;
    let name = daemonset.metadata.name.as_deref().unwrap_or_default();
    let tserver = owning_tserver(env, request.target_namespace(), name)?;

    if env.translator.dry_run_sync_daemonset(&tserver, &daemonset) {
        return Err(modified_outside_tserver());
    }
    Ok(())
}
