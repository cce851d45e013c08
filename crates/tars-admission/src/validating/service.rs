use k8s_openapi::api::core::v1::Service;

use super::{authorize_create, modified_outside_tserver, owning_tserver};
use crate::admission_request::AdmissionRequest;
use crate::environment::AdmissionEnvironment;
use crate::errors::Result;

pub(super) fn validate_create_service(
    env: &AdmissionEnvironment,
    request: &AdmissionRequest,
) -> Result<()> {
    authorize_create(env, request, "service")
}

pub(super) fn validate_update_service(
    env: &AdmissionEnvironment,
    request: &AdmissionRequest,
) -> Result<()> {
    if env.controller.authorizes(request.username()) {
        return Ok(());
    }

    let service: Service = request.decode_object()?;
    let name = service.metadata.name.as_deref().unwrap_or_default();
    let tserver = owning_tserver(env, request.target_namespace(), name)?;

    if env.translator.dry_run_sync_service(&tserver, &service) {
        return Err(modified_outside_tserver());
    }
    Ok(())
}
