use crate::admission_request::AdmissionRequest;
use crate::cache::{LabelSelector, WatchedKind};
use crate::constants::{PARENT_LABEL, TEMPLATE_LABEL};
use crate::crd::{HasMetadata, TTemplate};
use crate::environment::AdmissionEnvironment;
use crate::errors::{AdmissionError, Result};

const KIND: &str = "ttemplate";

pub(super) fn validate_create(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    let ttemplate: TTemplate = request.decode_object()?;
    validate_parent(env, request.target_namespace(), &ttemplate)
}

pub(super) fn validate_update(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    let ttemplate: TTemplate = request.decode_object()?;
    validate_parent(env, request.target_namespace(), &ttemplate)
}

pub(super) fn validate_delete(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    if env.controller.authorizes_or_system(request.username()) {
        return Ok(());
    }

    let ttemplate: TTemplate = request.decode_old_object()?;
    let namespace = request.target_namespace();
    let name = ttemplate.name();

    let tservers = env.cache.list(
        WatchedKind::TServer,
        namespace,
        &LabelSelector::new().equals(TEMPLATE_LABEL, name),
    )?;
    if !tservers.is_empty() {
        return Err(AdmissionError::Forbidden(format!(
            "cannot delete ttemplate {namespace}/{name} because it is reference by some tserver"
        )));
    }

    // root templates name themselves as parent
    let children = env
        .cache
        .list(
            WatchedKind::TTemplate,
            namespace,
            &LabelSelector::new().equals(PARENT_LABEL, name),
        )?
        .into_iter()
        .filter(|child| child.metadata.name.as_deref() != Some(name))
        .count();
    if children != 0 {
        return Err(AdmissionError::Forbidden(format!(
            "cannot delete ttemplate {namespace}/{name} because it is reference by some ttemplate"
        )));
    }
    Ok(())
}

fn validate_parent(env: &AdmissionEnvironment, namespace: &str, ttemplate: &TTemplate) -> Result<()> {
    let parent = &ttemplate.spec.parent;
    if parent.is_empty() {
        return Err(AdmissionError::invalid(
            KIND,
            "value of filed \".spec.parent\" should not empty ",
        ));
    }

    // a root template is its own parent
    if ttemplate.name() == parent {
        return Ok(());
    }

    if env.cache.get(WatchedKind::TTemplate, namespace, parent)?.is_none() {
        return Err(AdmissionError::not_found(KIND, namespace, parent));
    }
    Ok(())
}
