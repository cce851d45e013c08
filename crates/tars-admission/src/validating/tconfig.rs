use chrono::{DateTime, Duration, Utc};

use crate::admission_request::AdmissionRequest;
use crate::cache::{LabelSelector, WatchedKind};
use crate::constants::{
    MASTER_POD_SEQ, TCONFIG_ACTIVATED_LABEL, TCONFIG_DEACTIVATE_LABEL, TCONFIG_DELETING_LABEL,
    TCONFIG_NAME_LABEL, TCONFIG_POD_SEQ_LABEL, TSERVER_APP_LABEL, TSERVER_NAME_LABEL,
};
use crate::crd::{HasMetadata, TConfig};
use crate::environment::AdmissionEnvironment;
use crate::errors::{AdmissionError, Result};

/// Activated configs cannot be deleted by users right after their creation.
const DELETION_GUARD_SECONDS: i64 = 48;

pub(super) fn validate_create(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    let tconfig: TConfig = request.decode_object()?;

    for label in [TCONFIG_DEACTIVATE_LABEL, TCONFIG_DELETING_LABEL] {
        if tconfig.label(label).is_some() {
            return Err(AdmissionError::Forbidden(format!(
                "can not set label [{label}] when create"
            )));
        }
    }

    if tconfig.server.is_empty() && !tconfig.is_master() {
        return Err(AdmissionError::Forbidden(
            "app level tconfig does not support master/slave".to_owned(),
        ));
    }

    let namespace = request.target_namespace();

    if !tconfig.is_master() {
        let selector = config_selector(&tconfig)
            .equals(TCONFIG_POD_SEQ_LABEL, MASTER_POD_SEQ)
            .equals(TCONFIG_ACTIVATED_LABEL, "true")
            .does_not_exist(TCONFIG_DEACTIVATE_LABEL)
            .does_not_exist(TCONFIG_DELETING_LABEL);
        if env.cache.list(WatchedKind::TConfig, namespace, &selector)?.is_empty() {
            return Err(AdmissionError::Forbidden(
                "no activated master tconfig found".to_owned(),
            ));
        }
    }

    if tconfig.activated {
        check_activation(env, namespace, &tconfig)?;
    }
    Ok(())
}

pub(super) fn validate_update(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    if env.controller.authorizes(request.username()) {
        return Ok(());
    }

    let tconfig: TConfig = request.decode_object()?;
    let old: TConfig = request.decode_old_object()?;

    if old.label(TCONFIG_DELETING_LABEL).is_some() {
        return Err(AdmissionError::Forbidden(
            "can not update deleting tconfig".to_owned(),
        ));
    }

    let immutables: [(&str, &str, bool); 9] = [
        ("tconfig", "/app", tconfig.app == old.app),
        ("tconfig", "/server", tconfig.server == old.server),
        ("tconfig", "/podSeq", tconfig.pod_seq() == old.pod_seq()),
        ("tconfig", "/configName", tconfig.config_name == old.config_name),
        ("tconfig", "/configContent", tconfig.config_content == old.config_content),
        ("tconfig", "/version", tconfig.version == old.version),
        ("TConfig", "/updateTime", tconfig.update_time == old.update_time),
        ("TConfig", "/updatePerson", tconfig.update_person == old.update_person),
        ("TConfig", "/updateReason", tconfig.update_reason == old.update_reason),
    ];
    if let Some((kind, field, _)) = immutables.iter().find(|(_, _, unchanged)| !unchanged) {
        return Err(AdmissionError::immutable(kind, field));
    }

    if old.activated && !tconfig.activated {
        return Err(AdmissionError::Forbidden(
            "only use authorized account can update /activated from true to false".to_owned(),
        ));
    }

    if !old.activated && tconfig.activated {
        check_activation(env, request.target_namespace(), &tconfig)?;
    }
    Ok(())
}

pub(super) fn validate_delete(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    if env.controller.authorizes_or_system(request.username()) {
        return Ok(());
    }

    let old_object = request.old_object()?;
    let tconfig: TConfig = request.decode_old_object()?;

    if !tconfig.activated {
        return Ok(());
    }

    let created_at = old_object
        .pointer("/metadata/creationTimestamp")
        .and_then(|v| v.as_str())
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|t| t.with_timezone(&Utc));
    if let Some(created_at) = created_at {
        if created_at + Duration::seconds(DELETION_GUARD_SECONDS) >= env.clock.now() {
            return Err(AdmissionError::Forbidden(format!(
                "tconfig during deletion guard time({DELETION_GUARD_SECONDS}s)"
            )));
        }
    }

    if tconfig.label(TCONFIG_DEACTIVATE_LABEL).is_some()
        || tconfig.label(TCONFIG_DELETING_LABEL).is_some()
    {
        return Ok(());
    }

    if !tconfig.is_master() {
        return Ok(());
    }

    // a master cannot go away while slaves still derive from it
    let namespace = request.target_namespace();
    let referenced = env
        .cache
        .list(WatchedKind::TConfig, namespace, &config_selector(&tconfig))?
        .iter()
        .filter(|other| other.metadata.name.as_deref() != Some(tconfig.name()))
        .any(|other| {
            other
                .metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(TCONFIG_POD_SEQ_LABEL))
                .is_some_and(|pod_seq| pod_seq != MASTER_POD_SEQ)
        });
    if referenced {
        return Err(AdmissionError::Forbidden(format!(
            "cannot delete tconfig {namespace}/{} because it is reference by anther tconfig",
            tconfig.name()
        )));
    }
    Ok(())
}

fn config_selector(tconfig: &TConfig) -> LabelSelector {
    LabelSelector::new()
        .equals(TSERVER_APP_LABEL, &tconfig.app)
        .equals(TSERVER_NAME_LABEL, &tconfig.server)
        .equals(TCONFIG_NAME_LABEL, &tconfig.config_name)
}

/// At most one other config of the same slot may currently be activated:
/// the controller deactivates it once this one is admitted.
fn check_activation(env: &AdmissionEnvironment, namespace: &str, tconfig: &TConfig) -> Result<()> {
    let selector = config_selector(tconfig)
        .equals(TCONFIG_POD_SEQ_LABEL, tconfig.pod_seq())
        .equals(TCONFIG_ACTIVATED_LABEL, "true");
    let activated = env
        .cache
        .list(WatchedKind::TConfig, namespace, &selector)?
        .iter()
        .filter(|other| other.metadata.name.as_deref() != Some(tconfig.name()))
        .count();

    if activated > 1 {
        return Err(AdmissionError::Forbidden(format!(
            "get unexpected activated tconfigs({namespace}/{}-{}/{}:{}) counts({activated})",
            tconfig.app,
            tconfig.server,
            tconfig.config_name,
            tconfig.pod_seq()
        )));
    }
    Ok(())
}
