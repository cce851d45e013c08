use json_patch::Patch;
use serde_json::json;

use crate::admission_request::{AdmissionRequest, Operation};
use crate::constants::{
    MASTER_POD_SEQ, TCONFIG_ACTIVATED_LABEL, TCONFIG_NAME_LABEL, TCONFIG_POD_SEQ_LABEL,
    TCONFIG_VERSION_LABEL, TSERVER_APP_LABEL, TSERVER_NAME_LABEL,
};
use crate::crd::{HasMetadata, TConfig};
use crate::environment::AdmissionEnvironment;
use crate::errors::Result;
use crate::patch::PatchBuilder;

const VERSION_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

pub(super) fn mutate_tconfig(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<Patch> {
    let object = request.object()?;
    let tconfig: TConfig = request.decode_object()?;
    let mut patch = PatchBuilder::new(object);

    if tconfig.pod_seq.is_empty() {
        patch.set(&["podSeq"], json!(MASTER_POD_SEQ))?;
    }

    patch.set_label(TSERVER_APP_LABEL, &tconfig.app)?;
    patch.set_label(TSERVER_NAME_LABEL, &tconfig.server)?;
    patch.set_label(TCONFIG_NAME_LABEL, &tconfig.config_name)?;
    patch.set_label(TCONFIG_POD_SEQ_LABEL, tconfig.pod_seq())?;
    patch.set_label(
        TCONFIG_ACTIVATED_LABEL,
        if tconfig.activated { "true" } else { "false" },
    )?;

    let version = if request.operation == Operation::Create {
        let checksum = version_checksum(tconfig.name());
        if is_generated_version(&tconfig.version, &checksum) {
            Some(tconfig.version.clone())
        } else {
            Some(format!(
                "{}-{checksum}",
                env.clock.now().format(VERSION_TIMESTAMP_FORMAT)
            ))
        }
    } else if tconfig.version.is_empty() {
        None
    } else {
        Some(tconfig.version.clone())
    };
    if let Some(version) = version {
        patch.set(&["version"], json!(version))?;
        patch.set_label(TCONFIG_VERSION_LABEL, &version)?;
    }

    if request.operation == Operation::Create
        && tconfig.update_time.as_deref().unwrap_or_default().is_empty()
    {
        patch.set(&["updateTime"], json!(env.now_rfc3339()))?;
    }

    Ok(patch.build())
}

fn version_checksum(name: &str) -> String {
    format!("{:x}", crc32fast::hash(name.as_bytes()))
}

/// A version previously generated for this object: a 14 digits timestamp
/// followed by the checksum of the object name.
fn is_generated_version(version: &str, checksum: &str) -> bool {
    version
        .split_once('-')
        .is_some_and(|(timestamp, suffix)| {
            timestamp.len() == 14
                && timestamp.bytes().all(|b| b.is_ascii_digit())
                && suffix == checksum
        })
}
