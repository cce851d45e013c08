use std::collections::HashSet;

use crate::admission_request::AdmissionRequest;
use crate::cache::WatchedKind;
use crate::constants::{MAX_TSERVER_NAME_LEN, NODE_SERVANT_PORT};
use crate::crd::{HasMetadata, TServer};
use crate::environment::AdmissionEnvironment;
use crate::errors::{AdmissionError, Result};

const KIND: &str = "tserver";

pub(super) fn validate_create(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    let tserver: TServer = request.decode_object()?;
    validate_tserver(env, request, &tserver, None)
}

pub(super) fn validate_update(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    let tserver: TServer = request.decode_object()?;
    let old: TServer = request.decode_old_object()?;
    validate_tserver(env, request, &tserver, Some(&old))
}

fn invalid(reason: impl Into<String>) -> AdmissionError {
    AdmissionError::invalid(KIND, reason)
}

fn validate_tserver(
    env: &AdmissionEnvironment,
    request: &AdmissionRequest,
    tserver: &TServer,
    old: Option<&TServer>,
) -> Result<()> {
    let spec = &tserver.spec;

    if let Some(old) = old {
        if spec.app != old.spec.app {
            return Err(AdmissionError::immutable(KIND, ".spec.app"));
        }
        if spec.server != old.spec.server {
            return Err(AdmissionError::immutable(KIND, ".spec.server"));
        }
        if spec.sub_type != old.spec.sub_type {
            return Err(AdmissionError::immutable(KIND, ".spec.subType"));
        }
        if old.spec.tars.is_none() && spec.tars.is_some() {
            return Err(AdmissionError::immutable(KIND, ".spec.tars"));
        }
        if old.spec.normal.is_none() && spec.normal.is_some() {
            return Err(AdmissionError::immutable(KIND, ".spec.normal"));
        }
    }

    let expected_name = format!(
        "{}-{}",
        spec.app.to_lowercase(),
        spec.server.to_lowercase()
    );
    if tserver.name() != expected_name {
        return Err(invalid("unexpected resource name"));
    }
    if tserver.name().len() >= MAX_TSERVER_NAME_LEN {
        return Err(invalid(format!(
            "length of resource name should less then {MAX_TSERVER_NAME_LEN}"
        )));
    }

    let mut port_names = HashSet::new();
    let mut port_values = HashSet::new();

    if let Some(tars) = spec.tars.as_ref() {
        for servant in &tars.servants {
            if servant.port == NODE_SERVANT_PORT {
                return Err(invalid(format!(
                    "servants port value should not equal {NODE_SERVANT_PORT}"
                )));
            }
            if !port_names.insert(servant.name.to_lowercase()) {
                return Err(invalid(format!("duplicate servant name value {}", servant.name)));
            }
            if !port_values.insert(servant.port) {
                return Err(invalid(format!("duplicate port value {}", servant.port)));
            }
        }

        for port in &tars.ports {
            if port.port == NODE_SERVANT_PORT {
                return Err(invalid(format!(
                    "port value should not equal {NODE_SERVANT_PORT}"
                )));
            }
            if !port_names.insert(port.name.to_lowercase()) {
                return Err(invalid(format!("duplicate port name value {}", port.name)));
            }
            if !port_values.insert(port.port) {
                return Err(invalid(format!("duplicate port value {}", port.port)));
            }
        }

        let namespace = request.target_namespace();
        if env
            .cache
            .get(WatchedKind::TTemplate, namespace, &tars.template)?
            .is_none()
        {
            return Err(AdmissionError::not_found("ttemplate", namespace, &tars.template));
        }
    } else if let Some(normal) = spec.normal.as_ref() {
        for port in normal.ports.iter().flatten() {
            if !port_names.insert(port.name.to_lowercase()) {
                return Err(invalid(format!("duplicate port name value {}", port.name)));
            }
            if !port_values.insert(port.port) {
                return Err(invalid(format!("duplicate port value {}", port.port)));
            }
        }
    }

    let mut host_port_refs = HashSet::new();
    let mut host_port_values = HashSet::new();
    for host_port in &spec.k8s.host_ports {
        let name_ref = host_port.name_ref.to_lowercase();
        if !port_names.contains(&name_ref) {
            return Err(invalid(format!("port name {} not exist", host_port.name_ref)));
        }
        if !host_port_refs.insert(name_ref) {
            return Err(invalid(format!("duplicate nameRef value {}", host_port.name_ref)));
        }
        if !host_port_values.insert(host_port.port) {
            return Err(invalid(format!("duplicate port value {}", host_port.port)));
        }
    }

    let mut mount_names = HashSet::new();
    for mount in &spec.k8s.mounts {
        if !mount_names.insert(mount.name.as_str()) {
            return Err(invalid(format!("duplicate .mounts.name value {}", mount.name)));
        }
        let claims_storage = mount.source.t_local_volume.is_some()
            || mount.source.persistent_volume_claim_template.is_some();
        if claims_storage && spec.k8s.daemon_set {
            return Err(invalid(
                "can not use TLocalVolue and PersistentVolumeClaimTemplate when .daemonSet value is true",
            ));
        }
    }

    Ok(())
}
