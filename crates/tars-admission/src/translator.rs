//! Prediction of the workload objects a TServer converges into.
//!
//! The reconciliation controller owns the actual construction of these
//! objects. Admission only needs to know whether a candidate object is what
//! the controller would produce right now.

use k8s_openapi::{
    api::{
        apps::v1::{DaemonSet, StatefulSet},
        core::v1::{PodTemplateSpec, Service},
    },
    apimachinery::pkg::util::intstr::IntOrString,
};
use std::collections::BTreeMap;

use crate::constants::{
    NODE_INIT_CONTAINER_NAME, SERVICE_IMAGE_PLACEHOLDER, TSERVER_APP_LABEL, TSERVER_ID_LABEL,
    TSERVER_NAME_LABEL,
};
use crate::crd::{HasMetadata, TServer, TServerPort};

/// The "dry-run sync" capability. Each method returns `true` when syncing
/// the object from the TServer would change it.
pub trait Translator: Send + Sync {
    fn dry_run_sync_statefulset(&self, tserver: &TServer, statefulset: &StatefulSet) -> bool;

    fn dry_run_sync_daemonset(&self, tserver: &TServer, daemonset: &DaemonSet) -> bool;

    fn dry_run_sync_service(&self, tserver: &TServer, service: &Service) -> bool;
}

/// Compares the fields the controller manages on the workload objects.
#[derive(Clone, Copy, Debug, Default)]
pub struct TServerTranslator;

impl Translator for TServerTranslator {
    fn dry_run_sync_statefulset(&self, tserver: &TServer, statefulset: &StatefulSet) -> bool {
        let Some(spec) = statefulset.spec.as_ref() else {
            return true;
        };
        let in_sync = spec.replicas.unwrap_or(1) == tserver.spec.k8s.replicas
            && carries_identity(statefulset.metadata.labels.as_ref(), tserver)
            && carries_identity(spec.selector.match_labels.as_ref(), tserver)
            && equal_pod_template(tserver, &spec.template);
        !in_sync
    }

    fn dry_run_sync_daemonset(&self, tserver: &TServer, daemonset: &DaemonSet) -> bool {
        let Some(spec) = daemonset.spec.as_ref() else {
            return true;
        };
        let in_sync = carries_identity(daemonset.metadata.labels.as_ref(), tserver)
            && carries_identity(spec.selector.match_labels.as_ref(), tserver)
            && equal_pod_template(tserver, &spec.template);
        !in_sync
    }

    fn dry_run_sync_service(&self, tserver: &TServer, service: &Service) -> bool {
        let Some(spec) = service.spec.as_ref() else {
            return true;
        };
        let actual: Vec<ExpectedPort> = spec
            .ports
            .iter()
            .flatten()
            .map(|p| ExpectedPort {
                name: p.name.clone().unwrap_or_default(),
                protocol: p.protocol.clone().unwrap_or_else(|| "TCP".to_owned()),
                port: p.port,
                target_port: match &p.target_port {
                    Some(IntOrString::Int(port)) => *port,
                    Some(IntOrString::String(_)) => -1,
                    None => p.port,
                },
            })
            .collect();

        let in_sync = spec.cluster_ip.as_deref() == Some("None")
            && carries_identity(service.metadata.labels.as_ref(), tserver)
            && carries_identity(spec.selector.as_ref(), tserver)
            && actual == expected_service_ports(tserver);
        !in_sync
    }
}

fn carries_identity(labels: Option<&BTreeMap<String, String>>, tserver: &TServer) -> bool {
    let Some(labels) = labels else {
        return false;
    };
    labels.get(TSERVER_APP_LABEL) == Some(&tserver.spec.app)
        && labels.get(TSERVER_NAME_LABEL) == Some(&tserver.spec.server)
}

fn equal_pod_template(tserver: &TServer, template: &PodTemplateSpec) -> bool {
    let labels = template.metadata.as_ref().and_then(|m| m.labels.as_ref());
    if !carries_identity(labels, tserver) {
        return false;
    }
    let release = tserver.spec.release.as_ref();
    if labels.and_then(|l| l.get(TSERVER_ID_LABEL)) != release.map(|r| &r.id) {
        return false;
    }

    let Some(pod) = template.spec.as_ref() else {
        return false;
    };
    let k8s = &tserver.spec.k8s;
    if pod.host_ipc.unwrap_or_default() != k8s.host_ipc
        || pod.host_network.unwrap_or_default() != k8s.host_network
        || pod.service_account_name.as_deref().unwrap_or_default() != k8s.service_account
    {
        return false;
    }

    let init_container = pod
        .init_containers
        .iter()
        .flatten()
        .find(|c| c.name == NODE_INIT_CONTAINER_NAME);
    match (tserver.is_tars(), init_container) {
        (false, None) => {}
        (true, Some(container)) => {
            let expected = release
                .and_then(|r| r.node_image.as_deref())
                .unwrap_or(SERVICE_IMAGE_PLACEHOLDER);
            if container.image.as_deref() != Some(expected) {
                return false;
            }
        }
        _ => return false,
    }

    let expected_image = release
        .map(|r| r.image.as_str())
        .unwrap_or(SERVICE_IMAGE_PLACEHOLDER);
    pod.containers
        .iter()
        .find(|c| c.name == tserver.name())
        .is_some_and(|c| c.image.as_deref() == Some(expected_image))
}

#[derive(Debug, PartialEq, Eq)]
struct ExpectedPort {
    name: String,
    protocol: String,
    port: i32,
    target_port: i32,
}

impl ExpectedPort {
    fn new(name: &str, is_tcp: bool, port: i32) -> Self {
        ExpectedPort {
            name: name.to_lowercase(),
            protocol: if is_tcp { "TCP" } else { "UDP" }.to_owned(),
            port,
            target_port: port,
        }
    }
}

fn expected_service_ports(tserver: &TServer) -> Vec<ExpectedPort> {
    let from_ports =
        |ports: &[TServerPort]| -> Vec<ExpectedPort> {
            ports
                .iter()
                .map(|p| ExpectedPort::new(&p.name, p.is_tcp, p.port))
                .collect()
        };

    let mut ports = Vec::new();
    if let Some(tars) = tserver.spec.tars.as_ref() {
        ports.extend(
            tars.servants
                .iter()
                .map(|s| ExpectedPort::new(&s.name, s.is_tcp, s.port)),
        );
        ports.extend(from_ports(&tars.ports));
    }
    if let Some(normal) = tserver.spec.normal.as_ref() {
        ports.extend(from_ports(normal.ports.as_deref().unwrap_or_default()));
    }
    ports
}
