use itertools::Itertools;
use json_patch::Patch;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

use crate::admission_request::AdmissionRequest;
use crate::cache::{WatchedKind, typed};
use crate::constants::{
    FIXED_TFRAMEWORK_CONFIG_RESOURCE_NAME, REPLICAS_ANNOTATION_PATTERN, TEMPLATE_LABEL,
    TMAX_REPLICAS_ANNOTATION, TMIN_REPLICAS_ANNOTATION, TPOD_READINESS_GATE, TSERVER_APP_LABEL,
    TSERVER_ID_LABEL, TSERVER_NAME_LABEL, TSERVER_SUBTYPE_LABEL,
};
use crate::crd::{HasMetadata, TFrameworkConfig, TServer};
use crate::environment::AdmissionEnvironment;
use crate::errors::{AdmissionError, Result};
use crate::patch::PatchBuilder;

lazy_static! {
    static ref REPLICAS_ANNOTATION: Regex = Regex::new(REPLICAS_ANNOTATION_PATTERN).unwrap();
}

pub(super) fn mutate_tserver(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<Patch> {
    let object = request.object()?;
    let tserver: TServer = request.decode_object()?;
    let spec = &tserver.spec;
    let mut patch = PatchBuilder::new(object);

    patch.set_label(TSERVER_APP_LABEL, &spec.app)?;
    patch.set_label(TSERVER_NAME_LABEL, &spec.server)?;
    patch.set_label(TSERVER_SUBTYPE_LABEL, &spec.sub_type)?;

    let gates = &spec.k8s.readiness_gates;
    if let Some(tars) = spec.tars.as_ref() {
        patch.set_label(TEMPLATE_LABEL, &tars.template)?;

        let normalized: Vec<&str> = std::iter::once(TPOD_READINESS_GATE)
            .chain(gates.iter().map(String::as_str))
            .unique()
            .collect();
        patch.ensure_object(&["spec", "k8s"])?;
        patch.set(&["spec", "k8s", "readinessGates"], json!(normalized))?;
    }

    if let Some(normal) = spec.normal.as_ref() {
        patch.remove_label(TEMPLATE_LABEL)?;

        if !gates.is_empty() {
            let unique: Vec<&String> = gates.iter().unique().collect();
            patch.set(&["spec", "k8s", "readinessGates"], json!(unique))?;
        }

        if normal.ports.is_none() {
            patch.set(&["spec", "normal", "ports"], json!([]))?;
        }
    }

    if !spec.k8s.host_ports.is_empty() || spec.k8s.host_ipc {
        patch.ensure_object(&["spec", "k8s"])?;
        patch.set(&["spec", "k8s", "notStacked"], json!(true))?;
    }

    let (min_replicas, max_replicas) = replicas_bounds(&tserver)?;

    let Some(release) = spec.release.as_ref() else {
        patch.ensure_object(&["spec", "k8s"])?;
        patch.set(&["spec", "k8s", "replicas"], json!(0))?;
        return Ok(patch.build());
    };

    let replicas = spec.k8s.replicas.max(min_replicas).min(max_replicas);
    patch.ensure_object(&["spec", "k8s"])?;
    patch.set(&["spec", "k8s", "replicas"], json!(replicas))?;

    if release.time.as_deref().unwrap_or_default().is_empty() {
        patch.set(&["spec", "release", "time"], json!(env.now_rfc3339()))?;
    }

    patch.set_label(TSERVER_ID_LABEL, &release.id)?;

    if spec.tars.is_some() && release.node_image.as_deref().unwrap_or_default().is_empty() {
        let namespace = request
            .namespace
            .as_deref()
            .unwrap_or_else(|| tserver.namespace());
        let (image, secret) = default_node_image(env, namespace)?;
        patch.set(&["spec", "release", "nodeImage"], json!(image))?;
        patch.set(&["spec", "release", "nodeSecret"], json!(secret))?;
    }

    if spec.normal.is_some() {
        patch.remove(&["spec", "release", "nodeImage"])?;
        patch.remove(&["spec", "release", "nodeSecret"])?;
    }

    Ok(patch.build())
}

/// Replica bounds declared through annotations. Missing annotations leave
/// the corresponding side unbounded.
fn replicas_bounds(tserver: &TServer) -> Result<(i32, i32)> {
    let parse = |key: &str, default: i32| -> Result<i32> {
        match tserver.annotation(key) {
            None => Ok(default),
            Some(value) if REPLICAS_ANNOTATION.is_match(value) => value
                .parse()
                .map_err(|_| AdmissionError::invalid("tserver", "unexpected annotation format")),
            Some(_) => Err(AdmissionError::invalid(
                "tserver",
                "unexpected annotation format",
            )),
        }
    };

    let max = parse(TMAX_REPLICAS_ANNOTATION, i32::MAX)?;
    let min = parse(TMIN_REPLICAS_ANNOTATION, i32::MIN)?;
    if min > max {
        return Err(AdmissionError::invalid(
            "tserver",
            "unexpected annotation value",
        ));
    }
    Ok((min, max))
}

fn default_node_image(env: &AdmissionEnvironment, namespace: &str) -> Result<(String, String)> {
    let no_default = || AdmissionError::invalid("tserver", "no default node image has been set");

    let object = env
        .cache
        .get(
            WatchedKind::TFrameworkConfig,
            namespace,
            FIXED_TFRAMEWORK_CONFIG_RESOURCE_NAME,
        )?
        .ok_or_else(no_default)?;
    let config: TFrameworkConfig = typed(WatchedKind::TFrameworkConfig, &object)?;

    let image = config.node_image.image.trim();
    if image.is_empty() {
        return Err(no_default());
    }
    Ok((image.to_owned(), config.node_image.secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::test_utils::{CONTROLLER, cached, environment, patched, request};
    use rstest::rstest;
    use serde_json::Value;

    fn framework_cache() -> InMemoryCache {
        InMemoryCache::new().all_synced().with_object(
            WatchedKind::TFrameworkConfig,
            cached(
                WatchedKind::TFrameworkConfig,
                json!({
                    "metadata": {"name": "tars-framework"},
                    "nodeImage": {"image": "tarscloud/tars.tarsnode:v1.3.0", "secret": "tars-image-secret"}
                }),
            ),
        )
    }

    fn tars_server() -> Value {
        json!({
            "metadata": {"name": "test-testserver", "namespace": "tars"},
            "spec": {
                "app": "Test",
                "server": "TestServer",
                "subType": "tars",
                "tars": {"template": "tars.cpp", "servants": [{"name": "TestObj", "port": 10000}]},
                "k8s": {"replicas": 5, "readinessGates": ["custom.io/ready", "tars.io/active", "custom.io/ready"]},
                "release": {"id": "v1", "image": "registry/test:v1"}
            }
        })
    }

    fn normal_server() -> Value {
        json!({
            "metadata": {"name": "test-web", "namespace": "tars", "labels": {"tars.io/Template": "tars.cpp"}},
            "spec": {
                "app": "Test",
                "server": "Web",
                "subType": "normal",
                "normal": {},
                "k8s": {"replicas": 1, "hostIPC": true},
                "release": {"id": "v2", "image": "registry/web:v2", "nodeImage": "stale", "nodeSecret": "stale"}
            }
        })
    }

    fn run(cache: InMemoryCache, object: &Value) -> Result<Patch> {
        let env = environment(cache);
        mutate_tserver(&env, &request("TServer", "CREATE", CONTROLLER, Some(object.clone()), None))
    }

    #[test]
    fn tars_server_is_normalized() {
        let object = tars_server();
        let result = patched(&object, &run(framework_cache(), &object).unwrap());

        assert_eq!(
            result["metadata"]["labels"],
            json!({
                "tars.io/ServerApp": "Test",
                "tars.io/ServerName": "TestServer",
                "tars.io/SubType": "tars",
                "tars.io/Template": "tars.cpp",
                "tars.io/ServerID": "v1"
            })
        );
        assert_eq!(
            result["spec"]["k8s"]["readinessGates"],
            json!(["tars.io/active", "custom.io/ready"])
        );
        assert_eq!(result["spec"]["release"]["time"], "2023-04-05T06:07:08Z");
        assert_eq!(result["spec"]["release"]["nodeImage"], "tarscloud/tars.tarsnode:v1.3.0");
        assert_eq!(result["spec"]["release"]["nodeSecret"], "tars-image-secret");
        assert_eq!(result["spec"]["k8s"]["replicas"], 5);
    }

    #[rstest]
    #[case::tars(tars_server())]
    #[case::normal(normal_server())]
    fn mutation_is_idempotent(#[case] object: Value) {
        let first = patched(&object, &run(framework_cache(), &object).unwrap());
        let second = run(framework_cache(), &first).unwrap();
        assert!(second.0.is_empty(), "unexpected patch {second:?}");
    }

    #[test]
    fn normal_server_is_normalized() {
        let object = normal_server();
        let result = patched(&object, &run(framework_cache(), &object).unwrap());

        assert!(result["metadata"]["labels"].get("tars.io/Template").is_none());
        assert_eq!(result["spec"]["normal"]["ports"], json!([]));
        assert_eq!(result["spec"]["k8s"]["notStacked"], true);
        assert!(result["spec"]["release"].get("nodeImage").is_none());
        assert!(result["spec"]["release"].get("nodeSecret").is_none());
    }

    #[test]
    fn unreleased_server_has_no_replicas() {
        let mut object = tars_server();
        object["spec"].as_object_mut().unwrap().remove("release");
        let result = patched(&object, &run(InMemoryCache::new(), &object).unwrap());

        assert_eq!(result["spec"]["k8s"]["replicas"], 0);
        assert!(result["metadata"]["labels"].get("tars.io/ServerID").is_none());
    }

    #[rstest]
    #[case::clamped_to_max("1", "3", 3)]
    #[case::clamped_to_min("6", "9", 6)]
    #[case::within_bounds("0", "99", 5)]
    fn replicas_are_clamped(#[case] min: &str, #[case] max: &str, #[case] expected: i32) {
        let mut object = tars_server();
        object["metadata"]["annotations"] =
            json!({"tars.io/MinReplicas": min, "tars.io/MaxReplicas": max});
        let result = patched(&object, &run(framework_cache(), &object).unwrap());
        assert_eq!(result["spec"]["k8s"]["replicas"], expected);
    }

    #[rstest]
    #[case::leading_zero(json!({"tars.io/MaxReplicas": "01"}), "unexpected annotation format")]
    #[case::too_large(json!({"tars.io/MinReplicas": "100"}), "unexpected annotation format")]
    #[case::not_a_number(json!({"tars.io/MinReplicas": "x"}), "unexpected annotation format")]
    #[case::min_above_max(
        json!({"tars.io/MinReplicas": "5", "tars.io/MaxReplicas": "2"}),
        "unexpected annotation value"
    )]
    fn invalid_replica_annotations(#[case] annotations: Value, #[case] reason: &str) {
        let mut object = tars_server();
        object["metadata"]["annotations"] = annotations;
        let error = run(framework_cache(), &object).unwrap_err();
        assert_eq!(error.to_string(), format!("tserver resource is invalid : {reason}"));
    }

    #[test]
    fn missing_node_image_is_rejected() {
        let error = run(InMemoryCache::new().all_synced(), &tars_server()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "tserver resource is invalid : no default node image has been set"
        );
    }

    #[test]
    fn unsynced_framework_config_is_not_ready() {
        let error = run(InMemoryCache::new(), &tars_server()).unwrap_err();
        assert!(error.is_not_ready());
    }

    #[test]
    fn explicit_node_image_is_kept() {
        let mut object = tars_server();
        object["spec"]["release"]["nodeImage"] = json!("custom/tarsnode:v2");
        let result = patched(&object, &run(InMemoryCache::new(), &object).unwrap());
        assert_eq!(result["spec"]["release"]["nodeImage"], "custom/tarsnode:v2");
    }
}
