use std::collections::HashSet;

use crate::admission_request::AdmissionRequest;
use crate::cache::{LabelSelector, WatchedKind};
use crate::constants::{FIXED_TTREE_RESOURCE_NAME, TSERVER_APP_LABEL};
use crate::crd::{HasMetadata, TTree};
use crate::environment::AdmissionEnvironment;
use crate::errors::{AdmissionError, Result};

const KIND: &str = "ttree";

pub(super) fn validate_create(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    let ttree: TTree = request.decode_object()?;
    let namespace = request.target_namespace();

    // there is exactly one tree per namespace, with a well known name
    if ttree.name() != FIXED_TTREE_RESOURCE_NAME
        || env
            .cache
            .get(WatchedKind::TTree, namespace, FIXED_TTREE_RESOURCE_NAME)?
            .is_some()
    {
        return Err(AdmissionError::Forbidden(
            "create ttree operation is defined".to_owned(),
        ));
    }

    validate_ttree(env, namespace, &ttree, None)
}

pub(super) fn validate_update(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    if env.controller.authorizes(request.username()) {
        return Ok(());
    }
    let ttree: TTree = request.decode_object()?;
    let old: TTree = request.decode_old_object()?;
    validate_ttree(env, request.target_namespace(), &ttree, Some(&old))
}

pub(super) fn validate_delete(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    if env.controller.authorizes_or_system(request.username()) {
        return Ok(());
    }
    let old: TTree = request.decode_old_object()?;
    if old.name() == FIXED_TTREE_RESOURCE_NAME {
        return Err(AdmissionError::Forbidden(
            "delete ttree operation is defined".to_owned(),
        ));
    }
    Ok(())
}

fn validate_ttree(
    env: &AdmissionEnvironment,
    namespace: &str,
    ttree: &TTree,
    old: Option<&TTree>,
) -> Result<()> {
    let mut businesses = HashSet::new();
    for business in &ttree.businesses {
        if !businesses.insert(business.name.as_str()) {
            return Err(AdmissionError::invalid(
                KIND,
                format!("duplicate business name : {}", business.name),
            ));
        }
    }

    let mut apps = HashSet::new();
    for app in &ttree.apps {
        if !apps.insert(app.name.as_str()) {
            return Err(AdmissionError::invalid(
                KIND,
                format!("duplicate app name : {}", app.name),
            ));
        }
        if !app.business_ref.is_empty() && !businesses.contains(app.business_ref.as_str()) {
            return Err(AdmissionError::invalid(
                KIND,
                format!("business/{} not exist", app.business_ref),
            ));
        }
    }

    let Some(old) = old else {
        return Ok(());
    };

    for removed in old.apps.iter().filter(|app| !apps.contains(app.name.as_str())) {
        let selector = LabelSelector::new().equals(TSERVER_APP_LABEL, &removed.name);
        if !env.cache.list(WatchedKind::TServer, namespace, &selector)?.is_empty() {
            return Err(AdmissionError::invalid(
                KIND,
                format!(
                    "cannot delete ttree/apps[{}] because it is reference by some tserver",
                    removed.name
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::test_utils::{CONTROLLER, cached, environment, request, synced_environment};
    use rstest::rstest;
    use serde_json::{Value, json};

    fn ttree(apps: Value) -> Value {
        json!({
            "metadata": {"name": "tars-tree"},
            "businesses": [{"name": "Framework"}, {"name": "Shop"}],
            "apps": apps
        })
    }

    #[rstest]
    #[case::valid(json!([{"name": "tars", "businessRef": "Framework"}, {"name": "Test", "businessRef": ""}]), None)]
    #[case::duplicate_app(
        json!([{"name": "Test"}, {"name": "Test"}]),
        Some("ttree resource is invalid : duplicate app name : Test")
    )]
    #[case::dangling_business(
        json!([{"name": "Test", "businessRef": "Bank"}]),
        Some("ttree resource is invalid : business/Bank not exist")
    )]
    fn create(#[case] apps: Value, #[case] error: Option<&str>) {
        let req = request("TTree", "CREATE", "alice", Some(ttree(apps)), None);
        let result = validate_create(&synced_environment(), &req);
        assert_eq!(result.err().map(|e| e.to_string()).as_deref(), error);
    }

    #[test]
    fn duplicate_business() {
        let mut object = ttree(json!([]));
        object["businesses"] = json!([{"name": "Shop"}, {"name": "Shop"}]);
        let req = request("TTree", "CREATE", "alice", Some(object), None);
        assert_eq!(
            validate_create(&synced_environment(), &req).unwrap_err().to_string(),
            "ttree resource is invalid : duplicate business name : Shop"
        );
    }

    #[test]
    fn single_tree_per_namespace() {
        let mut object = ttree(json!([]));
        object["metadata"]["name"] = json!("other-tree");
        let req = request("TTree", "CREATE", "alice", Some(object), None);
        assert_eq!(
            validate_create(&synced_environment(), &req).unwrap_err().to_string(),
            "create ttree operation is defined"
        );

        let cache = InMemoryCache::new()
            .all_synced()
            .with_object(WatchedKind::TTree, cached(WatchedKind::TTree, ttree(json!([]))));
        let req = request("TTree", "CREATE", "alice", Some(ttree(json!([]))), None);
        assert_eq!(
            validate_create(&environment(cache), &req).unwrap_err().to_string(),
            "create ttree operation is defined"
        );
    }

    #[test]
    fn referenced_app_cannot_be_removed() {
        let tserver = json!({
            "metadata": {"name": "test-testserver", "labels": {"tars.io/ServerApp": "Test"}},
            "spec": {"app": "Test", "server": "TestServer"}
        });
        let cache = InMemoryCache::new()
            .all_synced()
            .with_object(WatchedKind::TServer, cached(WatchedKind::TServer, tserver));
        let env = environment(cache);
        let old = ttree(json!([{"name": "Test"}, {"name": "Unused"}]));

        let req = request("TTree", "UPDATE", "alice", Some(ttree(json!([{"name": "Test"}]))), Some(old.clone()));
        assert!(validate_update(&env, &req).is_ok());

        let req = request("TTree", "UPDATE", "alice", Some(ttree(json!([{"name": "Unused"}]))), Some(old.clone()));
        assert_eq!(
            validate_update(&env, &req).unwrap_err().to_string(),
            "ttree resource is invalid : cannot delete ttree/apps[Test] because it is reference by some tserver"
        );

        let req = request("TTree", "UPDATE", CONTROLLER, Some(ttree(json!([]))), Some(old));
        assert!(validate_update(&env, &req).is_ok());
    }

    #[rstest]
    #[case::user("alice", false)]
    #[case::controller(CONTROLLER, true)]
    #[case::namespace_controller("system:serviceaccount:kube-system:namespace-controller", true)]
    fn delete(#[case] username: &str, #[case] allowed: bool) {
        let req = request("TTree", "DELETE", username, None, Some(ttree(json!([]))));
        assert_eq!(validate_delete(&synced_environment(), &req).is_ok(), allowed);
    }
}
