use json_patch::Patch;
use serde_json::json;
use std::collections::HashSet;

use crate::admission_request::AdmissionRequest;
use crate::crd::TTree;
use crate::environment::AdmissionEnvironment;
use crate::errors::Result;
use crate::patch::PatchBuilder;

/// Apps pointing at a business that does not exist are detached from it.
pub(super) fn mutate_ttree(_env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<Patch> {
    let object = request.object()?;
    let ttree: TTree = request.decode_object()?;
    let mut patch = PatchBuilder::new(object);

    let businesses: HashSet<&str> = ttree.businesses.iter().map(|b| b.name.as_str()).collect();

    for (index, app) in ttree.apps.iter().enumerate() {
        if !app.business_ref.is_empty() && !businesses.contains(app.business_ref.as_str()) {
            let index = index.to_string();
            patch.set(&["apps", &index, "businessRef"], json!(""))?;
        }
    }

    Ok(patch.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CONTROLLER, patched, request, synced_environment};

    #[test]
    fn dangling_business_references_are_cleared() {
        let object = json!({
            "metadata": {"name": "tars-tree"},
            "businesses": [{"name": "Shop", "show": "Shop"}],
            "apps": [
                {"name": "Cart", "businessRef": "Shop"},
                {"name": "Test", "businessRef": "Gone"},
                {"name": "Base", "businessRef": ""}
            ]
        });
        let env = synced_environment();
        let req = request("TTree", "UPDATE", CONTROLLER, Some(object.clone()), None);
        let patch = mutate_ttree(&env, &req).unwrap();

        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!([{"op": "replace", "path": "/apps/1/businessRef", "value": ""}])
        );

        let result = patched(&object, &patch);
        let req = request("TTree", "UPDATE", CONTROLLER, Some(result), None);
        assert!(mutate_ttree(&env, &req).unwrap().0.is_empty());
    }
}
