use json_patch::Patch;

use crate::admission_request::AdmissionRequest;
use crate::constants::PARENT_LABEL;
use crate::crd::{HasMetadata, TTemplate};
use crate::environment::AdmissionEnvironment;
use crate::errors::Result;
use crate::patch::PatchBuilder;

/// Mirror `spec.parent` into the Parent label. A template that is its own
/// parent is a root and carries no such label.
pub(super) fn mutate_ttemplate(
    _env: &AdmissionEnvironment,
    request: &AdmissionRequest,
) -> Result<Patch> {
    let object = request.object()?;
    let ttemplate: TTemplate = request.decode_object()?;
    let mut patch = PatchBuilder::new(object);

    if ttemplate.name() == ttemplate.spec.parent {
        patch.remove_label(PARENT_LABEL)?;
    } else {
        patch.set_label(PARENT_LABEL, &ttemplate.spec.parent)?;
    }

    Ok(patch.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CONTROLLER, patched, request, synced_environment};
    use rstest::rstest;
    use serde_json::{Value, json};

    fn run(object: &Value) -> Patch {
        let env = synced_environment();
        mutate_ttemplate(&env, &request("TTemplate", "CREATE", CONTROLLER, Some(object.clone()), None))
            .unwrap()
    }

    #[rstest]
    #[case::child_without_labels(
        json!({"metadata": {"name": "tars.cpp"}, "spec": {"parent": "tars.default"}}),
        json!({"tars.io/Parent": "tars.default"})
    )]
    #[case::child_with_stale_label(
        json!({"metadata": {"name": "tars.cpp", "labels": {"tars.io/Parent": "tars.go"}}, "spec": {"parent": "tars.default"}}),
        json!({"tars.io/Parent": "tars.default"})
    )]
    #[case::root_with_label(
        json!({"metadata": {"name": "tars.default", "labels": {"tars.io/Parent": "x", "team": "a"}}, "spec": {"parent": "tars.default"}}),
        json!({"team": "a"})
    )]
    fn parent_label_is_mirrored(#[case] object: Value, #[case] labels: Value) {
        let result = patched(&object, &run(&object));
        assert_eq!(result["metadata"]["labels"], labels);
        assert!(run(&result).0.is_empty());
    }

    #[test]
    fn root_without_labels_is_untouched() {
        let object = json!({"metadata": {"name": "tars.default"}, "spec": {"parent": "tars.default"}});
        assert!(run(&object).0.is_empty());
    }
}
