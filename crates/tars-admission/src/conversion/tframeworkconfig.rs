use serde_json::{Map, Value};

use super::{child_object, set_api_version, stash, unstash};
use crate::constants::{
    CONVERSION_ANNOTATION_1B2_1B3, TARS_GROUP_VERSION_V1BETA2, TARS_GROUP_VERSION_V1BETA3,
};

/// `imageRegistry` became `imageUpload`, and builds gained an `executor`.
pub(super) fn v1beta2_to_v1beta3(object: &Value) -> Value {
    let mut converted = object.clone();
    let append = unstash(&mut converted, CONVERSION_ANNOTATION_1B2_1B3);

    if let Some(config) = converted.as_object_mut() {
        if let Some(registry) = config.remove("imageRegistry") {
            config.insert("imageUpload".to_owned(), registry);
        }
        if let Some(build) = child_object(config, "imageBuild") {
            let executor = append
                .get("executor")
                .filter(|executor| executor.is_object())
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            build.insert("executor".to_owned(), executor);
        }
    }

    set_api_version(&mut converted, TARS_GROUP_VERSION_V1BETA3);
    converted
}

pub(super) fn v1beta3_to_v1beta2(object: &Value) -> Value {
    let mut converted = object.clone();
    let mut append = Map::new();

    if let Some(config) = converted.as_object_mut() {
        if let Some(upload) = config.remove("imageUpload") {
            config.insert("imageRegistry".to_owned(), upload);
        }
        let executor = config
            .get_mut("imageBuild")
            .and_then(Value::as_object_mut)
            .and_then(|build| build.remove("executor"))
            .unwrap_or_else(|| Value::Object(Map::new()));
        append.insert("executor".to_owned(), executor);
    }

    stash(&mut converted, CONVERSION_ANNOTATION_1B2_1B3, append);
    set_api_version(&mut converted, TARS_GROUP_VERSION_V1BETA2);
    converted
}
