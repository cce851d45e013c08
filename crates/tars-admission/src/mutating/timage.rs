use json_patch::Patch;
use serde_json::json;
use std::collections::{BTreeSet, HashSet};

use crate::admission_request::AdmissionRequest;
use crate::constants::{TIMAGE_SUPPORTED_LABEL_PREFIX, TIMAGE_TYPE_LABEL};
use crate::crd::TImage;
use crate::environment::AdmissionEnvironment;
use crate::errors::Result;
use crate::patch::PatchBuilder;

const BASE_IMAGE_TYPE: &str = "base";

pub(super) fn mutate_timage(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<Patch> {
    let object = request.object()?;
    let timage: TImage = request.decode_object()?;
    let mut patch = PatchBuilder::new(object);

    patch.set_label(TIMAGE_TYPE_LABEL, &timage.image_type)?;

    // the Supported.<type> family only makes sense on base images
    let wanted: BTreeSet<String> = if timage.image_type == BASE_IMAGE_TYPE {
        timage
            .supported_type
            .iter()
            .map(|t| format!("{TIMAGE_SUPPORTED_LABEL_PREFIX}{t}"))
            .collect()
    } else {
        BTreeSet::new()
    };

    for key in patch.labels().into_keys() {
        if key.starts_with(TIMAGE_SUPPORTED_LABEL_PREFIX) && !wanted.contains(&key) {
            patch.remove_label(&key)?;
        }
    }
    for key in &wanted {
        patch.set_label(key, &key[TIMAGE_SUPPORTED_LABEL_PREFIX.len()..])?;
    }

    // releases sharing an id: the first one wins
    let mut seen = HashSet::new();
    let mut position = 0;
    for release in &timage.releases {
        if !seen.insert(release.id.as_str()) {
            patch.remove(&["releases", &position.to_string()])?;
            continue;
        }
        if release.create_time.as_deref().unwrap_or_default().is_empty() {
            patch.set(
                &["releases", &position.to_string(), "createTime"],
                json!(env.now_rfc3339()),
            )?;
        }
        position += 1;
    }

    Ok(patch.build())
}
