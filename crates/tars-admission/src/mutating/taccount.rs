use json_patch::Patch;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use sha1::{Digest, Sha1};

use crate::admission_request::{AdmissionRequest, Operation};
use crate::constants::{BCRYPT_HASH_COST, LAST_APPLIED_CONFIGURATION_ANNOTATION, PASSWORD_PATTERN};
use crate::crd::TAccount;
use crate::environment::AdmissionEnvironment;
use crate::errors::{AdmissionError, Result};
use crate::patch::PatchBuilder;

lazy_static! {
    static ref PASSWORD: Regex = Regex::new(PASSWORD_PATTERN).unwrap();
}

/// Replace a plaintext password with its hash and drop the session tokens
/// whenever the credential changes.
pub(super) fn mutate_taccount(
    _env: &AdmissionEnvironment,
    request: &AdmissionRequest,
) -> Result<Patch> {
    let object = request.object()?;
    let taccount: TAccount = request.decode_object()?;
    let authentication = &taccount.spec.authentication;
    let mut patch = PatchBuilder::new(object);

    // the applied configuration would keep a copy of the plaintext password
    patch.remove_annotation(LAST_APPLIED_CONFIGURATION_ANNOTATION)?;

    let mut credential_changed = request.operation == Operation::Create;

    if let Some(password) = authentication.password.as_deref() {
        let hashed = hash_password(password)?;
        patch.remove(&["spec", "authentication", "password"])?;
        patch.set(
            &["spec", "authentication", "bcryptPassword"],
            json!(hashed),
        )?;
        credential_changed = true;
    } else if request.operation == Operation::Update {
        let old: TAccount = request.decode_old_object()?;
        credential_changed =
            old.spec.authentication.bcrypt_password != authentication.bcrypt_password;
    }

    if credential_changed {
        patch.ensure_object(&["spec"])?;
        patch.ensure_object(&["spec", "authentication"])?;
        patch.set(&["spec", "authentication", "tokens"], json!([]))?;
    }

    Ok(patch.build())
}

fn hash_password(password: &str) -> Result<String> {
    if !PASSWORD.is_match(password) {
        return Err(AdmissionError::Forbidden(format!(
            "password should match pattern {PASSWORD_PATTERN}"
        )));
    }
    let digest = hex::encode(Sha1::digest(password.as_bytes()));
    Ok(bcrypt::hash(digest, BCRYPT_HASH_COST)?)
}
