use md5::{Digest, Md5};

use crate::admission_request::AdmissionRequest;
use crate::crd::{HasMetadata, TAccount};
use crate::environment::AdmissionEnvironment;
use crate::errors::{AdmissionError, Result};

pub(super) fn validate_create(_env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    let taccount: TAccount = request.decode_object()?;
    validate_name(&taccount)
}

pub(super) fn validate_update(env: &AdmissionEnvironment, request: &AdmissionRequest) -> Result<()> {
    if env.controller.authorizes(request.username()) {
        return Ok(());
    }
    let taccount: TAccount = request.decode_object()?;
    validate_name(&taccount)
}

/// Accounts are named after the md5 digest of their username.
fn validate_name(taccount: &TAccount) -> Result<()> {
    let expected = hex::encode(Md5::digest(taccount.spec.username.as_bytes()));
    if taccount.name() != expected {
        return Err(AdmissionError::invalid("taccount", "unexpected resource name"));
    }
    Ok(())
}
