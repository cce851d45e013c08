//! Normalization of the Tars custom resources before they are persisted.
//!
//! Every function registered here computes the patch that brings the
//! incoming object to its normalized form. The functions are idempotent:
//! running one against the result of its own patch yields an empty patch.

use json_patch::Patch;
use tracing::debug;

use crate::admission_request::{AdmissionRequest, Operation};
use crate::admission_response::AdmissionResponse;
use crate::constants::{
    TACCOUNT_KIND, TARS_GROUP_VERSION_V1BETA3, TCONFIG_KIND, TIMAGE_KIND, TSERVER_KIND,
    TTEMPLATE_KIND, TTREE_KIND,
};
use crate::environment::AdmissionEnvironment;
use crate::errors::Result;
use crate::registry::HandlerTable;

mod taccount;
mod tconfig;
mod timage;
mod tserver;
mod ttemplate;
mod ttree;

pub type MutateFn = fn(&AdmissionEnvironment, &AdmissionRequest) -> Result<Patch>;

pub struct MutationEngine {
    handlers: HandlerTable<MutateFn>,
}

impl Default for MutationEngine {
    fn default() -> Self {
        MutationEngine::new()
    }
}

impl MutationEngine {
    pub fn new() -> Self {
        let mut handlers: HandlerTable<MutateFn> = HandlerTable::new("mutating");
        let registrations: [(&str, MutateFn); 6] = [
            (TSERVER_KIND, tserver::mutate_tserver),
            (TCONFIG_KIND, tconfig::mutate_tconfig),
            (TTREE_KIND, ttree::mutate_ttree),
            (TACCOUNT_KIND, taccount::mutate_taccount),
            (TIMAGE_KIND, timage::mutate_timage),
            (TTEMPLATE_KIND, ttemplate::mutate_ttemplate),
        ];
        for (kind, handler) in registrations {
            for operation in [Operation::Create, Operation::Update] {
                handlers.register(TARS_GROUP_VERSION_V1BETA3, operation, kind, handler);
            }
        }
        MutationEngine { handlers }
    }

    /// Compute the patch for `request`. Errors, including the lack of a
    /// registered function, become rejections.
    pub fn mutate(&self, env: &AdmissionEnvironment, request: &AdmissionRequest) -> AdmissionResponse {
        let result = self
            .handlers
            .lookup(&request.kind, request.operation)
            .and_then(|handler| handler(env, request));

        match result {
            Ok(patch) => {
                debug!(operations = patch.0.len(), "mutation computed");
                AdmissionResponse::allow_with_patch(request.uid.clone(), &patch)
            }
            Err(error) => AdmissionResponse::from_error(request.uid.clone(), &error),
        }
    }
}
