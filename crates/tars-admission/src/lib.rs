extern crate k8s_openapi;
extern crate kube;

pub mod admission_request;
pub mod admission_response;
pub mod cache;
pub mod constants;
pub mod conversion;
pub mod crd;
pub mod environment;
pub mod errors;
pub mod mutating;
pub mod patch;
pub mod registry;
pub mod translator;
pub mod validating;

#[cfg(test)]
pub(crate) mod test_utils;
