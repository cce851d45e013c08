use std::sync::Arc;
use tokio::sync::Semaphore;

use tars_admission::{
    conversion::ConversionEngine, environment::AdmissionEnvironment, mutating::MutationEngine,
    validating::ValidationEngine,
};

pub(crate) struct ApiServerState {
    pub(crate) semaphore: Semaphore,
    pub(crate) environment: Arc<AdmissionEnvironment>,
    pub(crate) mutation: MutationEngine,
    pub(crate) validation: ValidationEngine,
    pub(crate) conversion: ConversionEngine,
}
