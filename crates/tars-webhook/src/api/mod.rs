use axum::http::StatusCode;
use tars_admission::{admission_request::AdmissionRequest, admission_response::AdmissionResponse};
use tracing::Span;

pub mod admission_review;
pub(crate) mod api_error;
pub mod conversion_review;
pub(crate) mod handlers;
pub(crate) mod state;

pub(crate) fn populate_span_with_admission_request_data(adm_req: &AdmissionRequest) {
    Span::current().record("kind", adm_req.kind.kind.as_str());
    Span::current().record("kind_group", adm_req.kind.group.as_str());
    Span::current().record("kind_version", adm_req.kind.version.as_str());
    Span::current().record("name", adm_req.name.clone().unwrap_or_default().as_str());
    Span::current().record(
        "namespace",
        adm_req.namespace.clone().unwrap_or_default().as_str(),
    );
    Span::current().record("operation", adm_req.operation.as_str());
    Span::current().record("request_uid", adm_req.uid.as_str());
}

pub(crate) fn populate_span_with_admission_response(response: &AdmissionResponse) {
    Span::current().record("allowed", response.allowed);
    Span::current().record("mutated", response.patch.is_some());
    if let Some(status) = &response.status {
        if let Some(code) = &status.code {
            Span::current().record("response_code", code);
        }
        if let Some(reason) = &status.reason {
            Span::current().record("response_reason", reason.as_str());
        }
        if let Some(message) = &status.message {
            Span::current().record("response_message", message.as_str());
        }
    }
}

pub(crate) async fn readiness_handler() -> StatusCode {
    StatusCode::OK
}
