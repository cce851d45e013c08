use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::warn;

#[derive(Debug)]
/// An error that can be returned by the API.
///
/// Without a message the response has an empty body: the API server
/// treats it like a dropped request and applies its failure policy.
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) message: Option<String>,
}

impl ApiError {
    pub(crate) fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: Some("Something went wrong".to_owned()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "cannot decode review");
        Self {
            status: StatusCode::BAD_REQUEST,
            message: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self.message {
            Some(message) => {
                let payload = json!({
                    "message": message,
                    "status": self.status.as_u16(),
                });
                (self.status, axum::Json(payload)).into_response()
            }
            None => self.status.into_response(),
        }
    }
}
