use axum::{
    extract::{self, FromRequest},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, error, Span};

use crate::api::{
    admission_review::{AdmissionReviewRequest, AdmissionReviewResponse},
    api_error::ApiError,
    conversion_review::{ConversionReviewRequest, ConversionReviewResponse},
    populate_span_with_admission_request_data, populate_span_with_admission_response,
    state::ApiServerState,
};

// create an extractor that internally uses `axum::Json` but has a custom rejection
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub(crate) struct JsonExtractor<T>(T);

impl<T: Serialize> IntoResponse for JsonExtractor<T> {
    fn into_response(self) -> axum::response::Response {
        let Self(value) = self;
        axum::Json(value).into_response()
    }
}

#[tracing::instrument(
    name = "mutation",
    fields(
        request_uid=tracing::field::Empty,
        host=crate::config::HOSTNAME.as_str(),
        name=tracing::field::Empty,
        namespace=tracing::field::Empty,
        operation=tracing::field::Empty,
        kind_group=tracing::field::Empty,
        kind_version=tracing::field::Empty,
        kind=tracing::field::Empty,
        allowed=tracing::field::Empty,
        mutated=tracing::field::Empty,
        response_code=tracing::field::Empty,
        response_reason=tracing::field::Empty,
        response_message=tracing::field::Empty,
    ),
    skip_all)]
/// Compute the patch normalizing the object of the request.
pub(crate) async fn mutating_handler(
    extract::State(state): extract::State<Arc<ApiServerState>>,
    JsonExtractor(admission_review): JsonExtractor<AdmissionReviewRequest>,
) -> Result<Json<AdmissionReviewResponse>, ApiError> {
    debug!(admission_review = ?admission_review.request, "mutating request received");

    populate_span_with_admission_request_data(&admission_review.request);

    let request = admission_review.request;
    let response = acquire_semaphore_and_run(state, move |state| {
        state.mutation.mutate(&state.environment, &request)
    })
    .await?;

    populate_span_with_admission_response(&response);

    Ok(Json(AdmissionReviewResponse::new(response)))
}

#[tracing::instrument(
    name = "validation",
    fields(
        request_uid=tracing::field::Empty,
        host=crate::config::HOSTNAME.as_str(),
        name=tracing::field::Empty,
        namespace=tracing::field::Empty,
        operation=tracing::field::Empty,
        kind_group=tracing::field::Empty,
        kind_version=tracing::field::Empty,
        kind=tracing::field::Empty,
        allowed=tracing::field::Empty,
        mutated=tracing::field::Empty,
        response_code=tracing::field::Empty,
        response_reason=tracing::field::Empty,
        response_message=tracing::field::Empty,
    ),
    skip_all)]
/// Decide whether the write described by the request can be persisted.
pub(crate) async fn validating_handler(
    extract::State(state): extract::State<Arc<ApiServerState>>,
    JsonExtractor(admission_review): JsonExtractor<AdmissionReviewRequest>,
) -> Result<Json<AdmissionReviewResponse>, ApiError> {
    debug!(admission_review = ?admission_review.request, "validating request received");

    populate_span_with_admission_request_data(&admission_review.request);

    let request = admission_review.request;
    let response = acquire_semaphore_and_run(state, move |state| {
        state.validation.validate(&state.environment, &request)
    })
    .await?;

    populate_span_with_admission_response(&response);

    Ok(Json(AdmissionReviewResponse::new(response)))
}

#[tracing::instrument(
    name = "conversion",
    fields(
        request_uid=tracing::field::Empty,
        host=crate::config::HOSTNAME.as_str(),
        desired_api_version=tracing::field::Empty,
        objects=tracing::field::Empty,
    ),
    skip_all)]
/// Convert the objects of the review to the desired version.
pub(crate) async fn conversion_handler(
    extract::State(state): extract::State<Arc<ApiServerState>>,
    JsonExtractor(mut conversion_review): JsonExtractor<ConversionReviewRequest>,
) -> Result<Json<ConversionReviewResponse>, ApiError> {
    let span = Span::current();
    span.record("request_uid", conversion_review.request.uid.as_str());
    span.record(
        "desired_api_version",
        conversion_review.request.desired_api_version.as_str(),
    );
    span.record("objects", conversion_review.request.objects.len());

    let request = std::mem::take(&mut conversion_review.request);
    let response = acquire_semaphore_and_run(state, move |state| {
        state.conversion.convert(&request)
    })
    .await?;

    Ok(Json(ConversionReviewResponse::new(
        &conversion_review,
        response,
    )))
}

/// Run `job` on the blocking thread pool once one of the worker permits is
/// available. The current span is carried over to the blocking task.
async fn acquire_semaphore_and_run<T, F>(state: Arc<ApiServerState>, job: F) -> Result<T, ApiError>
where
    F: FnOnce(&ApiServerState) -> T + Send + 'static,
    T: Send + 'static,
{
    let _permit = state.semaphore.acquire().await.map_err(|e| {
        error!(error = %e, "semaphore acquire failed");
        ApiError::internal()
    })?;

    let state = state.clone();
    let span = Span::current();
    let result = task::spawn_blocking(move || {
        let _enter = span.enter();
        job(&state)
    })
    .await
    .map_err(|e| {
        error!(error = %e, "task::spawn_blocking failed");
        ApiError::internal()
    })?;

    Ok(result)
}
