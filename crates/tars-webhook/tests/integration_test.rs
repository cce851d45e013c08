mod common;

use axum::{
    body::Body,
    http::{self, header, Request, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use http_body_util::BodyExt;
use rstest::*;
use serde_json::{json, Value};
use tars_admission::{admission_response::PatchType, cache::InMemoryCache};
use tars_webhook::api::{
    admission_review::AdmissionReviewResponse, conversion_review::ConversionReviewResponse,
};
use tower::ServiceExt;

use common::{app, default_cache};

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(http::Method::POST)
        .header(header::CONTENT_TYPE, "application/json")
        .uri(uri)
        .body(body.into())
        .unwrap()
}

async fn admission_review(
    cache: InMemoryCache,
    uri: &str,
    body: &'static str,
) -> AdmissionReviewResponse {
    let response = app(cache).oneshot(post(uri, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap()
}

#[tokio::test]
async fn test_mutating() {
    let review = admission_review(
        default_cache(),
        "/mutating",
        include_str!("data/ttemplate_create.json"),
    )
    .await;

    assert_eq!(review.api_version.as_deref(), Some("admission.k8s.io/v1"));
    assert_eq!(review.kind.as_deref(), Some("AdmissionReview"));
    assert_eq!(review.response.uid, "1299d386-525b-4032-98ae-1949f69f9cfc");
    assert!(review.response.allowed);
    assert_eq!(review.response.patch_type, Some(PatchType::JSONPatch));

    let patch: Value = serde_json::from_slice(
        &general_purpose::STANDARD
            .decode(review.response.patch.unwrap())
            .unwrap(),
    )
    .unwrap();
    assert_eq!(
        patch,
        json!([
            {"op": "add", "path": "/metadata/labels", "value": {}},
            {"op": "add", "path": "/metadata/labels/tars.io~1Parent", "value": "tars.default"}
        ])
    );
}

#[tokio::test]
async fn test_validating_rejects_workload_created_by_user() {
    let review = admission_review(
        default_cache(),
        "/validating",
        include_str!("data/statefulset_create.json"),
    )
    .await;

    assert!(!review.response.allowed);
    assert_eq!(
        review.response.message(),
        Some("only use authorized account can create statefulset")
    );
}

#[tokio::test]
async fn test_validating_tserver() {
    let review = admission_review(
        default_cache(),
        "/validating",
        include_str!("data/tserver_create.json"),
    )
    .await;

    assert!(review.response.allowed);
    assert!(review.response.status.is_none());
}

#[tokio::test]
async fn test_validating_with_unsynced_cache() {
    let review = admission_review(
        InMemoryCache::new(),
        "/validating",
        include_str!("data/tserver_create.json"),
    )
    .await;

    assert!(!review.response.allowed);
    let status = review.response.status.unwrap();
    assert_eq!(status.code, Some(503));
    assert_eq!(status.reason.as_deref(), Some("NotReady"));
}

#[rstest]
#[case::mutating("/mutating", "unsupported mutating CREATE v1beta3.TExitedRecord")]
#[case::validating("/validating", "unsupported validating CREATE v1beta3.TExitedRecord")]
#[tokio::test]
async fn test_unsupported_kind(#[case] uri: &str, #[case] message: &str) {
    let body = include_str!("data/ttemplate_create.json").replace("TTemplate", "TExitedRecord");
    let response = app(default_cache()).oneshot(post(uri, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let review: AdmissionReviewResponse =
        serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
    assert!(!review.response.allowed);
    assert_eq!(review.response.message(), Some(message));
}

#[tokio::test]
async fn test_conversion() {
    let response = app(default_cache())
        .oneshot(post(
            "/conversion",
            include_str!("data/tserver_conversion.json"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let review: ConversionReviewResponse =
        serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
    assert_eq!(review.api_version, "apiextensions.k8s.io/v1");
    assert_eq!(review.kind, "ConversionReview");
    assert_eq!(review.response.uid, "0000d6e1-4b6a-4f8c-9c1e-7e2d0c1b2a03");
    assert_eq!(review.response.result.status, "Success");
    assert_eq!(review.response.converted_objects.len(), 1);

    let converted = &review.response.converted_objects[0];
    assert_eq!(converted["apiVersion"], "k8s.tars.io/v1beta2");
    assert_eq!(converted["spec"]["k8s"]["readinessGate"], "tars.io/active");
    assert!(converted["spec"]["k8s"].get("command").is_none());
    assert!(converted["spec"]["k8s"].get("readinessGates").is_none());

    let stash: Value = serde_json::from_str(
        converted["metadata"]["annotations"]["tars.io/Conversion.1b21b3"]
            .as_str()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(
        stash,
        json!({"append": {
            "command": ["/bin/sh"],
            "args": ["-c", "exec /usr/local/server/bin/start.sh"]
        }})
    );
}

#[tokio::test]
async fn test_conversion_of_unknown_kind_is_echoed() {
    let body = include_str!("data/tserver_conversion.json").replace("TServer", "TImage");
    let response = app(default_cache())
        .oneshot(post("/conversion", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let review: ConversionReviewResponse =
        serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
    let request: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(review.response.result.status, "Success");
    assert_eq!(
        review.response.converted_objects,
        request["request"]["objects"].as_array().unwrap().clone()
    );
}

#[rstest]
#[case::mutating("/mutating")]
#[case::validating("/validating")]
#[case::conversion("/conversion")]
#[tokio::test]
async fn test_malformed_review_is_dropped(#[case] uri: &str) {
    let response = app(default_cache())
        .oneshot(post(uri, "{\"request\": 42"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_readiness() {
    let response = app(InMemoryCache::new())
        .oneshot(
            Request::builder()
                .method(http::Method::GET)
                .uri("/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
