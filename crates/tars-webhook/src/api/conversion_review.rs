use tars_admission::conversion::{ConversionRequest, ConversionResponse};

const CONVERSION_REVIEW_API_VERSION: &str = "apiextensions.k8s.io/v1";
const CONVERSION_REVIEW_KIND: &str = "ConversionReview";

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    pub request: ConversionRequest,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReviewResponse {
    pub kind: String,
    pub api_version: String,
    pub response: ConversionResponse,
}

impl ConversionReviewResponse {
    /// The review echoes the `apiVersion` and `kind` the API server sent.
    pub fn new(review: &ConversionReviewRequest, response: ConversionResponse) -> Self {
        ConversionReviewResponse {
            api_version: review
                .api_version
                .clone()
                .unwrap_or_else(|| CONVERSION_REVIEW_API_VERSION.to_owned()),
            kind: review
                .kind
                .clone()
                .unwrap_or_else(|| CONVERSION_REVIEW_KIND.to_owned()),
            response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_meta_is_copied_from_the_request() {
        let review: ConversionReviewRequest = serde_json::from_value(json!({
            "apiVersion": "apiextensions.k8s.io/v1beta1",
            "kind": "ConversionReview",
            "request": {"uid": "1", "desiredAPIVersion": "k8s.tars.io/v1beta3", "objects": []}
        }))
        .unwrap();

        let response = ConversionReviewResponse::new(&review, ConversionResponse::default());
        assert_eq!(response.api_version, "apiextensions.k8s.io/v1beta1");
        assert_eq!(response.kind, "ConversionReview");
    }

    #[test]
    fn type_meta_defaults() {
        let review: ConversionReviewRequest = serde_json::from_value(json!({
            "request": {"uid": "1", "desiredAPIVersion": "k8s.tars.io/v1beta3"}
        }))
        .unwrap();

        let response = ConversionReviewResponse::new(&review, ConversionResponse::default());
        assert_eq!(response.api_version, "apiextensions.k8s.io/v1");
        assert_eq!(response.kind, "ConversionReview");
    }
}
