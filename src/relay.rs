use serde::{Deserialize, Serialize};

/// Body of `POST /api/vqa`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VqaRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

impl VqaRequest {
    pub fn new(image: &str, question: &str) -> Self {
        Self {
            image: Some(image.to_string()),
            question: Some(question.to_string()),
        }
    }

    /// Both fields, or `None` if either is missing or empty.
    pub fn fields(&self) -> Option<(&str, &str)> {
        let image = self.image.as_deref().filter(|s| !s.is_empty())?;
        let question = self.question.as_deref().filter(|s| !s.is_empty())?;
        Some((image, question))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VqaResponse {
    pub answer: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RelayErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<f64>,
}

impl RelayErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            estimated_time: None,
        }
    }

    /// One-line message for the client side.
    pub fn message(&self) -> String {
        match &self.details {
            Some(details) => format!("{} ({})", self.error, details),
            None => self.error.clone(),
        }
    }
}

// Axum integration (optional - requires axum dependency)
#[cfg(feature = "relay-server")]
pub mod server {
    use super::*;
    use axum::{
        extract::{DefaultBodyLimit, State},
        http::{header, Method, StatusCode},
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use std::sync::Arc;
    use tower_http::cors::{Any, CorsLayer};

    use crate::error::UpstreamError;
    use crate::services::VqaModel;

    const DEFAULT_RETRY_AFTER_SECS: u64 = 20;
    const JSON_OVERHEAD_BYTES: usize = 64 * 1024;

    /// Largest request body for an upload of `max_upload_bytes` sent as a base64 data URL.
    pub fn body_limit(max_upload_bytes: u64) -> usize {
        let raw = max_upload_bytes as usize;
        (raw + 2) / 3 * 4 + JSON_OVERHEAD_BYTES
    }

    pub struct AppState {
        pub model: Arc<dyn VqaModel>,
    }

    pub fn create_relay_router(model: Arc<dyn VqaModel>, max_upload_bytes: u64) -> Router {
        let state = Arc::new(AppState { model });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

        Router::new()
            .route("/", get(root_handler))
            .route("/api/vqa", post(vqa_handler).fallback(method_not_allowed))
            .route("/health", get(health_check))
            .layer(DefaultBodyLimit::max(body_limit(max_upload_bytes)))
            .layer(cors)
            .with_state(state)
    }

    fn error_response(status: StatusCode, body: RelayErrorBody) -> Response {
        (status, Json(body)).into_response()
    }

    async fn vqa_handler(State(state): State<Arc<AppState>>, body: String) -> Response {
        log::info!("🔔 VQA request received ({} bytes)", body.len());

        let request: VqaRequest = match serde_json::from_str(&body) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("⚠️ Failed to parse VQA request: {}", e);
                return error_response(StatusCode::BAD_REQUEST, RelayErrorBody::new("Invalid JSON body"));
            }
        };

        let Some((image, question)) = request.fields() else {
            log::warn!("⚠️ VQA request without image or question");
            return error_response(
                StatusCode::BAD_REQUEST,
                RelayErrorBody::new("Missing image or question"),
            );
        };

        match state.model.answer(image, question).await {
            Ok(answer) => {
                log::info!("✅ Answered '{}': {}", question, answer);
                (StatusCode::OK, Json(VqaResponse { answer })).into_response()
            }
            Err(UpstreamError::Loading { estimated_time }) => {
                let retry_after = estimated_time
                    .map(|t| t.ceil().max(1.0) as u64)
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                let body = RelayErrorBody {
                    error: "Model is loading, retry in a few seconds".to_string(),
                    details: None,
                    estimated_time,
                };
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    [(header::RETRY_AFTER, retry_after.to_string())],
                    Json(body),
                )
                    .into_response()
            }
            Err(e) => {
                log::error!("❌ Model query failed: {}", e);
                let body = RelayErrorBody {
                    error: "Failed to query model".to_string(),
                    details: Some(e.to_string()),
                    estimated_time: None,
                };
                error_response(StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        }
    }

    async fn method_not_allowed() -> Response {
        error_response(StatusCode::METHOD_NOT_ALLOWED, RelayErrorBody::new("Method not allowed"))
    }

    async fn root_handler() -> &'static str {
        "Dish VQA relay - POST {image, question} to /api/vqa"
    }

    async fn health_check() -> &'static str {
        "OK"
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::services::image::{ImageEncoding, DEFAULT_MAX_UPLOAD_BYTES};
        use crate::services::upstream::testing::{FakeModel, FakeReply};
        use axum::body::{to_bytes, Body};
        use axum::http::Request;
        use tower::ServiceExt;

        fn router(reply: FakeReply) -> (Router, Arc<FakeModel>) {
            let model = Arc::new(FakeModel::new(reply));
            (create_relay_router(model.clone(), DEFAULT_MAX_UPLOAD_BYTES), model)
        }

        fn post_json(body: &str) -> Request<Body> {
            Request::builder()
                .method("POST")
                .uri("/api/vqa")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        }

        async fn body_json(response: Response) -> serde_json::Value {
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            serde_json::from_slice(&bytes).unwrap()
        }

        #[tokio::test]
        async fn test_answers_question() {
            let (app, model) = router(FakeReply::Answer("borscht"));

            let response = app
                .oneshot(post_json(r#"{"image": "data:image/jpeg;base64,QUJD", "question": "What is the name of this dish?"}"#))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json(response).await["answer"], "borscht");
            assert_eq!(
                *model.questions.lock().unwrap(),
                vec!["What is the name of this dish?".to_string()]
            );
        }

        #[tokio::test]
        async fn test_missing_question_is_bad_request() {
            let (app, model) = router(FakeReply::Answer("borscht"));

            let response = app.oneshot(post_json(r#"{"image": "QUJD"}"#)).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["error"], "Missing image or question");
            assert!(model.questions.lock().unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_empty_image_is_bad_request() {
            let (app, _) = router(FakeReply::Answer("borscht"));
            let response = app
                .oneshot(post_json(r#"{"image": "", "question": "What?"}"#))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        #[tokio::test]
        async fn test_invalid_json_is_bad_request() {
            let (app, _) = router(FakeReply::Answer("borscht"));
            let response = app.oneshot(post_json("not json")).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        #[tokio::test]
        async fn test_wrong_method_is_not_allowed() {
            let (app, _) = router(FakeReply::Answer("borscht"));

            let request = Request::builder()
                .method("GET")
                .uri("/api/vqa")
                .body(Body::empty())
                .unwrap();
            let response = app.oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(body_json(response).await["error"], "Method not allowed");
        }

        #[tokio::test]
        async fn test_loading_model_is_service_unavailable() {
            let (app, _) = router(FakeReply::Loading(Some(12.3)));

            let response = app
                .oneshot(post_json(r#"{"image": "QUJD", "question": "What?"}"#))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(response.headers()[header::RETRY_AFTER], "13");
            let body = body_json(response).await;
            assert!(body["error"].as_str().unwrap().contains("retry"));
            assert_eq!(body["estimated_time"], 12.3);
        }

        #[tokio::test]
        async fn test_upstream_failure_is_internal_error() {
            let (app, _) = router(FakeReply::Status(500));

            let response = app
                .oneshot(post_json(r#"{"image": "QUJD", "question": "What?"}"#))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let body = body_json(response).await;
            assert_eq!(body["error"], "Failed to query model");
            assert!(body["details"].as_str().unwrap().contains("500"));
        }

        #[tokio::test]
        async fn test_cors_preflight_allows_post() {
            let (app, _) = router(FakeReply::Answer("borscht"));

            let request = Request::builder()
                .method("OPTIONS")
                .uri("/api/vqa")
                .header("origin", "http://localhost:3000")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type")
                .body(Body::empty())
                .unwrap();
            let response = app.oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        }

        #[tokio::test]
        async fn test_accepts_photo_near_upload_limit() {
            let (app, model) = router(FakeReply::Answer("lasagna"));
            let image = ImageEncoding::from_bytes(&vec![7u8; 3 * 1024 * 1024], "image/jpeg");
            let body = serde_json::to_string(&VqaRequest::new(image.as_str(), "What?")).unwrap();

            let response = app.oneshot(post_json(&body)).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json(response).await["answer"], "lasagna");
            assert_eq!(model.questions.lock().unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_rejects_body_over_limit() {
            let model = Arc::new(FakeModel::new(FakeReply::Answer("lasagna")));
            let app = create_relay_router(model.clone(), 1024);
            let image = ImageEncoding::from_bytes(&vec![7u8; 4096], "image/jpeg");
            let body = serde_json::to_string(&VqaRequest::new(image.as_str(), "What?")).unwrap();

            // Pad past the JSON allowance on top of the encoded upload.
            let padded = format!("{}{}", body, " ".repeat(body_limit(1024)));
            let response = app.oneshot(post_json(&padded)).await.unwrap();

            assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
            assert!(model.questions.lock().unwrap().is_empty());
        }

        #[test]
        fn test_body_limit_covers_base64_of_max_upload() {
            let max = DEFAULT_MAX_UPLOAD_BYTES;
            let encoded = ImageEncoding::from_bytes(&vec![0u8; max as usize], "image/jpeg");
            assert!(body_limit(max) > encoded.as_str().len() + 200);
        }

        #[tokio::test]
        async fn test_health() {
            let (app, _) = router(FakeReply::Answer("borscht"));
            let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
            let response = app.oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
