// Unit tests for API error bodies

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use finplan_identity::api::responses::{ApiError, ApiJson, ErrorResponse};
use finplan_identity::core::errors::{AuthError, EdgeRejection, FinplanError, PublicError};
use finplan_identity::core::models::RegisterRequest;
use tower::ServiceExt;

async fn error_body(err: ApiError) -> (StatusCode, ErrorResponse) {
    let response = err.into_response();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_public_error_body() {
    let (status, body) = error_body(ApiError::from(PublicError::AlreadyExists)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body.error, "user already exists");
    assert_eq!(body.code.as_deref(), Some("already_exists"));
}

#[tokio::test]
async fn test_unknown_user_and_wrong_password_same_body() {
    let (s1, b1) = error_body(ApiError::from(AuthError::UserNotFound)).await;
    let (s2, b2) = error_body(ApiError::from(AuthError::InvalidCredentials)).await;
    assert_eq!(s1, s2);
    assert_eq!(b1.error, b2.error);
    assert_eq!(b1.code, b2.code);
}

#[tokio::test]
async fn test_edge_rejection_body() {
    let (status, body) = error_body(ApiError::from(EdgeRejection::InvalidToken)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.error, "invalid or expired token");
    assert!(body.code.is_none());
}

#[tokio::test]
async fn test_finplan_error_body_with_request_id() {
    let err = ApiError::from(FinplanError::Timeout {
        service: "user-service".to_string(),
        secs: 5,
    })
    .with_request_id("req-123".to_string());
    let (status, body) = error_body(err).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body.error, "upstream timeout");
    assert_eq!(body.request_id.as_deref(), Some("req-123"));
}

async fn echo(ApiJson(request): ApiJson<RegisterRequest>) -> String {
    request.email
}

#[tokio::test]
async fn test_api_json_rejection_is_invalid_input() {
    let app = Router::new().route("/", post(echo));

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email": "a@b.com"}"#))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body.code.as_deref(), Some("invalid_input"));

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email":"a@b.com","password":"pw1","name":"Ann"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
