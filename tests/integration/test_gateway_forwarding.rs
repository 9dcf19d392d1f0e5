// Forwarding of verified requests to downstream services

use crate::common::{bearer_request, body_json, gateway_app, identity_service, MockDownstream};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use finplan_identity::core::errors::FinplanError;
use finplan_identity::core::models::UserId;
use finplan_identity::downstream::FORWARDED_USER_HEADER;
use finplan_identity::identity::IdentityService;
use finplan_identity::proxy::DownstreamService;
use std::sync::Arc;
use tower::ServiceExt;

async fn signed_in(downstream: Arc<MockDownstream>) -> (Router, String, UserId) {
    let service: IdentityService = identity_service();
    let token = service.register("a@b.com", "pw1", "Ann").await.unwrap();
    let user = service.verify_token(&token).unwrap();
    (gateway_app(service, downstream), token, user)
}

#[tokio::test]
async fn test_balance_forwarded_with_subject() {
    let downstream = Arc::new(MockDownstream {
        body: r#"{"balance":"1250.00"}"#,
        ..Default::default()
    });
    let (app, token, user) = signed_in(downstream.clone()).await;

    let response = app
        .oneshot(bearer_request(Method::GET, "/api/v1/transactions/balance", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_json(response).await["balance"], "1250.00");

    let calls = downstream.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].service, DownstreamService::Transactions);
    assert_eq!(calls[0].method, Method::GET);
    assert_eq!(calls[0].path_and_query, "/api/v1/transactions/balance");
    assert_eq!(calls[0].subject, user);
}

#[tokio::test]
async fn test_create_transaction_forwards_body() {
    let downstream = Arc::new(MockDownstream {
        status: StatusCode::CREATED,
        ..Default::default()
    });
    let (app, token, user) = signed_in(downstream.clone()).await;

    let payload = r#"{"amount":"42.10","category":"groceries"}"#;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/transactions")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let calls = downstream.calls();
    assert_eq!(calls[0].method, Method::POST);
    assert_eq!(&calls[0].body[..], payload.as_bytes());
    assert_eq!(calls[0].subject, user);
}

#[tokio::test]
async fn test_query_string_and_path_params_preserved() {
    let downstream = Arc::new(MockDownstream::default());
    let (app, token, _) = signed_in(downstream.clone()).await;

    app.clone()
        .oneshot(bearer_request(Method::GET, "/api/v1/transactions?limit=20&offset=40", &token))
        .await
        .unwrap();
    app.clone()
        .oneshot(bearer_request(Method::DELETE, "/api/v1/transactions/7f1c", &token))
        .await
        .unwrap();

    let calls = downstream.calls();
    assert_eq!(calls[0].path_and_query, "/api/v1/transactions?limit=20&offset=40");
    assert_eq!(calls[1].method, Method::DELETE);
    assert_eq!(calls[1].path_and_query, "/api/v1/transactions/7f1c");
}

#[tokio::test]
async fn test_user_routes_go_to_user_service() {
    let downstream = Arc::new(MockDownstream::default());
    let (app, token, user) = signed_in(downstream.clone()).await;

    let uri = format!("/api/v1/users/{}", user);
    app.clone()
        .oneshot(bearer_request(Method::GET, &uri, &token))
        .await
        .unwrap();
    app.clone()
        .oneshot(bearer_request(Method::PUT, &uri, &token))
        .await
        .unwrap();

    let calls = downstream.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.service == DownstreamService::Users));
    assert_eq!(calls[1].method, Method::PUT);
}

#[tokio::test]
async fn test_spoofed_identity_header_ignored() {
    let downstream = Arc::new(MockDownstream::default());
    let (app, token, user) = signed_in(downstream.clone()).await;
    let someone_else = UserId::new();

    let request = Request::builder()
        .uri("/api/v1/transactions")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(FORWARDED_USER_HEADER, someone_else.to_string())
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap();

    let calls = downstream.calls();
    assert_eq!(calls[0].subject, user);
    assert_ne!(calls[0].subject, someone_else);
}

#[tokio::test]
async fn test_downstream_status_relayed() {
    let downstream = Arc::new(MockDownstream {
        status: StatusCode::NOT_FOUND,
        body: r#"{"error":"transaction not found"}"#,
        ..Default::default()
    });
    let (app, token, _) = signed_in(downstream).await;

    let response = app
        .oneshot(bearer_request(Method::DELETE, "/api/v1/transactions/missing", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], &br#"{"error":"transaction not found"}"#[..]);
}

#[tokio::test]
async fn test_downstream_timeout_is_504() {
    let downstream = Arc::new(MockDownstream::failing(|| FinplanError::Timeout {
        service: "transaction-service".to_string(),
        secs: 5,
    }));
    let (app, token, _) = signed_in(downstream).await;

    let response = app
        .oneshot(bearer_request(Method::GET, "/api/v1/transactions", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "upstream timeout");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn test_downstream_unreachable_is_502() {
    let downstream = Arc::new(MockDownstream::failing(|| FinplanError::DependencyFailure {
        service: "user-service".to_string(),
        error: "connection refused".to_string(),
    }));
    let (app, token, user) = signed_in(downstream).await;

    let request = Request::builder()
        .uri(format!("/api/v1/users/{}", user))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header("x-request-id", "req-77")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "service unavailable");
    assert_eq!(body["request_id"], "req-77");
    assert!(!body.to_string().contains("connection refused"));
}
