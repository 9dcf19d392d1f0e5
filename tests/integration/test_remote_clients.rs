// HTTP identity and downstream clients against live and mocked peers

use crate::common::{bearer_request, body_json, identity_service, json_request, tamper};
use axum::http::{Method, StatusCode};
use bytes::Bytes;
use finplan_identity::api::{create_gateway_router, AppState};
use finplan_identity::auth::audit_logger::AuditLogger;
use finplan_identity::auth::{EdgeAuthState, TokenVerifier};
use finplan_identity::config::{Config, ServiceRole};
use finplan_identity::core::errors::{AuthError, FinplanError, PublicError, TokenError};
use finplan_identity::core::models::{LoginRequest, RegisterRequest, UserId};
use finplan_identity::downstream::FORWARDED_USER_HEADER;
use finplan_identity::identity::create_identity_router;
use finplan_identity::proxy::{
    DownstreamClient, DownstreamService, ForwardRequest, HttpDownstreamClient, HttpIdentityClient,
    IdentityClient,
};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Nothing listens here; connections are refused immediately
const DEAD_URL: &str = "http://127.0.0.1:1";

async fn spawn_identity_service() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_identity_router(identity_service(), 1024 * 1024, Duration::from_secs(30));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(url: &str) -> HttpIdentityClient {
    HttpIdentityClient::new(url, Duration::from_secs(2)).unwrap()
}

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "pw1".to_string(),
        name: "Ann".to_string(),
    }
}

#[tokio::test]
async fn test_client_against_live_identity_service() {
    let url = spawn_identity_service().await;
    let identity = client(&url);

    let registered = identity.register(&register_request("a@b.com")).await.unwrap();
    let logged_in = identity
        .login(&LoginRequest {
            email: "a@b.com".to_string(),
            password: "pw1".to_string(),
        })
        .await
        .unwrap();
    assert_ne!(registered.token, logged_in.token);

    let first = identity.verify_token(&registered.token).await.unwrap();
    let second = identity.verify_token(&logged_in.token).await.unwrap();
    assert_eq!(first, second);

    assert_eq!(
        identity.register(&register_request("a@b.com")).await.err(),
        Some(PublicError::AlreadyExists)
    );
    assert!(matches!(
        identity.verify_token(&tamper(&registered.token)).await,
        Err(AuthError::InvalidToken(TokenError::Rejected))
    ));
}

#[tokio::test]
async fn test_gateway_in_remote_verify_mode() {
    let url = spawn_identity_service().await;
    let identity = Arc::new(client(&url));
    let downstream = Arc::new(crate::common::MockDownstream::default());

    let edge_state = Arc::new(EdgeAuthState {
        verifier: identity.clone(),
        audit_logger: Arc::new(AuditLogger::new()),
        verify_timeout: Duration::from_secs(2),
    });
    let app_state = AppState {
        identity,
        downstream: downstream.clone(),
        config: Arc::new(Config::test_config(ServiceRole::Gateway)),
    };
    let app = create_gateway_router(app_state, edge_state);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/auth/register",
            json!({"email": "a@b.com", "password": "pw1", "name": "Ann"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(bearer_request(Method::GET, "/api/v1/me", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(bearer_request(Method::GET, "/api/v1/me", &tamper(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid or expired token");
}

#[tokio::test]
async fn test_identity_unreachable_fails_closed_at_edge() {
    let identity = Arc::new(client(DEAD_URL));
    let edge_state = Arc::new(EdgeAuthState {
        verifier: identity.clone(),
        audit_logger: Arc::new(AuditLogger::new()),
        verify_timeout: Duration::from_secs(2),
    });
    let app_state = AppState {
        identity,
        downstream: Arc::new(crate::common::MockDownstream::default()),
        config: Arc::new(Config::test_config(ServiceRole::Gateway)),
    };
    let app = create_gateway_router(app_state, edge_state);

    let response = app
        .clone()
        .oneshot(bearer_request(Method::GET, "/api/v1/me", "a.b.c"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid or expired token");

    // Credential endpoints surface the outage as a generic internal error
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/auth/login",
            json!({"email": "a@b.com", "password": "pw1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "internal error");
    assert!(!body.to_string().contains("127.0.0.1"));
}

#[tokio::test]
async fn test_client_maps_error_codes() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/rpc/auth/login")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"invalid credentials","code":"unauthenticated"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/rpc/auth/register")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"invalid email format","code":"invalid_input"}"#)
        .create_async()
        .await;

    let identity = client(&server.url());
    let login = LoginRequest {
        email: "a@b.com".to_string(),
        password: "wrongpw".to_string(),
    };
    assert_eq!(identity.login(&login).await.err(), Some(PublicError::Unauthenticated));
    assert_eq!(
        identity.register(&register_request("nope")).await.err(),
        Some(PublicError::InvalidInput("invalid email format".to_string()))
    );
}

#[tokio::test]
async fn test_client_treats_garbage_as_internal() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/rpc/auth/verify")
        .with_status(502)
        .with_body("<html>bad gateway</html>")
        .create_async()
        .await;

    let identity = client(&server.url());
    assert!(matches!(identity.verify_token("a.b.c").await, Err(AuthError::Internal(_))));
}

#[tokio::test]
async fn test_client_rejects_invalid_verify_answer() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/rpc/auth/verify")
        .match_body(Matcher::Json(json!({"token": "a.b.c"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"valid":false,"subject_id":""}"#)
        .create_async()
        .await;

    let identity = client(&server.url());
    assert!(matches!(
        identity.verify_token("a.b.c").await,
        Err(AuthError::InvalidToken(TokenError::Rejected))
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_downstream_client_sets_identity_header_only() {
    let mut server = mockito::Server::new_async().await;
    let user = UserId::new();
    let mock = server
        .mock("POST", "/api/v1/transactions")
        .match_header(FORWARDED_USER_HEADER, user.to_string().as_str())
        .match_header("authorization", Matcher::Missing)
        .match_header("content-type", "application/json")
        .match_body(r#"{"amount":"9.99"}"#)
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"t-1"}"#)
        .create_async()
        .await;

    let downstream =
        HttpDownstreamClient::new(DEAD_URL, &server.url(), Duration::from_secs(2)).unwrap();
    let response = downstream
        .forward(
            DownstreamService::Transactions,
            ForwardRequest {
                method: Method::POST,
                path_and_query: "/api/v1/transactions".to_string(),
                content_type: Some("application/json".parse().unwrap()),
                body: Bytes::from_static(br#"{"amount":"9.99"}"#),
            },
            &user,
        )
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(&response.body[..], &br#"{"id":"t-1"}"#[..]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_downstream_client_unreachable() {
    let downstream = HttpDownstreamClient::new(DEAD_URL, DEAD_URL, Duration::from_secs(2)).unwrap();
    let err = downstream
        .forward(
            DownstreamService::Users,
            ForwardRequest {
                method: Method::GET,
                path_and_query: "/api/v1/users/1".to_string(),
                content_type: None,
                body: Bytes::new(),
            },
            &UserId::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FinplanError::DependencyFailure { .. }));
    assert_eq!(err.status_code(), 502);
}
