// RPC surface of the identity service

use crate::api::middleware::{body_size_limit_layer, timeout_layer, tracing_layer};
use crate::api::responses::{ApiError, ApiJson, HealthResponse};
use crate::core::models::{
    LoginRequest, RegisterRequest, TokenResponse, VerifyTokenRequest, VerifyTokenResponse,
};
use crate::identity::IdentityService;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tracing::{error, info};

/// POST /rpc/auth/register
pub async fn register_handler(
    State(service): State<IdentityService>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = service
        .register(&request.email, &request.password, &request.name)
        .await?;
    Ok(Json(TokenResponse { token }))
}

/// POST /rpc/auth/login
pub async fn login_handler(
    State(service): State<IdentityService>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = service.login(&request.email, &request.password).await?;
    Ok(Json(TokenResponse { token }))
}

/// POST /rpc/auth/verify
pub async fn verify_handler(
    State(service): State<IdentityService>,
    ApiJson(request): ApiJson<VerifyTokenRequest>,
) -> Result<Json<VerifyTokenResponse>, ApiError> {
    let subject = service.verify_token(&request.token)?;
    Ok(Json(VerifyTokenResponse {
        valid: true,
        subject_id: subject.to_string(),
    }))
}

/// GET /health
pub async fn health_handler(
    State(service): State<IdentityService>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    match service.store_health().await {
        Ok(()) => Ok(Json(HealthResponse {
            status: "healthy".to_string(),
            store: Some("connected".to_string()),
        })),
        Err(e) => {
            error!(error = %e, "Store health check failed");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    store: Some("unreachable".to_string()),
                }),
            ))
        }
    }
}

/// Build the identity service router
pub fn create_identity_router(
    service: IdentityService,
    body_limit: usize,
    request_timeout: Duration,
) -> Router {
    info!("Building identity service router");

    Router::new()
        .route("/rpc/auth/register", post(register_handler))
        .route("/rpc/auth/login", post(login_handler))
        .route("/rpc/auth/verify", post(verify_handler))
        .route("/health", get(health_handler))
        .layer(body_size_limit_layer(body_limit))
        .layer(timeout_layer(request_timeout))
        .layer(tracing_layer())
        .with_state(service)
}
