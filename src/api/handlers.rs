// Request handlers for gateway endpoints

use axum::{
    extract::{OriginalUri, State},
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Json, Response},
    Extension,
};
use bytes::Bytes;
use tracing::{debug, info};

use crate::api::responses::{ApiError, ApiJson, HealthResponse, WhoAmIResponse};
use crate::api::AppState;
use crate::core::models::{
    AuthenticatedUser, LoginRequest, RegisterRequest, TokenResponse, VerifyTokenRequest,
    VerifyTokenResponse,
};
use crate::proxy::{DownstreamService, ForwardRequest};

/// POST /api/v1/auth/register
pub async fn register_handler(
    State(app_state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let response = app_state.identity.register(&request).await?;
    Ok(Json(response))
}

/// POST /api/v1/auth/login
pub async fn login_handler(
    State(app_state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let response = app_state.identity.login(&request).await?;
    Ok(Json(response))
}

/// POST /api/v1/auth/verify
///
/// Introspection only; protected routes verify through the edge middleware.
pub async fn verify_handler(
    State(app_state): State<AppState>,
    ApiJson(request): ApiJson<VerifyTokenRequest>,
) -> Result<Json<VerifyTokenResponse>, ApiError> {
    let response = app_state.identity.verify(&request.token).await?;
    Ok(Json(response))
}

/// GET /api/v1/me
pub async fn whoami_handler(Extension(user): Extension<AuthenticatedUser>) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        user_id: user.user_id.to_string(),
    })
}

/// GET|PUT /api/v1/users/:id
pub async fn users_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    forward(&app_state, DownstreamService::Users, user, method, uri, &headers, body).await
}

/// /api/v1/transactions routes
pub async fn transactions_handler(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    forward(&app_state, DownstreamService::Transactions, user, method, uri, &headers, body).await
}

/// Relay a verified request to a downstream service under the same path
async fn forward(
    app_state: &AppState,
    service: DownstreamService,
    user: AuthenticatedUser,
    method: Method,
    uri: axum::http::Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    info!(
        service = %service,
        method = %method,
        path = %uri.path(),
        user_id = %user.user_id,
        request_id = %request_id,
        "Forwarding protected request"
    );

    let request = ForwardRequest {
        method,
        path_and_query,
        content_type: headers.get(header::CONTENT_TYPE).cloned(),
        body,
    };

    let response = app_state
        .downstream
        .forward(service, request, &user.user_id)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.clone()))?;

    debug!(
        service = %service,
        status = %response.status,
        request_id = %request_id,
        "Downstream responded"
    );

    let mut relayed = (response.status, response.body).into_response();
    match response.content_type {
        Some(content_type) => {
            relayed.headers_mut().insert(header::CONTENT_TYPE, content_type);
        }
        None => {
            relayed.headers_mut().remove(header::CONTENT_TYPE);
        }
    }
    Ok(relayed)
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        store: None,
    })
}
