// Axum edge verification middleware

use crate::api::responses::ApiError;
use crate::auth::audit_logger::{AuditLogger, AuthEvent, ClientInfo};
use crate::auth::verifier::TokenVerifier;
use crate::core::errors::{AuthError, EdgeRejection};
use crate::core::models::AuthenticatedUser;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

const BEARER_SCHEME: &str = "bearer";

/// Dependencies of the edge middleware
#[derive(Clone)]
pub struct EdgeAuthState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub audit_logger: Arc<AuditLogger>,
    /// Upper bound on one verification; elapsed counts as a rejection
    pub verify_timeout: Duration,
}

/// Edge verification middleware function
///
/// Extracts the bearer token, verifies it, and puts an [`AuthenticatedUser`]
/// into the request extensions for the handlers behind it. Any failure ends
/// the request with 401 and one of two fixed reasons.
pub async fn edge_auth_middleware(
    State(state): State<Arc<EdgeAuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_info(request.headers());

    // 1. Extract bearer token
    let token = match extract_bearer_token(request.headers()) {
        Ok(token) => token.to_string(),
        Err(rejection) => {
            let event = match rejection {
                EdgeRejection::MissingAuthHeader => AuthEvent::MissingHeader,
                EdgeRejection::InvalidToken => AuthEvent::TokenRejected {
                    reason: "malformed authorization header".to_string(),
                },
            };
            state.audit_logger.log_auth_event(&event, &client);
            return Err(rejection.into());
        }
    };

    // 2. Verify under a deadline; a slow verifier fails closed
    let outcome = tokio::time::timeout(state.verify_timeout, state.verifier.verify_token(&token)).await;
    let user_id = match outcome {
        Ok(Ok(user_id)) => user_id,
        Ok(Err(e)) => {
            if matches!(e, AuthError::Internal(_)) {
                error!(error = %e, "Token verification failed internally - failing closed");
            }
            state.audit_logger.log_auth_event(&AuthEvent::rejected(&e), &client);
            return Err(EdgeRejection::InvalidToken.into());
        }
        Err(_) => {
            error!(
                timeout_ms = state.verify_timeout.as_millis() as u64,
                "Token verification timed out - failing closed"
            );
            state.audit_logger.log_auth_event(
                &AuthEvent::TokenRejected { reason: "verification timed out".to_string() },
                &client,
            );
            return Err(EdgeRejection::InvalidToken.into());
        }
    };

    state
        .audit_logger
        .log_auth_event(&AuthEvent::TokenAccepted { user_id }, &client);

    // 3. Attach identity and continue
    request.extensions_mut().insert(AuthenticatedUser { user_id });
    Ok(next.run(request).await)
}

/// Pull the token out of `Authorization: Bearer <token>`
///
/// An absent or blank header is `MissingAuthHeader`; a header that is present
/// but not a usable bearer credential is `InvalidToken`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, EdgeRejection> {
    let value = match headers.get(header::AUTHORIZATION) {
        Some(value) => value.to_str().map_err(|_| EdgeRejection::InvalidToken)?.trim(),
        None => return Err(EdgeRejection::MissingAuthHeader),
    };
    if value.is_empty() {
        return Err(EdgeRejection::MissingAuthHeader);
    }

    let (scheme, token) = value.split_once(' ').ok_or(EdgeRejection::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(EdgeRejection::InvalidToken);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(EdgeRejection::InvalidToken);
    }
    Ok(token)
}

/// Client IP (`X-Forwarded-For`, then `X-Real-IP`) and user agent
fn client_info(headers: &HeaderMap) -> ClientInfo {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };
    ClientInfo {
        ip_address: header_str("x-forwarded-for").or_else(|| header_str("x-real-ip")),
        user_agent: header_str("user-agent"),
    }
}
