// Axum web server layer for the gateway

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;

pub mod handlers;
pub mod middleware;
pub mod responses;

use crate::auth::{edge_auth_middleware, EdgeAuthState};
use crate::proxy::{DownstreamClient, IdentityClient};

// Re-export Config from config module
pub use crate::config::Config;

/// Gateway state shared by all handlers
///
/// All components are wrapped in Arc for shared ownership across async tasks.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityClient>,
    pub downstream: Arc<dyn DownstreamClient>,
    pub config: Arc<Config>,
}

/// Create the gateway router
///
/// Credential endpoints and `/health` are public. Every other route sits
/// behind the edge verification middleware, applied with `route_layer` so
/// unmatched paths still answer 404 rather than 401.
///
/// Middleware stack (outermost to innermost):
/// - Tracing (tower-http::trace)
/// - Request timeout (tower-http::timeout)
/// - Body size limit (tower-http::limit)
/// - Edge verification (protected routes only)
pub fn create_gateway_router(app_state: AppState, edge_state: Arc<EdgeAuthState>) -> Router {
    let public = Router::new()
        .route("/api/v1/auth/register", post(handlers::register_handler))
        .route("/api/v1/auth/login", post(handlers::login_handler))
        .route("/api/v1/auth/verify", post(handlers::verify_handler))
        .route("/health", get(handlers::health_handler));

    let protected = Router::new()
        .route("/api/v1/me", get(handlers::whoami_handler))
        .route(
            "/api/v1/users/:id",
            get(handlers::users_handler).put(handlers::users_handler),
        )
        .route(
            "/api/v1/transactions",
            post(handlers::transactions_handler).get(handlers::transactions_handler),
        )
        .route("/api/v1/transactions/balance", get(handlers::transactions_handler))
        .route("/api/v1/transactions/:id", delete(handlers::transactions_handler))
        .route_layer(from_fn_with_state(edge_state, edge_auth_middleware));

    let body_limit = app_state.config.body_size_limit_bytes;
    let request_timeout = Duration::from_secs(app_state.config.request_timeout_secs);

    public
        .merge(protected)
        .layer(middleware::body_size_limit_layer(body_limit))
        .layer(middleware::timeout_layer(request_timeout))
        .layer(middleware::tracing_layer())
        .with_state(app_state)
}
