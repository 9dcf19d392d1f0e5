// Edge authentication: bearer extraction, verification, audit

pub mod audit_logger;
pub mod auth_middleware;
pub mod verifier;

pub use auth_middleware::{edge_auth_middleware, extract_bearer_token, EdgeAuthState};
pub use verifier::{LocalTokenVerifier, TokenVerifier};
