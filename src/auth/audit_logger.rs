// Security event logging for the edge

use crate::core::errors::AuthError;
use crate::core::models::UserId;
use tracing::{info, warn};

/// Authentication event type
#[derive(Debug, Clone)]
pub enum AuthEvent {
    TokenAccepted { user_id: UserId },
    /// `reason` is internal only and never reaches a response body
    TokenRejected { reason: String },
    MissingHeader,
}

impl AuthEvent {
    /// Rejection carrying the verifier's internal reason
    pub fn rejected(err: &AuthError) -> Self {
        AuthEvent::TokenRejected {
            reason: err.to_string(),
        }
    }
}

/// Client details recorded with each event
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Audit logger for edge authentication outcomes
///
/// Events go to the structured log only; nothing is persisted.
#[derive(Debug, Default)]
pub struct AuditLogger;

impl AuditLogger {
    pub fn new() -> Self {
        Self
    }

    /// Record one authentication outcome
    pub fn log_auth_event(&self, event: &AuthEvent, client: &ClientInfo) {
        match event {
            AuthEvent::TokenAccepted { user_id } => {
                info!(
                    user_id = %user_id,
                    ip_address = ?client.ip_address,
                    user_agent = ?client.user_agent,
                    "Authentication successful"
                );
            }
            AuthEvent::TokenRejected { reason } => {
                warn!(
                    ip_address = ?client.ip_address,
                    user_agent = ?client.user_agent,
                    reason = %reason,
                    "Authentication failed"
                );
            }
            AuthEvent::MissingHeader => {
                warn!(
                    ip_address = ?client.ip_address,
                    user_agent = ?client.user_agent,
                    "Authentication failed: no bearer token"
                );
            }
        }
    }
}
