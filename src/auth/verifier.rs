// Token verification seam used by the edge middleware

use crate::core::crypto::TokenSigner;
use crate::core::errors::AuthError;
use crate::core::models::UserId;
use async_trait::async_trait;
use std::sync::Arc;

/// Resolves a bearer token to the subject it was issued for
///
/// Failures keep their internal reason for the audit log; the edge
/// collapses all of them into a single rejection.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError>;
}

/// In-process verification with the shared secret
pub struct LocalTokenVerifier {
    signer: Arc<TokenSigner>,
}

impl LocalTokenVerifier {
    pub fn new(signer: Arc<TokenSigner>) -> Self {
        Self { signer }
    }
}

#[async_trait]
impl TokenVerifier for LocalTokenVerifier {
    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        self.signer.verify(token).map_err(AuthError::from)
    }
}
