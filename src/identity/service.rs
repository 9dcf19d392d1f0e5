// Registration, login and token verification

use crate::core::crypto::TokenSigner;
use crate::core::errors::{AuthError, StoreError};
use crate::core::models::{NewUser, UserId, UserRecord};
use crate::core::password::{self, MAX_PASSWORD_BYTES};
use crate::store::CredentialStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

/// Identity business rules over a credential store and a token signer
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn CredentialStore>,
    signer: Arc<TokenSigner>,
    bcrypt_cost: u32,
    store_timeout: Duration,
    /// Hash compared against when the email is unknown, so that path costs
    /// the same bcrypt work as a wrong password
    decoy_hash: Arc<OnceCell<String>>,
}

impl IdentityService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        signer: Arc<TokenSigner>,
        bcrypt_cost: u32,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            signer,
            bcrypt_cost,
            store_timeout,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn signer(&self) -> &Arc<TokenSigner> {
        &self.signer
    }

    /// Create an account and return a token for it
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<String, AuthError> {
        debug!(email = %email, "Register called");

        // Parity check only: a domain separator must be present.
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password is required".to_string()));
        }
        if name.trim().is_empty() {
            return Err(AuthError::InvalidInput("name is required".to_string()));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::InvalidInput(format!(
                "password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }

        let password_hash = password::hash_password(password, self.bcrypt_cost)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to hash password");
                AuthError::from(e)
            })?;

        let new_user = NewUser {
            email: email.to_string(),
            password_hash,
            name: name.to_string(),
        };

        let user_id = self
            .bounded(self.store.create_user(&new_user))
            .await
            .map_err(|e| {
                match &e {
                    StoreError::AlreadyExists => warn!("Registration rejected: email already registered"),
                    other => error!(error = %other, "Failed to create user"),
                }
                AuthError::from(e)
            })?;

        info!(user_id = %user_id, "User created");
        self.issue_token(&user_id)
    }

    /// Check credentials and return a fresh token
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        debug!(email = %email, "Login called");

        let user = match self.bounded(self.store.find_user_by_email(email)).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                self.burn_decoy_verify(password).await;
                return Err(AuthError::UserNotFound);
            }
            Err(e) => {
                error!(error = %e, "Failed to look up user");
                return Err(AuthError::from(e));
            }
        };

        // bcrypt ignores everything past 72 bytes; such a password was never
        // accepted at registration, so it cannot be the stored one.
        if password.len() > MAX_PASSWORD_BYTES {
            warn!(user_id = %user.id, "Login rejected: password over bcrypt limit");
            return Err(AuthError::InvalidCredentials);
        }

        let matches = password::verify_password(password, &user.password_hash)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user.id, "Stored password hash is unusable");
                AuthError::from(e)
            })?;

        if !matches {
            warn!(user_id = %user.id, "Login rejected: invalid credentials");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, "User logged in");
        self.issue_token(&user.id)
    }

    /// Resolve a token to its subject; never touches the store
    pub fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        self.signer.verify(token).map_err(|e| {
            debug!(reason = %e, "Token rejected");
            AuthError::from(e)
        })
    }

    /// Profile lookup by subject id
    pub async fn find_user(&self, id: &UserId) -> Result<UserRecord, AuthError> {
        self.bounded(self.store.find_user_by_id(id))
            .await
            .map_err(AuthError::from)
    }

    /// Store reachability for health checks
    pub async fn store_health(&self) -> Result<(), StoreError> {
        self.bounded(self.store.health_check()).await
    }

    /// Spend one bcrypt comparison on a throwaway hash; the outcome is ignored
    async fn burn_decoy_verify(&self, password: &str) {
        let cost = self.bcrypt_cost;
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| password::hash_password("finplan-decoy", cost))
            .await;
        match decoy {
            Ok(hash) => {
                let _ = password::verify_password(password, hash).await;
            }
            Err(e) => warn!(error = %e, "Failed to prepare decoy hash"),
        }
    }

    fn issue_token(&self, user_id: &UserId) -> Result<String, AuthError> {
        self.signer.issue(user_id).map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to sign token");
            AuthError::from(e)
        })
    }

    /// Run a store call under the configured deadline
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.store_timeout.as_secs())),
        }
    }
}
