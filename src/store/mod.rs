// Credential storage

pub mod memory;
pub mod postgres;

use crate::core::errors::StoreError;
use crate::core::models::{NewUser, UserId, UserRecord};

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Persistence of user identity records
///
/// Implementations must make `create_user` atomic with respect to the email
/// uniqueness check: of two concurrent inserts with the same email exactly
/// one succeeds and the other gets `StoreError::AlreadyExists`.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new record and return its freshly assigned id
    async fn create_user(&self, user: &NewUser) -> Result<UserId, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<UserRecord, StoreError>;

    async fn find_user_by_id(&self, id: &UserId) -> Result<UserRecord, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
