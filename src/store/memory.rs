// In-memory credential store for development and tests

use crate::core::errors::StoreError;
use crate::core::models::{NewUser, UserId, UserRecord};
use crate::store::CredentialStore;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    by_id: HashMap<UserId, UserRecord>,
    email_index: HashMap<String, UserId>,
}

/// Process-local store; contents are lost on restart
///
/// Both indexes sit behind one lock so the uniqueness check and the insert
/// happen as a single step.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create_user(&self, user: &NewUser) -> Result<UserId, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.email_index.contains_key(&user.email) {
            return Err(StoreError::AlreadyExists);
        }

        let id = UserId::new();
        tables.email_index.insert(user.email.clone(), id);
        tables.by_id.insert(
            id,
            UserRecord {
                id,
                email: user.email.clone(),
                password_hash: user.password_hash.clone(),
                name: user.name.clone(),
            },
        );
        Ok(id)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<UserRecord, StoreError> {
        let tables = self.tables.read().await;
        tables
            .email_index
            .get(email)
            .and_then(|id| tables.by_id.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_user_by_id(&self, id: &UserId) -> Result<UserRecord, StoreError> {
        self.tables
            .read()
            .await
            .by_id
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
