// PostgreSQL-backed credential store

use crate::core::errors::StoreError;
use crate::core::models::{NewUser, UserId, UserRecord};
use crate::store::CredentialStore;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

const MIGRATION: &str = r#"
CREATE EXTENSION IF NOT EXISTS "pgcrypto";
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TIMESTAMPTZ DEFAULT now()
)"#;

/// Database row structure for user lookup
#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password: String,
    name: String,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: UserId::from_uuid(row.id),
            email: row.email,
            password_hash: row.password,
            name: row.name,
        }
    }
}

/// Credential store on a `users` table with a UNIQUE email column
///
/// Uniqueness is left to the database constraint; no application lock.
pub struct PgCredentialStore {
    db_pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Create the `users` table if it does not exist
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(MIGRATION)
            .execute(&self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Credential store migration failed");
                map_sqlx_error(e)
            })?;
        info!("Credential store migration applied");
        Ok(())
    }
}

/// Translate driver errors into store errors
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::AlreadyExists,
        other => StoreError::Backend(other.to_string()),
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, user: &NewUser) -> Result<UserId, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (email, password, name) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .fetch_one(&self.db_pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(UserId::from_uuid(id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<UserRecord, StoreError> {
        sqlx::query_as::<_, UserRow>("SELECT id, email, password, name FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.db_pool)
            .await
            .map(UserRecord::from)
            .map_err(map_sqlx_error)
    }

    async fn find_user_by_id(&self, id: &UserId) -> Result<UserRecord, StoreError> {
        sqlx::query_as::<_, UserRow>("SELECT id, email, password, name FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_one(&self.db_pool)
            .await
            .map(UserRecord::from)
            .map_err(map_sqlx_error)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.db_pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}
