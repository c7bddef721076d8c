use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{NewUser, UserRecord};

/// External collaborator boundary: resolves a verified principal name to a
/// user record. Ownership of accounts lives here, not in the messaging core.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_principal(&self, username: &str) -> Result<Option<UserRecord>>;
    async fn insert(&self, user: NewUser) -> Result<UserRecord>;
}

pub struct PgIdentityStore {
    db: Pool<Postgres>,
}

impl PgIdentityStore {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_principal(&self, username: &str) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;
        Ok(record)
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord> {
        let id = Uuid::new_v4();
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, username, password_hash, profession, address, pincode, \
             contact_hash, email, latitude, longitude) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING *",
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.profession)
        .bind(&user.address)
        .bind(&user.pincode)
        .bind(&user.contact_hash)
        .bind(&user.email)
        .bind(user.latitude)
        .bind(user.longitude)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation())
            {
                AppError::Conflict("Username already exists".into())
            } else {
                AppError::Database(e)
            }
        })?;
        Ok(record)
    }
}
