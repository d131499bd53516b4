//! PostgreSQL-backed stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::error::ErrorKind;
use uuid::Uuid;

use repset_core::models::ProfileRecord;
use repset_core::store::{ProfileStore, StoreError};

use crate::accounts::{AccountError, AccountRecord, AccountStore};

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.kind() == ErrorKind::UniqueViolation)
}

/// Accounts in the `accounts` table.
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, AccountError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, DateTime<Utc>)>(
            "SELECT id, email, password_hash, created_at FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountError::Transient(e.to_string()))?;

        Ok(row.map(|(id, email, password_hash, created_at)| AccountRecord {
            id,
            email,
            password_hash,
            created_at,
        }))
    }

    async fn insert(&self, account: &AccountRecord) -> Result<(), AccountError> {
        sqlx::query(
            "INSERT INTO accounts (id, email, password_hash, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AccountError::EmailTaken
            } else {
                AccountError::Transient(e.to_string())
            }
        })?;
        Ok(())
    }
}

/// Profile rows in the `profiles` table.
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn read_one(&self, id: &str) -> Result<Option<ProfileRecord>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, Option<String>)>(
            "SELECT id, nickname, avatar_address FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(e.to_string()))?;

        Ok(row.map(|(id, nickname, avatar_address)| ProfileRecord {
            id,
            nickname,
            avatar_address,
        }))
    }

    async fn insert(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO profiles (id, nickname, avatar_address) VALUES ($1, $2, $3)")
            .bind(&record.id)
            .bind(&record.nickname)
            .bind(&record.avatar_address)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict
                } else {
                    StoreError::Transient(e.to_string())
                }
            })?;
        Ok(())
    }
}
