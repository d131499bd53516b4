//! Credential records and the store contract behind the auth endpoints.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// One registered account. The bcrypt hash never leaves this crate.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl AccountRecord {
    /// A fresh record with a random id, created now.
    pub fn new(email: &str, password_hash: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Email already registered")]
    EmailTaken,

    #[error("Account store unavailable: {0}")]
    Transient(String),
}

/// Storage contract for accounts. Backed by PostgreSQL in production and by
/// a map in tests and memory mode.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, AccountError>;

    /// Insert a new account. Fails with [`AccountError::EmailTaken`] when the
    /// email is already registered.
    async fn insert(&self, account: &AccountRecord) -> Result<(), AccountError>;
}

/// Accounts in a map keyed by email.
pub struct MemoryAccountStore {
    rows: Mutex<HashMap<String, AccountRecord>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, AccountError> {
        Ok(self.rows.lock().expect("accounts poisoned").get(email).cloned())
    }

    async fn insert(&self, account: &AccountRecord) -> Result<(), AccountError> {
        let mut rows = self.rows.lock().expect("accounts poisoned");
        if rows.contains_key(&account.email) {
            return Err(AccountError::EmailTaken);
        }
        rows.insert(account.email.clone(), account.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let store = MemoryAccountStore::new();
        let record = AccountRecord::new("a@b.com", "hash");
        store.insert(&record).await.expect("insert");

        let found = store.find_by_email("a@b.com").await.expect("find");
        assert_eq!(found.map(|r| r.id), Some(record.id));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryAccountStore::new();
        store
            .insert(&AccountRecord::new("a@b.com", "h1"))
            .await
            .expect("insert");
        let err = store
            .insert(&AccountRecord::new("a@b.com", "h2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken));
    }
}
