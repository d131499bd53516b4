//! Structured-store and blob-store contracts.
//!
//! Persistence is delegated entirely to these collaborators; the core owns
//! no wire format or file layout. Implementations normalize their backend's
//! error shapes into the fixed taxonomy here before anything else inspects
//! them.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ProfileRecord;

/// Errors from the structured store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A row with the same key already exists.
    #[error("Duplicate key")]
    Conflict,

    /// The caller's session is missing or no longer accepted. Not
    /// retryable; only a fresh sign-in can help.
    #[error("Not signed in")]
    Unauthenticated,

    /// Network or backend failure; safe to retry.
    #[error("Store unavailable: {0}")]
    Transient(String),
}

/// Errors from the blob store.
#[derive(Debug, Clone, Error)]
pub enum BlobError {
    /// The caller's session is missing or no longer accepted.
    #[error("Not signed in")]
    Unauthenticated,

    #[error("Blob store unavailable: {0}")]
    Transient(String),
}

/// Row-level access to the `profiles` table.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read a row by primary key. Absence is not an error.
    async fn read_one(&self, id: &str) -> Result<Option<ProfileRecord>, StoreError>;

    /// Insert a new row. A duplicate primary key reports
    /// [`StoreError::Conflict`] rather than overwriting.
    async fn insert(&self, record: &ProfileRecord) -> Result<(), StoreError>;
}

/// Binary asset storage with upsert semantics.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, overwriting any existing asset.
    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError>;

    /// Resolve a storage key to a publicly fetchable address, if the
    /// backend exposes one.
    async fn public_address(&self, key: &str) -> Result<Option<String>, BlobError>;

    /// Read an asset back. Used by serving surfaces, not by provisioning.
    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError>;
}
