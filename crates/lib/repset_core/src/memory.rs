//! In-memory reference backends.
//!
//! Back the collaborator contracts with plain maps: tests run against them,
//! and the server's `--memory` mode serves from them. Each backend has an
//! `unavailable` switch that simulates an outage by failing every call with
//! a transient error.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::models::{Identity, ProfileRecord};
use crate::provider::{IdentityProvider, ProviderError, SessionChange};
use crate::store::{BlobError, BlobStore, ProfileStore, StoreError};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

struct MemoryAccount {
    password: String,
    identity: Identity,
}

/// Identity provider over an in-memory account map.
///
/// Passwords are compared in the clear; this backend never persists
/// anything and exists for tests and local development only.
pub struct MemoryIdentityProvider {
    accounts: Mutex<HashMap<String, MemoryAccount>>,
    current: Mutex<Option<Identity>>,
    next_id: AtomicU64,
    tx: broadcast::Sender<SessionChange>,
    unavailable: AtomicBool,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            accounts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
            tx,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Seed an account without signing it in.
    pub fn register(&self, email: &str, password: &str) -> Identity {
        let identity = Identity::new(self.mint_id(), email);
        self.accounts.lock().expect("accounts poisoned").insert(
            email.to_string(),
            MemoryAccount {
                password: password.to_string(),
                identity: identity.clone(),
            },
        );
        identity
    }

    /// Simulate an outage: every call fails with a transient error while
    /// set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn mint_id(&self) -> String {
        format!("mem-user-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::Transient("memory provider offline".into()));
        }
        Ok(())
    }

    fn publish(&self, change: SessionChange) {
        *self.current.lock().expect("current session poisoned") = change.clone();
        // No receivers is fine; the change is still cached above.
        let _ = self.tx.send(change);
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn current_identity(&self) -> Result<Option<Identity>, ProviderError> {
        self.check_available()?;
        Ok(self.current.lock().expect("current session poisoned").clone())
    }

    fn changes(&self) -> broadcast::Receiver<SessionChange> {
        self.tx.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        self.check_available()?;
        let identity = {
            let accounts = self.accounts.lock().expect("accounts poisoned");
            let account = accounts.get(email).ok_or(ProviderError::InvalidCredentials)?;
            if account.password != password {
                return Err(ProviderError::InvalidCredentials);
            }
            account.identity.clone()
        };
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        self.check_available()?;
        if email.is_empty() || !email.contains('@') {
            return Err(ProviderError::Validation("invalid email address".into()));
        }
        let identity = {
            let mut accounts = self.accounts.lock().expect("accounts poisoned");
            if accounts.contains_key(email) {
                return Err(ProviderError::EmailTaken);
            }
            let identity = Identity::new(self.mint_id(), email);
            accounts.insert(
                email.to_string(),
                MemoryAccount {
                    password: password.to_string(),
                    identity: identity.clone(),
                },
            );
            identity
        };
        // Sign-up establishes a session, matching the real provider.
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.check_available()?;
        self.publish(None);
        Ok(())
    }
}

/// Profile rows in a map keyed by subject id.
pub struct MemoryProfileStore {
    rows: Mutex<HashMap<String, ProfileRecord>>,
    unavailable: AtomicBool,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.lock().expect("profile rows poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Transient("memory store offline".into()));
        }
        Ok(())
    }
}

impl Default for MemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn read_one(&self, id: &str) -> Result<Option<ProfileRecord>, StoreError> {
        self.check_available()?;
        Ok(self.rows.lock().expect("profile rows poisoned").get(id).cloned())
    }

    async fn insert(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        self.check_available()?;
        let mut rows = self.rows.lock().expect("profile rows poisoned");
        if rows.contains_key(&record.id) {
            return Err(StoreError::Conflict);
        }
        rows.insert(record.id.clone(), record.clone());
        Ok(())
    }
}

/// Blob assets in a map keyed by storage key.
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    public_base: Option<String>,
    unavailable: AtomicBool,
}

impl MemoryBlobStore {
    /// A store with no public address resolution; `public_address` always
    /// reports absent.
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            public_base: None,
            unavailable: AtomicBool::new(false),
        }
    }

    /// A store whose keys resolve under `base` (e.g. `http://host/storage`).
    pub fn with_public_base(base: impl Into<String>) -> Self {
        let mut store = Self::new();
        store.public_base = Some(base.into());
        store
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().expect("blobs poisoned").contains_key(key)
    }

    fn check_available(&self) -> Result<(), BlobError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BlobError::Transient("memory blob store offline".into()));
        }
        Ok(())
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
        self.check_available()?;
        self.blobs
            .lock()
            .expect("blobs poisoned")
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn public_address(&self, key: &str) -> Result<Option<String>, BlobError> {
        self.check_available()?;
        Ok(self
            .public_base
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), key)))
    }

    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        self.check_available()?;
        Ok(self.blobs.lock().expect("blobs poisoned").get(key).cloned())
    }
}
