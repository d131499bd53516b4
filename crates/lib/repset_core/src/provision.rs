//! Profile provisioning.
//!
//! Given an identity, [`ProfileProvisioner::ensure_profile`] returns a
//! normalized profile, creating the row (and any requested avatar asset)
//! on the sign-up path. Concurrency safety comes from "insert, on conflict
//! re-read": at most one logical profile exists per identity even when two
//! clients provision the same subject at once.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::models::{Identity, NewProfileHints, Profile, ProfileRecord};
use crate::retry::{self, RetryPolicy};
use crate::store::{BlobError, BlobStore, ProfileStore, StoreError};

/// Nickname of last resort when the email has no usable local part.
const FALLBACK_NICKNAME: &str = "User";

/// Typed provisioning failures. Callers branch explicitly; nothing here is
/// thrown.
#[derive(Debug, Clone, Error)]
pub enum ProvisionError {
    /// The identity is unusable (missing or empty subject id).
    #[error("Invalid identity: {0}")]
    InvalidInput(String),

    /// No row exists and no sign-up hints were supplied. The caller must
    /// not fabricate a profile outside the sign-up path.
    #[error("No profile exists for this identity")]
    NotFound,

    /// The avatar blob write failed; no profile row was created.
    #[error("Avatar upload failed: {0}")]
    AvatarUploadFailed(String),

    /// The backing session is missing or no longer accepted. Retrying
    /// cannot help; the caller must sign in again.
    #[error("Not signed in")]
    Unauthenticated,

    /// Network or backend failure; safe to retry the whole call.
    #[error("Backend unavailable: {0}")]
    Transient(String),
}

/// Tunables for provisioning.
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Address used when no avatar was uploaded or the uploaded key has no
    /// public resolution.
    pub default_avatar_address: String,
    /// Retry budget for transient store failures.
    pub retry: RetryPolicy,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            default_avatar_address: "/default-avatar.png".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Ensures a profile record exists for an authenticated identity.
pub struct ProfileProvisioner {
    profiles: Arc<dyn ProfileStore>,
    blobs: Arc<dyn BlobStore>,
    config: ProvisionerConfig,
}

impl ProfileProvisioner {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        blobs: Arc<dyn BlobStore>,
        config: ProvisionerConfig,
    ) -> Self {
        Self {
            profiles,
            blobs,
            config,
        }
    }

    /// Return the profile for `identity`, creating it when `hints` are
    /// supplied on a sign-up flow.
    ///
    /// Reads are side-effect free; a call that reaches the creation path
    /// performs at most one blob write and one row insert.
    pub async fn ensure_profile(
        &self,
        identity: &Identity,
        hints: Option<NewProfileHints>,
    ) -> Result<Profile, ProvisionError> {
        if identity.id.trim().is_empty() {
            return Err(ProvisionError::InvalidInput(
                "identity has an empty subject id".into(),
            ));
        }

        if let Some(record) = self.read_row(&identity.id).await? {
            return Ok(self.normalize(record).await);
        }

        let Some(hints) = hints else {
            return Err(ProvisionError::NotFound);
        };

        // Upload before insert so a failed write cannot leave a profile
        // pointing at a missing asset. The whole call aborts instead.
        let mut avatar_address = None;
        if let Some(upload) = &hints.avatar {
            let key = avatar_key(&identity.id, upload.extension());
            self.blobs
                .upload(&key, &upload.bytes)
                .await
                .map_err(|err| match err {
                    BlobError::Unauthenticated => ProvisionError::Unauthenticated,
                    other => ProvisionError::AvatarUploadFailed(other.to_string()),
                })?;
            avatar_address = match self.blobs.public_address(&key).await {
                Ok(address) => address,
                Err(err) => {
                    debug!(error = %err, key, "avatar address resolution failed after upload");
                    None
                }
            };
        }
        let avatar_address =
            avatar_address.unwrap_or_else(|| self.config.default_avatar_address.clone());

        let record = ProfileRecord {
            id: identity.id.clone(),
            nickname: derive_nickname(hints.nickname.as_deref(), identity),
            avatar_address: Some(avatar_address),
        };

        match self.insert_row(&record).await {
            Ok(()) => Ok(self.normalize(record).await),
            Err(StoreError::Conflict) => {
                // Concurrent first provisioning: the other writer's row is
                // authoritative, so reconcile by re-reading it.
                debug!(id = %identity.id, "profile insert conflicted, re-reading existing row");
                match self.read_row(&identity.id).await? {
                    Some(existing) => Ok(self.normalize(existing).await),
                    None => Err(ProvisionError::Transient(
                        "profile row vanished after insert conflict".into(),
                    )),
                }
            }
            Err(StoreError::Unauthenticated) => Err(ProvisionError::Unauthenticated),
            Err(StoreError::Transient(message)) => Err(ProvisionError::Transient(message)),
        }
    }

    async fn read_row(&self, id: &str) -> Result<Option<ProfileRecord>, ProvisionError> {
        retry::with_backoff(
            self.config.retry,
            |err| matches!(err, StoreError::Transient(_)),
            || self.profiles.read_one(id),
        )
        .await
        .map_err(|err| match err {
            StoreError::Unauthenticated => ProvisionError::Unauthenticated,
            other => ProvisionError::Transient(other.to_string()),
        })
    }

    async fn insert_row(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        retry::with_backoff(
            self.config.retry,
            |err| matches!(err, StoreError::Transient(_)),
            || self.profiles.insert(record),
        )
        .await
    }

    /// Resolve a stored row into its display form. Avatar resolution is
    /// best-effort: a key without a public address downgrades to no avatar
    /// rather than failing the read.
    async fn normalize(&self, record: ProfileRecord) -> Profile {
        let avatar_address = match record.avatar_address {
            None => None,
            Some(address) if is_resolved_address(&address) => Some(address),
            Some(key) => match self.blobs.public_address(&key).await {
                Ok(Some(address)) => Some(address),
                Ok(None) => None,
                Err(err) => {
                    debug!(error = %err, key, "avatar address resolution failed, dropping avatar");
                    None
                }
            },
        };
        Profile {
            id: record.id,
            nickname: record.nickname,
            avatar_address,
        }
    }
}

/// Storage key for an identity's single avatar asset.
fn avatar_key(id: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("avatars/{id}.{ext}"),
        None => format!("avatars/{id}"),
    }
}

/// Nickname precedence: non-empty hint, email local part, fixed fallback.
fn derive_nickname(hint: Option<&str>, identity: &Identity) -> String {
    if let Some(nickname) = hint {
        let trimmed = nickname.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    identity
        .email_local_part()
        .unwrap_or(FALLBACK_NICKNAME)
        .to_string()
}

/// Addresses with a scheme or a site-relative path are already fetchable;
/// everything else is treated as a storage key.
fn is_resolved_address(address: &str) -> bool {
    address.contains("://") || address.starts_with('/')
}
