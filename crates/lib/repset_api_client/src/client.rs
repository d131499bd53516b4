//! The HTTP client and its collaborator-contract implementations.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::broadcast;
use tracing::debug;

use repset_api::models::{
    ErrorResponse, LoginRequest, SessionResponse, SignupRequest, TokenResponse,
};
use repset_core::models::{Identity, ProfileRecord};
use repset_core::provider::{IdentityProvider, ProviderError, SessionChange};
use repset_core::store::{BlobError, BlobStore, ProfileStore, StoreError};

use crate::session_file::{self, PersistedSession};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Client for one Repset API server.
///
/// Holds the signed-in session (token + identity) and optionally persists
/// it to disk so a restart resumes where it left off. The mutex is never
/// held across an await.
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    session: Mutex<Option<PersistedSession>>,
    tx: broadcast::Sender<SessionChange>,
    persist_path: Option<PathBuf>,
}

impl ApiClient {
    /// A client with no on-disk persistence.
    pub fn new(base: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            http: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            session: Mutex::new(None),
            tx,
            persist_path: None,
        }
    }

    /// A client that persists its session to `path`, loading any session
    /// already there.
    pub fn with_persistence(base: impl Into<String>, path: PathBuf) -> Self {
        let mut client = Self::new(base);
        *client.session.get_mut().expect("session poisoned") = session_file::load(&path);
        client.persist_path = Some(path);
        client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn current_session(&self) -> Option<PersistedSession> {
        self.session.lock().expect("session poisoned").clone()
    }

    /// Replace the cached session and mirror the change to disk.
    fn set_session(&self, session: Option<PersistedSession>) {
        *self.session.lock().expect("session poisoned") = session.clone();
        if let Some(path) = &self.persist_path {
            match &session {
                Some(s) => session_file::save(path, s),
                None => session_file::clear(path),
            }
        }
    }

    fn publish(&self, change: SessionChange) {
        // No receivers is fine.
        let _ = self.tx.send(change);
    }

    fn adopt_token_response(&self, resp: TokenResponse) -> Identity {
        let identity: Identity = resp.identity.clone().into();
        self.set_session(Some(PersistedSession {
            access_token: resp.access_token,
            identity: resp.identity,
        }));
        self.publish(Some(identity.clone()));
        identity
    }

    /// Decode the standard error body, falling back to the raw status.
    async fn error_message(resp: reqwest::Response) -> String {
        let status = resp.status();
        match resp.json::<ErrorResponse>().await {
            Ok(body) => body.message,
            Err(_) => format!("unexpected status {status}"),
        }
    }
}

fn transient_provider(e: reqwest::Error) -> ProviderError {
    ProviderError::Transient(e.to_string())
}

fn transient_store(e: reqwest::Error) -> StoreError {
    StoreError::Transient(e.to_string())
}

fn transient_blob(e: reqwest::Error) -> BlobError {
    BlobError::Transient(e.to_string())
}

/// Strip the `avatars/` prefix a storage key carries into the path segment
/// the storage routes expect.
fn avatar_file(key: &str) -> &str {
    key.strip_prefix("avatars/").unwrap_or(key)
}

#[async_trait]
impl IdentityProvider for ApiClient {
    async fn current_identity(&self) -> Result<Option<Identity>, ProviderError> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };

        let resp = self
            .http
            .get(self.url("/auth/session"))
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(transient_provider)?;

        match resp.status() {
            StatusCode::OK => {
                let body: SessionResponse =
                    resp.json().await.map_err(transient_provider)?;
                Ok(Some(body.identity.into()))
            }
            // Expired or revoked token: the persisted session is dead.
            StatusCode::UNAUTHORIZED => {
                debug!("persisted session no longer valid, dropping it");
                self.set_session(None);
                Ok(None)
            }
            _ => Err(ProviderError::Transient(Self::error_message(resp).await)),
        }
    }

    fn changes(&self) -> broadcast::Receiver<SessionChange> {
        self.tx.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(transient_provider)?;

        match resp.status() {
            StatusCode::OK => {
                let body: TokenResponse = resp.json().await.map_err(transient_provider)?;
                Ok(self.adopt_token_response(body))
            }
            StatusCode::UNAUTHORIZED => Err(ProviderError::InvalidCredentials),
            StatusCode::BAD_REQUEST => {
                Err(ProviderError::Validation(Self::error_message(resp).await))
            }
            _ => Err(ProviderError::Transient(Self::error_message(resp).await)),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let resp = self
            .http
            .post(self.url("/auth/signup"))
            .json(&SignupRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(transient_provider)?;

        match resp.status() {
            StatusCode::OK => {
                let body: TokenResponse = resp.json().await.map_err(transient_provider)?;
                Ok(self.adopt_token_response(body))
            }
            StatusCode::CONFLICT => Err(ProviderError::EmailTaken),
            StatusCode::BAD_REQUEST => {
                Err(ProviderError::Validation(Self::error_message(resp).await))
            }
            _ => Err(ProviderError::Transient(Self::error_message(resp).await)),
        }
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Some(session) = self.current_session() {
            let resp = self
                .http
                .post(self.url("/auth/logout"))
                .bearer_auth(&session.access_token)
                .send()
                .await
                .map_err(transient_provider)?;

            // A token the server no longer accepts is as signed-out as it
            // gets; only backend failures keep the session.
            if !resp.status().is_success() && resp.status() != StatusCode::UNAUTHORIZED {
                return Err(ProviderError::Transient(Self::error_message(resp).await));
            }
        }
        self.set_session(None);
        self.publish(None);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for ApiClient {
    async fn read_one(&self, id: &str) -> Result<Option<ProfileRecord>, StoreError> {
        let Some(session) = self.current_session() else {
            return Err(StoreError::Unauthenticated);
        };

        let resp = self
            .http
            .get(self.url(&format!("/rest/profiles/{id}")))
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(transient_store)?;

        match resp.status() {
            StatusCode::OK => {
                let record: ProfileRecord = resp.json().await.map_err(transient_store)?;
                Ok(Some(record))
            }
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED => Err(StoreError::Unauthenticated),
            _ => Err(StoreError::Transient(Self::error_message(resp).await)),
        }
    }

    async fn insert(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        let Some(session) = self.current_session() else {
            return Err(StoreError::Unauthenticated);
        };

        let resp = self
            .http
            .post(self.url("/rest/profiles"))
            .bearer_auth(&session.access_token)
            .json(record)
            .send()
            .await
            .map_err(transient_store)?;

        match resp.status() {
            StatusCode::CREATED | StatusCode::OK => Ok(()),
            StatusCode::CONFLICT => Err(StoreError::Conflict),
            StatusCode::UNAUTHORIZED => Err(StoreError::Unauthenticated),
            _ => Err(StoreError::Transient(Self::error_message(resp).await)),
        }
    }
}

#[async_trait]
impl BlobStore for ApiClient {
    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
        let Some(session) = self.current_session() else {
            return Err(BlobError::Unauthenticated);
        };

        let resp = self
            .http
            .put(self.url(&format!("/storage/avatars/{}", avatar_file(key))))
            .bearer_auth(&session.access_token)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(transient_blob)?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::UNAUTHORIZED {
            Err(BlobError::Unauthenticated)
        } else {
            Err(BlobError::Transient(Self::error_message(resp).await))
        }
    }

    async fn public_address(&self, key: &str) -> Result<Option<String>, BlobError> {
        // Addresses follow the server's storage layout; no round trip needed.
        Ok(Some(format!("{}/storage/{key}", self.base)))
    }

    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let resp = self
            .http
            .get(self.url(&format!("/storage/avatars/{}", avatar_file(key))))
            .send()
            .await
            .map_err(transient_blob)?;

        match resp.status() {
            StatusCode::OK => {
                let bytes = resp.bytes().await.map_err(transient_blob)?;
                Ok(Some(bytes.to_vec()))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(BlobError::Transient(Self::error_message(resp).await)),
        }
    }
}
