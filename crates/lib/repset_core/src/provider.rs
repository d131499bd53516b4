//! Identity provider contract.
//!
//! The provider is the external service that validates credentials and owns
//! every [`Identity`]. This crate only consumes it: the session manager
//! caches the latest identity and the flows call the sign-in/sign-up
//! operations.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::models::Identity;

/// Errors reported by an identity provider, normalized at the boundary.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Wrong email or password. Deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Validation error: {0}")]
    Validation(String),

    /// Network or backend failure; safe to retry.
    #[error("Provider unavailable: {0}")]
    Transient(String),
}

/// A change event: the new identity, or `None` after sign-out.
pub type SessionChange = Option<Identity>;

/// Contract for the external identity provider.
///
/// `changes` hands out an independent receiver per call; events are
/// delivered in arrival order and applied last-write-wins by consumers.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The identity for an existing session, if one survives restart.
    async fn current_identity(&self) -> Result<Option<Identity>, ProviderError>;

    /// Subscribe to sign-in / sign-out / refresh events.
    fn changes(&self) -> broadcast::Receiver<SessionChange>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    /// Invalidate the current session. Succeeds when no session exists.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}
