//! # repset_core
//!
//! Core domain logic for Repset.
//!
//! Owns the session-bootstrap and profile-provisioning sequence: the
//! [`session::SessionManager`] tracks who is currently authenticated, and the
//! [`provision::ProfileProvisioner`] guarantees a profile record exists for
//! an authenticated identity. Backends (identity provider, structured store,
//! blob store, navigation) are abstract contracts implemented elsewhere.

pub mod flows;
pub mod memory;
pub mod models;
pub mod provider;
pub mod provision;
pub mod retry;
pub mod session;
pub mod store;
pub mod workouts;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
