//! # repset_api_client
//!
//! HTTP client for the Repset API. [`ApiClient`] implements the
//! `repset_core` collaborator contracts (`IdentityProvider`, `ProfileStore`,
//! `BlobStore`) over the wire, so the session manager and provisioner run
//! unchanged against a remote server.

pub mod client;
pub mod session_file;

pub use client::ApiClient;
