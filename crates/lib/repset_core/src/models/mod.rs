//! Domain models.
//!
//! These are internal domain models, distinct from the API wire models
//! (which carry `#[serde(rename)]` attributes for the HTTP surface).

mod identity;
mod profile;

pub use identity::{Identity, SessionSnapshot};
pub use profile::{AvatarUpload, NewProfileHints, Profile, ProfileRecord};
