use serde::{Deserialize, Serialize};

/// An authenticated subject as reported by the identity provider.
///
/// The `id` is an opaque reference owned by the provider; this crate never
/// mints or reassigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }

    /// The part of the email address before `@`, if any.
    pub fn email_local_part(&self) -> Option<&str> {
        self.email
            .split('@')
            .next()
            .filter(|part| !part.is_empty())
    }
}

/// Immutable view of the current session state.
///
/// Invariant: `is_loading == false` means the identity has been determined
/// at least once (present or explicitly absent). Consumers must not branch
/// on `identity` while `is_loading` is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub is_loading: bool,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        !self.is_loading && self.identity.is_some()
    }
}
