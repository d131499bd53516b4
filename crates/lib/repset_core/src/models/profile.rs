use serde::{Deserialize, Serialize};

/// A profile row as stored by the structured store.
///
/// `avatar_address` may hold either a fully-resolved URL or a bare storage
/// key; normalization happens when the row is read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Primary key, 1:1 with the owning identity. Immutable.
    pub id: String,
    pub nickname: String,
    pub avatar_address: Option<String>,
}

/// A normalized profile ready for display: the avatar address, when present,
/// is publicly fetchable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub nickname: String,
    pub avatar_address: Option<String>,
}

/// Optional inputs supplied only during sign-up flows.
#[derive(Debug, Clone, Default)]
pub struct NewProfileHints {
    pub nickname: Option<String>,
    pub avatar: Option<AvatarUpload>,
}

/// A binary avatar asset picked by the user.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    /// Original file name; only the extension is kept for the storage key.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AvatarUpload {
    /// The file extension, if the name carries one.
    pub fn extension(&self) -> Option<&str> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext)
    }
}
