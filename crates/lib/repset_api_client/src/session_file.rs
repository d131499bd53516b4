//! Session persistence: the access token and identity survive restarts as a
//! JSON file under the user's data directory.

use std::path::PathBuf;

use repset_api::models::IdentityBody;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What survives a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub access_token: String,
    pub identity: IdentityBody,
}

/// Default location: `<data dir>/repset/session.json`.
pub fn default_session_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("repset")
        .join("session.json")
}

/// Load a persisted session. Absence and corruption both read as "no
/// session"; a corrupt file is logged and ignored.
pub fn load(path: &PathBuf) -> Option<PersistedSession> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring corrupt session file");
            None
        }
    }
}

/// Persist a session, best effort. A failed write only costs the next
/// restart its session.
pub fn save(path: &PathBuf, session: &PersistedSession) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match serde_json::to_string_pretty(session) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                warn!(path = %path.display(), error = %e, "failed to persist session");
            }
        }
        Err(e) => warn!(error = %e, "failed to encode session"),
    }
}

/// Remove the persisted session, best effort.
pub fn clear(path: &PathBuf) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "failed to remove session file");
    }
}
