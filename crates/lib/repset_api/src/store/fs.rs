//! Filesystem-backed blob store.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use repset_core::store::{BlobError, BlobStore};

/// Blobs as files under a root directory, keyed by relative path.
pub struct FsBlobStore {
    root: PathBuf,
    public_base: String,
}

impl FsBlobStore {
    /// Store under `root`, resolving keys publicly under
    /// `{public_base}/storage/{key}`.
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    /// Resolve a key to a path inside the root. Rejects keys that would
    /// escape it.
    fn safe_path(&self, key: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(key);
        let all_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !all_normal {
            return Err(BlobError::Transient(format!("invalid storage key: {key}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
        let path = self.safe_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobError::Transient(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| BlobError::Transient(e.to_string()))
    }

    async fn public_address(&self, key: &str) -> Result<Option<String>, BlobError> {
        self.safe_path(key)?;
        Ok(Some(format!(
            "{}/storage/{key}",
            self.public_base.trim_end_matches('/')
        )))
    }

    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let path = self.safe_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BlobError::Transient(e.to_string())),
        }
    }
}
