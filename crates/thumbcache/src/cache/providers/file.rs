//! # File Store
//!
//! This module implements the durable, file-per-key artifact store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::fs;
use tokio::io::{self, AsyncWriteExt};
use tracing::{debug, warn};

use crate::cache::types::{ArtifactKey, StoreResult};
use crate::error::ThumbnailError;

use super::ArtifactStore;

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    initialized: Arc<AtomicBool>,
}

impl FileStore {
    /// Create a new file store rooted at the specified directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the namespace directories if they do not exist yet
    pub async fn ensure_initialized(&self) -> io::Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        // Idempotent, so racing initializers are harmless
        fs::create_dir_all(self.root.join("original")).await?;
        fs::create_dir_all(self.root.join("derived")).await?;

        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// Get the final path for an artifact
    fn artifact_path(&self, key: &ArtifactKey) -> PathBuf {
        key.segments()
            .into_iter()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    /// Unique sibling path used while an artifact is being written.
    ///
    /// Its length does not depend on the artifact name, so any name that is
    /// a legal final file name can also be staged.
    fn staging_path(path: &Path) -> PathBuf {
        path.with_file_name(format!(".{}.tmp", uuid::Uuid::new_v4().simple()))
    }

    async fn write_staged(staging: &Path, data: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(staging).await?;
        file.write_all(data).await?;
        file.flush().await?;
        file.sync_all().await
    }
}

#[async_trait::async_trait]
impl ArtifactStore for FileStore {
    async fn exists(&self, key: &ArtifactKey) -> StoreResult<bool> {
        let path = self.artifact_path(key);
        fs::try_exists(&path)
            .await
            .map_err(|e| ThumbnailError::read_failure(key, e))
    }

    async fn get(&self, key: &ArtifactKey) -> StoreResult<Bytes> {
        let path = self.artifact_path(key);

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ThumbnailError::NotFound(key.to_string()));
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to read artifact file");
                return Err(ThumbnailError::read_failure(key, e));
            }
        };

        if data.is_empty() {
            warn!(path = ?path, "Artifact file is empty");
            return Err(ThumbnailError::read_failure(
                key,
                io::Error::new(io::ErrorKind::UnexpectedEof, "artifact file is empty"),
            ));
        }

        Ok(Bytes::from(data))
    }

    async fn put(&self, key: &ArtifactKey, data: Bytes) -> StoreResult<()> {
        self.ensure_initialized()
            .await
            .map_err(|e| ThumbnailError::write_failure(key, e))?;

        let path = self.artifact_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ThumbnailError::write_failure(key, e))?;
        }

        // Write to a private staging file, then rename over the final path.
        // Readers only ever look at the final path.
        let staging = Self::staging_path(&path);
        if let Err(e) = Self::write_staged(&staging, &data).await {
            warn!(path = ?staging, error = %e, "Failed to write staging file");
            let _ = fs::remove_file(&staging).await;
            return Err(ThumbnailError::write_failure(key, e));
        }

        if let Err(e) = fs::rename(&staging, &path).await {
            warn!(
                from = ?staging,
                to = ?path,
                error = %e,
                "Failed to rename staging file"
            );
            let _ = fs::remove_file(&staging).await;
            return Err(ThumbnailError::write_failure(key, e));
        }

        debug!(key = %key, size = data.len(), "Committed artifact to disk");
        Ok(())
    }
}
