//! # Tiered Store
//!
//! Coordinates an optional memory tier in front of the durable file store.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io;
use tracing::debug;

use crate::cache::providers::file::FileStore;
use crate::cache::providers::memory::MemoryStore;
use crate::cache::providers::provider::ArtifactStore;
use crate::cache::types::{ArtifactKey, CacheConfig, StoreResult};

/// Store handling both memory and file tiers.
///
/// The file store is the source of truth; the memory tier only ever holds
/// copies of bytes that are already committed to disk.
#[derive(Clone)]
pub struct TieredStore {
    memory: Option<Arc<MemoryStore>>,
    file: Arc<FileStore>,
}

impl TieredStore {
    /// Create a new tiered store with the specified configuration
    pub async fn new(config: &CacheConfig) -> io::Result<Self> {
        let file = FileStore::new(config.cache_dir.clone());
        file.ensure_initialized().await?;

        let memory = (config.max_memory_cache_size > 0)
            .then(|| Arc::new(MemoryStore::new(config.max_memory_cache_size)));

        Ok(Self {
            memory,
            file: Arc::new(file),
        })
    }

    pub fn file_store(&self) -> &FileStore {
        &self.file
    }

    pub fn has_memory_tier(&self) -> bool {
        self.memory.is_some()
    }
}

#[async_trait::async_trait]
impl ArtifactStore for TieredStore {
    async fn exists(&self, key: &ArtifactKey) -> StoreResult<bool> {
        if let Some(memory) = &self.memory {
            if memory.exists(key).await? {
                return Ok(true);
            }
        }

        self.file.exists(key).await
    }

    async fn get(&self, key: &ArtifactKey) -> StoreResult<Bytes> {
        if let Some(memory) = &self.memory {
            if let Ok(data) = memory.get(key).await {
                return Ok(data);
            }
        }

        let data = self.file.get(key).await?;

        if let Some(memory) = &self.memory {
            // Keep it hot for the next request
            memory.put(key, data.clone()).await?;
            debug!(key = %key, "Promoted artifact to memory tier");
        }

        Ok(data)
    }

    async fn put(&self, key: &ArtifactKey, data: Bytes) -> StoreResult<()> {
        // Disk first: the memory tier must never hold uncommitted bytes
        self.file.put(key, data.clone()).await?;

        if let Some(memory) = &self.memory {
            memory.put(key, data).await?;
        }

        Ok(())
    }
}
