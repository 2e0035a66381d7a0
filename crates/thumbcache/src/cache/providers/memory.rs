//! # Memory Store
//!
//! This module provides a size-bounded in-memory artifact tier using Moka caching.

use bytes::Bytes;
use moka::future::Cache as MokaCache;
use tracing::{debug, warn};

use crate::cache::providers::ArtifactStore;
use crate::cache::types::{ArtifactKey, StoreResult};
use crate::error::ThumbnailError;

/// In-memory artifact store, weighted by artifact size.
///
/// Entries may be evicted under memory pressure, so this store is only used
/// as a tier in front of a durable one.
#[derive(Clone)]
pub struct MemoryStore {
    cache: MokaCache<ArtifactKey, Bytes>,
    max_size: u64,
}

impl MemoryStore {
    /// Create a new memory store with the specified size limit
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            .weigher(|_k, v: &Bytes| v.len().try_into().unwrap_or(u32::MAX))
            .max_capacity(max_size_bytes)
            .build();

        debug!(max_size = max_size_bytes, "Memory store created");

        Self {
            cache,
            max_size: max_size_bytes,
        }
    }
}

#[async_trait::async_trait]
impl ArtifactStore for MemoryStore {
    async fn exists(&self, key: &ArtifactKey) -> StoreResult<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn get(&self, key: &ArtifactKey) -> StoreResult<Bytes> {
        self.cache
            .get(key)
            .await
            .ok_or_else(|| ThumbnailError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &ArtifactKey, data: Bytes) -> StoreResult<()> {
        if data.len() as u64 > self.max_size {
            warn!(
                key = %key,
                size = data.len(),
                max_size = self.max_size,
                "Artifact too large for memory store, skipping"
            );
            return Ok(());
        }

        self.cache.insert(key.clone(), data).await;
        Ok(())
    }
}
