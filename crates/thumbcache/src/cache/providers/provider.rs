//! # Artifact Store
//!
//! This module defines the store trait that all artifact backends must follow.

use async_trait::async_trait;
use bytes::Bytes;

use crate::cache::types::{ArtifactKey, StoreResult};

/// A byte-blob store addressed by [`ArtifactKey`].
///
/// `put` must be atomic with respect to `exists` and `get`: once `exists`
/// reports true, `get` returns the complete bytes, never a prefix of them.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Check if a fully committed artifact exists for the given key
    async fn exists(&self, key: &ArtifactKey) -> StoreResult<bool>;

    /// Read an artifact, failing with `NotFound` if it is absent
    async fn get(&self, key: &ArtifactKey) -> StoreResult<Bytes>;

    /// Commit an artifact
    async fn put(&self, key: &ArtifactKey, data: Bytes) -> StoreResult<()>;
}
