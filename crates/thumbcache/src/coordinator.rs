//! # Cache Coordinator
//!
//! Resolves a thumbnail request against the cache:
//!
//! 1. validate the request (see [`ThumbnailRequest::from_params`])
//! 2. serve the derived artifact directly if it is already committed
//! 3. otherwise make sure the original is stored, downloading it once
//! 4. label the original with its native dimensions from the image header
//! 5. resize, commit the derived artifact and return its bytes
//!
//! Production of any given key happens in at most one task at a time.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::cache::{ArtifactKey, ArtifactState, ArtifactStore, CacheIndex, Dimensions};
use crate::error::ThumbnailError;
use crate::fetcher::Fetcher;
use crate::inflight::InFlight;
use crate::request::ThumbnailRequest;
use crate::resizer::Resizer;
use crate::source::SourceReference;

/// How a thumbnail was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the derived artifact without fetching or resizing
    DerivedHit,
    /// Produced by this request
    Produced,
    /// Awaited another request's in-flight production
    Joined,
}

#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub bytes: Bytes,
    pub outcome: Outcome,
}

impl Thumbnail {
    pub fn content_type(&self) -> &'static str {
        crate::JPEG_CONTENT_TYPE
    }
}

/// A committed original together with its native size.
#[derive(Debug, Clone)]
struct StoredOriginal {
    bytes: Bytes,
    native: Dimensions,
}

/// Owns all writes to the artifact store and the cache index.
#[derive(Clone)]
pub struct CacheCoordinator {
    store: Arc<dyn ArtifactStore>,
    fetcher: Arc<dyn Fetcher>,
    resizer: Arc<dyn Resizer>,
    index: Arc<CacheIndex>,
    originals: Arc<InFlight<StoredOriginal>>,
    derived: Arc<InFlight<Bytes>>,
}

impl CacheCoordinator {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        fetcher: Arc<dyn Fetcher>,
        resizer: Arc<dyn Resizer>,
    ) -> Self {
        Self {
            store,
            fetcher,
            resizer,
            index: Arc::new(CacheIndex::new()),
            originals: Arc::new(InFlight::new()),
            derived: Arc::new(InFlight::new()),
        }
    }

    pub fn index(&self) -> &CacheIndex {
        &self.index
    }

    /// Current lifecycle state of an artifact, if it is known at all.
    pub fn artifact_state(&self, key: &ArtifactKey) -> Option<ArtifactState> {
        let in_flight = match key {
            ArtifactKey::Original { .. } => self.originals.contains(key),
            ArtifactKey::Derived { .. } => self.derived.contains(key),
        };
        if in_flight && !self.index.contains(key) {
            return Some(ArtifactState::Downloading);
        }
        self.index.state(key)
    }

    /// Validate raw parameters and resolve them.
    pub async fn resolve_params(
        &self,
        url: Option<&str>,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Result<Thumbnail, ThumbnailError> {
        let request = ThumbnailRequest::from_params(url, width, height)?;
        self.resolve(&request).await
    }

    pub async fn resolve(&self, request: &ThumbnailRequest) -> Result<Thumbnail, ThumbnailError> {
        let key = request.derived_key();

        if let Some(bytes) = self.lookup_derived(&key, request.dims).await? {
            debug!(key = %key, "Derived artifact hit");
            return Ok(Thumbnail {
                bytes,
                outcome: Outcome::DerivedHit,
            });
        }

        let this = self.clone();
        let task_request = request.clone();
        let (result, joined) = self
            .derived
            .run(key, async move { this.produce_derived(task_request).await })
            .await;

        Ok(Thumbnail {
            bytes: result?,
            outcome: if joined {
                Outcome::Joined
            } else {
                Outcome::Produced
            },
        })
    }

    /// Committed derived bytes, if any. An indexed artifact that cannot be
    /// read is an error, never a miss.
    async fn lookup_derived(
        &self,
        key: &ArtifactKey,
        dims: Dimensions,
    ) -> Result<Option<Bytes>, ThumbnailError> {
        if self.index.contains(key) {
            let bytes = self
                .store
                .get(key)
                .await
                .map_err(ThumbnailError::into_read_failure)?;
            return Ok(Some(bytes));
        }

        if self.store.exists(key).await? {
            let bytes = self
                .store
                .get(key)
                .await
                .map_err(ThumbnailError::into_read_failure)?;
            self.index.mark(key.clone(), ArtifactState::Derived(dims));
            info!(key = %key, "Adopted derived artifact from storage");
            return Ok(Some(bytes));
        }

        Ok(None)
    }

    async fn produce_derived(&self, request: ThumbnailRequest) -> Result<Bytes, ThumbnailError> {
        let key = request.derived_key();

        // Another producer may have committed between our miss and now
        if let Some(bytes) = self.lookup_derived(&key, request.dims).await? {
            return Ok(bytes);
        }

        let original = self.ensure_original(&request.source).await?;

        let resizer = self.resizer.clone();
        let source = original.bytes.clone();
        let bounds = request.dims;
        let bytes = tokio::task::spawn_blocking(move || resizer.thumbnail(&source, bounds))
            .await
            .map_err(|e| ThumbnailError::TaskFailure(e.to_string()))??;

        self.store.put(&key, bytes.clone()).await?;
        self.index.mark(key.clone(), ArtifactState::Derived(bounds));

        info!(
            key = %key,
            native = %original.native,
            size = bytes.len(),
            indexed = self.index.len(),
            "Stored thumbnail"
        );
        Ok(bytes)
    }

    async fn ensure_original(
        &self,
        source: &SourceReference,
    ) -> Result<StoredOriginal, ThumbnailError> {
        let key = ArtifactKey::original(source.base_name());

        if let Some(stored) = self.lookup_original(&key).await? {
            return Ok(stored);
        }

        let this = self.clone();
        let task_key = key.clone();
        let task_source = source.clone();
        let (result, _) = self
            .originals
            .run(key, async move {
                if let Some(stored) = this.lookup_original(&task_key).await? {
                    return Ok(stored);
                }
                this.download_original(&task_key, &task_source).await
            })
            .await;

        result
    }

    async fn lookup_original(
        &self,
        key: &ArtifactKey,
    ) -> Result<Option<StoredOriginal>, ThumbnailError> {
        if let Some(ArtifactState::Stored(native)) = self.index.state(key) {
            let bytes = self
                .store
                .get(key)
                .await
                .map_err(ThumbnailError::into_read_failure)?;
            return Ok(Some(StoredOriginal { bytes, native }));
        }

        if self.store.exists(key).await? {
            let bytes = self
                .store
                .get(key)
                .await
                .map_err(ThumbnailError::into_read_failure)?;
            let native = self.native_dimensions(bytes.clone()).await?;
            self.index.mark(key.clone(), ArtifactState::Stored(native));
            info!(key = %key, native = %native, "Adopted original from storage");
            return Ok(Some(StoredOriginal { bytes, native }));
        }

        Ok(None)
    }

    async fn download_original(
        &self,
        key: &ArtifactKey,
        source: &SourceReference,
    ) -> Result<StoredOriginal, ThumbnailError> {
        info!(url = %source, key = %key, "Downloading original");
        let bytes = self.fetcher.download(source).await?;

        // The original is labelled with its own size, never the requested one.
        // Checking the header first also keeps non-JPEG payloads out of storage.
        let native = match self.native_dimensions(bytes.clone()).await {
            Ok(native) => native,
            Err(e) => {
                warn!(url = %source, error = %e, "Downloaded original is not a readable JPEG");
                return Err(e);
            }
        };

        self.store.put(key, bytes.clone()).await?;
        self.index.mark(key.clone(), ArtifactState::Stored(native));

        info!(key = %key, native = %native, size = bytes.len(), "Stored original");
        Ok(StoredOriginal { bytes, native })
    }

    async fn native_dimensions(&self, bytes: Bytes) -> Result<Dimensions, ThumbnailError> {
        let resizer = self.resizer.clone();
        tokio::task::spawn_blocking(move || resizer.dimensions(&bytes))
            .await
            .map_err(|e| ThumbnailError::TaskFailure(e.to_string()))?
    }
}
