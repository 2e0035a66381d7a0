//! # Thumbcache
//!
//! A library for serving resized JPEG thumbnails of remote images.
//! Originals and every resized variant are cached on disk so that a repeated
//! request for the same image and size is answered without downloading or
//! resizing again.
//!
//! ## Features
//!
//! - Deterministic, namespaced cache keys for originals and derived sizes
//! - Atomic on-disk artifact store with an optional in-memory tier
//! - At most one concurrent producer per cache key
//! - Redirect-following fetcher that keeps escaped paths verbatim
//! - Aspect-preserving thumbnail resizing (Lanczos3)

pub mod builder;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod inflight;
pub mod request;
pub mod resizer;
pub mod source;

pub use builder::FetcherConfigBuilder;
pub use cache::{
    ArtifactKey, ArtifactState, ArtifactStore, CacheConfig, CacheIndex, Dimensions, FileStore,
    MemoryStore, TieredStore,
};
pub use config::FetcherConfig;
pub use coordinator::{CacheCoordinator, Outcome, Thumbnail};
pub use error::{ErrorKind, ThumbnailError};
pub use fetcher::{Fetcher, HttpFetcher, create_client};
pub use request::ThumbnailRequest;
pub use resizer::{ImageResizer, Resizer, fit_within};
pub use source::{BaseName, SourceReference};

/// Content type asserted for every thumbnail response.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";
