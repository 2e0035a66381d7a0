//! # Cache System
//!
//! This module provides the storage side of the thumbnail pipeline: cache
//! keys, the committed-artifact index and the artifact stores themselves.

// Module declarations
mod index;
mod manager;
pub mod providers;
mod types;

// Re-export primary types from our various modules
pub use index::CacheIndex;
pub use manager::TieredStore;
pub use types::{ArtifactKey, ArtifactState, CacheConfig, Dimensions, StoreResult};

pub use providers::{ArtifactStore, FileStore, MemoryStore};
