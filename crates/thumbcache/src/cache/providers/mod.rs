//! # Cache Providers
//!
//! This module contains different artifact store implementations.

// Re-export providers for easier access
pub use self::file::FileStore;
pub use self::memory::MemoryStore;
pub use self::provider::ArtifactStore;

// Provider interface
pub mod provider;

// Individual provider implementations
pub mod file;
pub mod memory;
