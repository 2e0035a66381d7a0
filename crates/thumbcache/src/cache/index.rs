//! # Cache Index
//!
//! Process-wide record of which artifacts are committed to storage and in
//! which state. Entries are only ever added, after the artifact bytes are
//! fully written.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::cache::types::{ArtifactKey, ArtifactState};

#[derive(Debug, Default)]
pub struct CacheIndex {
    entries: RwLock<HashMap<ArtifactKey, ArtifactState>>,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &ArtifactKey) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn state(&self, key: &ArtifactKey) -> Option<ArtifactState> {
        self.entries.read().get(key).copied()
    }

    /// Record a committed artifact. `Downloading` is never recorded here;
    /// in-progress work is tracked by the in-flight registry instead.
    pub fn mark(&self, key: ArtifactKey, state: ArtifactState) {
        debug_assert!(state != ArtifactState::Downloading);
        self.entries.write().insert(key, state);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
