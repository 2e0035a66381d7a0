//! # Cache Types
//!
//! This module defines common types used across the caching system.

use std::fmt;
use std::num::NonZeroU32;
use std::path::PathBuf;

use crate::error::ThumbnailError;
use crate::source::BaseName;

/// A width/height pair, both strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dimensions {
    width: NonZeroU32,
    height: NonZeroU32,
}

impl Dimensions {
    /// Create dimensions, returning `None` when either side is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            width: NonZeroU32::new(width)?,
            height: NonZeroU32::new(height)?,
        })
    }

    /// Parse caller-supplied width and height strings.
    pub fn parse(width: &str, height: &str) -> Result<Self, ThumbnailError> {
        let width = parse_side("width", width)?;
        let height = parse_side("height", height)?;
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width.get()
    }

    pub fn height(&self) -> u32 {
        self.height.get()
    }
}

fn parse_side(name: &str, value: &str) -> Result<NonZeroU32, ThumbnailError> {
    value.trim().parse::<NonZeroU32>().map_err(|_| {
        ThumbnailError::invalid(format!("{name} must be a positive integer, got '{value}'"))
    })
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Identifier of a stored artifact.
///
/// The two kinds live in separate namespaces, so an original can never share
/// a key with a thumbnail whatever its file name looks like.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    /// The downloaded file, unscaled
    Original { base: BaseName },
    /// A resized variant of an original
    Derived { base: BaseName, dims: Dimensions },
}

impl ArtifactKey {
    pub fn original(base: &BaseName) -> Self {
        Self::Original { base: base.clone() }
    }

    /// Key of the `dims`-sized variant of `original`.
    ///
    /// Pure and deterministic; deriving from a derived key re-targets the same
    /// base name.
    pub fn derived(original: &ArtifactKey, dims: Dimensions) -> Self {
        Self::Derived {
            base: original.base_name().clone(),
            dims,
        }
    }

    pub fn base_name(&self) -> &BaseName {
        match self {
            Self::Original { base } | Self::Derived { base, .. } => base,
        }
    }

    /// Relative storage path segments for this key.
    pub fn segments(&self) -> Vec<String> {
        match self {
            Self::Original { base } => vec!["original".to_string(), base.to_string()],
            Self::Derived { base, dims } => vec![
                "derived".to_string(),
                dims.to_string(),
                base.to_string(),
            ],
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original { base } => write!(f, "original/{base}"),
            Self::Derived { base, dims } => write!(f, "derived/{dims}/{base}"),
        }
    }
}

/// Lifecycle of a single logical artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// A producer is currently fetching or resizing it
    Downloading,
    /// An original committed to storage, labelled with its native dimensions
    Stored(Dimensions),
    /// A resized variant committed to storage, labelled with the requested bounds
    Derived(Dimensions),
}

/// Configuration for the cache system
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding the on-disk artifacts
    pub cache_dir: PathBuf,
    /// Capacity of the in-memory tier in bytes, 0 disables it
    pub max_memory_cache_size: u64,
    /// JPEG quality used when encoding thumbnails
    pub jpeg_quality: u8,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("thumbcache"),
            max_memory_cache_size: 32 * 1024 * 1024, // 32MB
            jpeg_quality: 75,
        }
    }
}

/// Result of a store operation
pub type StoreResult<T> = std::result::Result<T, ThumbnailError>;
