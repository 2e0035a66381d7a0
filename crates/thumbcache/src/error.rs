use std::sync::Arc;

/// Coarse classification of a [`ThumbnailError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    NetworkError,
    EmptyBody,
    NotFound,
    ReadFailure,
    WriteFailure,
    DecodeFailure,
    EncodeFailure,
    TaskFailure,
}

// Error type for the whole fetch/resize/cache pipeline.
//
// Cloneable so that a single production result can be handed to every
// requester waiting on the same in-flight key.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ThumbnailError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to fetch {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("empty response body from {0}")]
    EmptyBody(String),

    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("failed to read artifact {key}: {source}")]
    ReadFailure {
        key: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("failed to write artifact {key}: {source}")]
    WriteFailure {
        key: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("production task failed: {0}")]
    TaskFailure(String),
}

impl ThumbnailError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Network { .. } => ErrorKind::NetworkError,
            Self::EmptyBody(_) => ErrorKind::EmptyBody,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ReadFailure { .. } => ErrorKind::ReadFailure,
            Self::WriteFailure { .. } => ErrorKind::WriteFailure,
            Self::Decode(_) => ErrorKind::DecodeFailure,
            Self::Encode(_) => ErrorKind::EncodeFailure,
            Self::TaskFailure(_) => ErrorKind::TaskFailure,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn network(url: impl ToString, reason: impl ToString) -> Self {
        Self::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn read_failure(key: impl ToString, source: std::io::Error) -> Self {
        Self::ReadFailure {
            key: key.to_string(),
            source: Arc::new(source),
        }
    }

    pub fn write_failure(key: impl ToString, source: std::io::Error) -> Self {
        Self::WriteFailure {
            key: key.to_string(),
            source: Arc::new(source),
        }
    }

    /// Convert a `NotFound` into a `ReadFailure`.
    ///
    /// Used when the index already claimed the artifact exists: a missing file
    /// at that point is a consistency failure, never a cache miss.
    pub fn into_read_failure(self) -> Self {
        match self {
            Self::NotFound(key) => Self::read_failure(
                key,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "indexed artifact is missing from storage",
                ),
            ),
            other => other,
        }
    }
}

impl From<reqwest::Error> for ThumbnailError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        let reason = if err.is_timeout() {
            "request timed out".to_string()
        } else {
            err.to_string()
        };
        Self::Network { url, reason }
    }
}
