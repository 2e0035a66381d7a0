use crate::cache::{ArtifactKey, Dimensions};
use crate::error::ThumbnailError;
use crate::source::SourceReference;

/// A validated thumbnail request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRequest {
    pub source: SourceReference,
    pub dims: Dimensions,
}

impl ThumbnailRequest {
    pub fn new(source: SourceReference, dims: Dimensions) -> Self {
        Self { source, dims }
    }

    /// Validate raw query parameters. Nothing is fetched or read here.
    pub fn from_params(
        url: Option<&str>,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Result<Self, ThumbnailError> {
        let missing: Vec<&str> = [("url", url), ("width", width), ("height", height)]
            .into_iter()
            .filter(|(_, value)| value.is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| name)
            .collect();

        match (url, width, height) {
            (Some(url), Some(width), Some(height)) if missing.is_empty() => {
                let dims = Dimensions::parse(width, height)?;
                let source = SourceReference::parse(url)?;
                Ok(Self { source, dims })
            }
            _ => Err(ThumbnailError::invalid(format!(
                "missing query params: {}",
                missing.join(", ")
            ))),
        }
    }

    pub fn original_key(&self) -> ArtifactKey {
        ArtifactKey::original(self.source.base_name())
    }

    pub fn derived_key(&self) -> ArtifactKey {
        ArtifactKey::derived(&self.original_key(), self.dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_valid_params() {
        let request =
            ThumbnailRequest::from_params(Some("http://example.com/a.jpg"), Some("10"), Some("20"))
                .unwrap();
        assert_eq!(request.dims, Dimensions::new(10, 20).unwrap());
        assert_eq!(request.derived_key().to_string(), "derived/10x20/a.jpg");
        assert_eq!(request.original_key().to_string(), "original/a.jpg");
    }

    #[test]
    fn test_missing_height() {
        let err = ThumbnailRequest::from_params(Some("foo.jpg"), Some("10"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(err.to_string().contains("height"));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let err = ThumbnailRequest::from_params(Some(""), Some("10"), Some(" ")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("url"));
        assert!(message.contains("height"));
        assert!(!message.contains("width"));
    }

    #[test]
    fn test_non_positive_size() {
        let err =
            ThumbnailRequest::from_params(Some("http://example.com/a.jpg"), Some("0"), Some("5"))
                .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_png_rejected() {
        let err =
            ThumbnailRequest::from_params(Some("http://example.com/a.png"), Some("5"), Some("5"))
                .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
