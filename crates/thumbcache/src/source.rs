//! # Source references
//!
//! Validation of the remote image locator supplied by a client. A reference
//! is only constructed when its last path segment names a JPEG file, so no
//! I/O ever happens for an unsupported or malformed URL.

use std::fmt;

use url::Url;

use crate::error::ThumbnailError;

/// Extensions accepted as JPEG input, compared case-insensitively.
const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Last path segment of a source URL, safe to use as a storage file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BaseName(String);

impl BaseName {
    pub fn parse(segment: &str) -> Result<Self, ThumbnailError> {
        if segment.is_empty() {
            return Err(ThumbnailError::invalid("url has no file name"));
        }
        if segment == "." || segment == ".." {
            return Err(ThumbnailError::invalid(format!(
                "invalid file name '{segment}'"
            )));
        }
        if segment.contains(['/', '\\', '\0']) {
            return Err(ThumbnailError::invalid(format!(
                "file name '{segment}' contains a path separator"
            )));
        }

        let Some((stem, ext)) = segment.rsplit_once('.') else {
            return Err(ThumbnailError::invalid(format!(
                "'{segment}' has no extension, not a jpg"
            )));
        };
        if stem.is_empty() {
            return Err(ThumbnailError::invalid(format!(
                "'{segment}' has an empty file stem"
            )));
        }
        if !ACCEPTED_EXTENSIONS
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(ext))
        {
            return Err(ThumbnailError::invalid(format!(
                "'{segment}' is not a jpg"
            )));
        }

        Ok(Self(segment.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated remote image locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReference {
    url: Url,
    base: BaseName,
}

impl SourceReference {
    pub fn parse(raw: &str) -> Result<Self, ThumbnailError> {
        let url = Url::parse(raw.trim())
            .map_err(|e| ThumbnailError::invalid(format!("invalid url '{raw}': {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ThumbnailError::invalid(format!(
                "unsupported url scheme '{}'",
                url.scheme()
            )));
        }

        let segment = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();
        let base = BaseName::parse(segment)?;

        Ok(Self { url, base })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn base_name(&self) -> &BaseName {
        &self.base
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_jpg_reference() {
        let source = SourceReference::parse("https://example.com/images/cat.jpg?x=1").unwrap();
        assert_eq!(source.base_name().as_str(), "cat.jpg");
        assert_eq!(source.url().host_str(), Some("example.com"));
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert!(SourceReference::parse("http://example.com/a/DOG.JPG").is_ok());
        assert!(SourceReference::parse("http://example.com/a/dog.jpeg").is_ok());
    }

    #[test]
    fn test_rejects_non_raster_extensions() {
        for raw in [
            "http://example.com/a/cat.png",
            "http://example.com/a/cat",
            "http://example.com/a/",
            "http://example.com/a/.jpg",
        ] {
            let err = SourceReference::parse(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest, "{raw}");
        }
    }

    #[test]
    fn test_rejects_malformed_and_unsupported_urls() {
        assert_eq!(
            SourceReference::parse("foo.jpg").unwrap_err().kind(),
            ErrorKind::InvalidRequest
        );
        assert_eq!(
            SourceReference::parse("ftp://example.com/cat.jpg")
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidRequest
        );
    }

    #[test]
    fn test_escaped_segment_kept_verbatim() {
        let source = SourceReference::parse("http://example.com/a/my%20cat.jpg").unwrap();
        assert_eq!(source.base_name().as_str(), "my%20cat.jpg");
    }
}
