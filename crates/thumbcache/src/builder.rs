//! # Builder for FetcherConfig
//!
//! This module provides a builder pattern implementation for creating and customizing
//! FetcherConfig instances with a fluent API.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use thumbcache_engine::FetcherConfig;
//!
//! let config = FetcherConfig::builder()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_connect_timeout(Duration::from_secs(15))
//!     .with_max_redirects(5)
//!     .with_user_agent("MyApp/1.0")
//!     .with_header("Referer", "https://example.com/")
//!     .build();
//!
//! assert_eq!(config.max_redirects, 5);
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::FetcherConfig;

/// Builder for creating FetcherConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct FetcherConfigBuilder {
    /// Internal config being built
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FetcherConfig::default(),
        }
    }

    /// Set the overall timeout for the entire HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set how many redirect hops are followed
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a single request header, ignoring invalid names or values
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.config.headers.insert(name, value);
            }
            _ => warn!(name, "Ignoring invalid request header"),
        }
        self
    }

    /// Merge headers over the defaults; later values win
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.config.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Enable or disable use of system proxy settings
    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.config.use_system_proxy = enabled;
        self
    }

    /// Build the final FetcherConfig
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

impl Default for FetcherConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder_defaults() {
        let config = FetcherConfigBuilder::new().build();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.max_redirects, 10);
        assert!(config.use_system_proxy);
        assert!(config.headers.contains_key(reqwest::header::ACCEPT));
    }

    #[test]
    fn test_builder_customization() {
        let config = FetcherConfigBuilder::new()
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(20))
            .with_max_redirects(0)
            .with_user_agent("CustomUserAgent/1.0")
            .with_header("X-Custom-Header", "CustomValue")
            .with_system_proxy(false)
            .build();

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(20));
        assert_eq!(config.max_redirects, 0);
        assert_eq!(config.user_agent, "CustomUserAgent/1.0");
        assert!(!config.use_system_proxy);

        let header_value = config.headers.get("X-Custom-Header").unwrap();
        assert_eq!(header_value.to_str().unwrap(), "CustomValue");
    }

    #[test]
    fn test_invalid_header_is_ignored() {
        let config = FetcherConfigBuilder::new()
            .with_header("bad header", "value")
            .build();
        assert_eq!(config.headers.len(), FetcherConfig::get_default_headers().len());
    }

    #[test]
    fn test_with_headers_overrides_defaults() {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        let config = FetcherConfigBuilder::new().with_headers(headers).build();
        assert_eq!(config.headers.get(reqwest::header::ACCEPT).unwrap(), "*/*");
    }
}
