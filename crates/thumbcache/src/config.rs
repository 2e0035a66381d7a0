use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

const DEFAULT_USER_AGENT: &str = concat!("thumbcache/", env!("CARGO_PKG_VERSION"));

/// Configurable options for the source image fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Overall timeout for the entire HTTP request, zero disables it
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Maximum number of redirect hops followed before giving up
    pub max_redirects: usize,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Whether to use system proxy settings if available
    pub use_system_proxy: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 10,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: FetcherConfig::get_default_headers(),
            use_system_proxy: true,
        }
    }
}

impl FetcherConfig {
    pub fn builder() -> crate::builder::FetcherConfigBuilder {
        crate::builder::FetcherConfigBuilder::new()
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("image/jpeg,image/*;q=0.8,*/*;q=0.5"),
        );

        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        default_headers
    }
}
