use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, header::LOCATION};
use tracing::{debug, info};
use url::Url;

use crate::{FetcherConfig, SourceReference, ThumbnailError};

/// Retrieves the bytes of a source image.
///
/// A single attempt per call; failures are terminal for the request.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn download(&self, source: &SourceReference) -> Result<Bytes, ThumbnailError>;
}

/// Create a reqwest Client with the provided configuration.
///
/// Automatic redirects are disabled; [`HttpFetcher`] follows them itself.
pub fn create_client(config: &FetcherConfig) -> Result<Client, ThumbnailError> {
    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(5)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(reqwest::redirect::Policy::none());

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if config.use_system_proxy {
        info!("Using system proxy settings for source fetches");
    } else {
        client_builder = client_builder.no_proxy();
        debug!("Proxy disabled for source fetches");
    }

    client_builder
        .build()
        .map_err(|e| ThumbnailError::network("<client>", e))
}

/// HTTP fetcher that follows redirects without re-escaping the target path.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_redirects: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, ThumbnailError> {
        Ok(Self {
            client: create_client(config)?,
            max_redirects: config.max_redirects,
        })
    }

    /// Resolve a `Location` header against the URL that produced it.
    ///
    /// `Url::join` keeps percent-escapes already present in the target as
    /// they are, so a path like `/a%2Fb.jpg` is requested verbatim.
    fn redirect_target(current: &Url, location: &str) -> Result<Url, ThumbnailError> {
        current.join(location).map_err(|e| {
            ThumbnailError::network(current, format!("invalid redirect location '{location}': {e}"))
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn download(&self, source: &SourceReference) -> Result<Bytes, ThumbnailError> {
        let mut url = source.url().clone();

        for hop in 0..=self.max_redirects {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();

            if status.is_redirection() && status != StatusCode::NOT_MODIFIED {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        ThumbnailError::network(&url, format!("redirect {status} without location"))
                    })?;
                let next = Self::redirect_target(&url, location)?;
                debug!(hop, from = %url, to = %next, "Following redirect");
                url = next;
                continue;
            }

            if !status.is_success() {
                return Err(ThumbnailError::network(
                    &url,
                    format!("server returned status code {status}"),
                ));
            }

            let body = response.bytes().await?;
            if body.is_empty() {
                return Err(ThumbnailError::EmptyBody(url.to_string()));
            }

            debug!(url = %url, size = body.len(), "Fetched source image");
            return Ok(body);
        }

        Err(ThumbnailError::network(
            source.url(),
            format!("too many redirects (limit {})", self.max_redirects),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use axum::Router;
    use axum::http::{StatusCode as AxumStatus, Uri, header};
    use axum::response::IntoResponse;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    type SeenPaths = Arc<parking_lot::Mutex<Vec<String>>>;

    /// Serve a tiny origin: `/redirect/<target>` answers 302 to `<target>`
    /// unchanged, `/empty.jpg` has no body, `/missing.jpg` is a 404 and every
    /// other path returns a fixed payload. Raw request paths are recorded.
    async fn spawn_origin() -> (String, SeenPaths) {
        let seen: SeenPaths = Arc::default();
        let recorder = seen.clone();

        let app = Router::new().fallback(move |uri: Uri| {
            let recorder = recorder.clone();
            async move {
                let path = uri.path().to_string();
                recorder.lock().push(path.clone());

                if let Some(target) = path.strip_prefix("/redirect") {
                    return (AxumStatus::FOUND, [(header::LOCATION, target.to_string())])
                        .into_response();
                }
                match path.as_str() {
                    "/loop.jpg" => {
                        (AxumStatus::FOUND, [(header::LOCATION, "/loop.jpg")]).into_response()
                    }
                    "/empty.jpg" => AxumStatus::OK.into_response(),
                    "/missing.jpg" => AxumStatus::NOT_FOUND.into_response(),
                    _ => (AxumStatus::OK, "payload").into_response(),
                }
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), seen)
    }

    fn fetcher() -> HttpFetcher {
        let config = FetcherConfig::builder()
            .with_timeout(Duration::from_secs(5))
            .with_system_proxy(false)
            .with_max_redirects(3)
            .build();
        HttpFetcher::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_download_body() {
        let (origin, _) = spawn_origin().await;
        let source = SourceReference::parse(&format!("{origin}/img/cat.jpg")).unwrap();

        let body = fetcher().download(&source).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"payload"));
    }

    #[tokio::test]
    async fn test_redirect_keeps_escaped_path() {
        let (origin, seen) = spawn_origin().await;
        let source =
            SourceReference::parse(&format!("{origin}/redirect/photos/a%2Fb%20c.jpg")).unwrap();

        let body = fetcher().download(&source).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"payload"));

        let seen = seen.lock().clone();
        assert_eq!(seen.last().map(String::as_str), Some("/photos/a%2Fb%20c.jpg"));
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected() {
        let (origin, _) = spawn_origin().await;
        let source = SourceReference::parse(&format!("{origin}/empty.jpg")).unwrap();

        let err = fetcher().download(&source).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyBody);
    }

    #[tokio::test]
    async fn test_error_status_is_network_error() {
        let (origin, _) = spawn_origin().await;
        let source = SourceReference::parse(&format!("{origin}/missing.jpg")).unwrap();

        let err = fetcher().download(&source).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_redirect_loop_is_bounded() {
        let (origin, seen) = spawn_origin().await;
        let source = SourceReference::parse(&format!("{origin}/loop.jpg")).unwrap();

        let err = fetcher().download(&source).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert_eq!(seen.lock().len(), 4);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = SourceReference::parse(&format!("http://{addr}/cat.jpg")).unwrap();
        let err = fetcher().download(&source).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkError);
    }
}
