//! HTTP surface of the service.
//!
//! | Method | Path         | Response                                   |
//! |--------|--------------|--------------------------------------------|
//! | GET    | `/thumbnail` | 200 `image/jpeg`, or 400 JSON error envelope |
//! | any    | anything else| 404 plain text                             |

use axum::{Json, Router};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use thumbcache_engine::{CacheCoordinator, ThumbnailError};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

const NOT_FOUND_BODY: &str = "Could not find a valid end point.\n";

#[derive(Clone)]
pub struct AppState {
    pub coordinator: CacheCoordinator,
}

/// Raw query parameters; validation happens in the engine.
#[derive(Debug, Default, Deserialize)]
pub struct ThumbnailQuery {
    pub url: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

/// Body of every failed thumbnail request.
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    result: &'static str,
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/thumbnail", get(thumbnail).head(not_found).fallback(not_found))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn thumbnail(
    State(state): State<AppState>,
    query: Result<Query<ThumbnailQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return error_response(&ThumbnailError::invalid(rejection.body_text())),
    };

    let result = state
        .coordinator
        .resolve_params(
            query.url.as_deref(),
            query.width.as_deref(),
            query.height.as_deref(),
        )
        .await;

    match result {
        Ok(thumb) => {
            debug!(outcome = ?thumb.outcome, size = thumb.bytes.len(), "Serving thumbnail");
            ([(header::CONTENT_TYPE, thumb.content_type())], thumb.bytes).into_response()
        }
        Err(e) => {
            warn!(kind = ?e.kind(), error = %e, "Thumbnail request failed");
            error_response(&e)
        }
    }
}

fn error_response(err: &ThumbnailError) -> Response {
    let body = ErrorEnvelope {
        result: "",
        error: err.to_string(),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use bytes::Bytes;
    use image::codecs::jpeg::JpegEncoder;
    use image::{Rgb, RgbImage};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use thumbcache_engine::{Fetcher, FileStore, ImageResizer, SourceReference};
    use tower::ServiceExt;

    struct StaticFetcher {
        body: Bytes,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn download(&self, _source: &SourceReference) -> Result<Bytes, ThumbnailError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    fn sample_jpeg(width: u32, height: u32) -> Bytes {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 128]));
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 90)
            .encode_image(&img)
            .unwrap();
        Bytes::from(out)
    }

    fn app(dir: &std::path::Path) -> (Router, Arc<StaticFetcher>) {
        let fetcher = Arc::new(StaticFetcher {
            body: sample_jpeg(400, 200),
            calls: AtomicUsize::new(0),
        });
        let coordinator = CacheCoordinator::new(
            Arc::new(FileStore::new(dir)),
            fetcher.clone(),
            Arc::new(ImageResizer::default()),
        );
        (router(AppState { coordinator }), fetcher)
    }

    async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, String, Bytes) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, body)
    }

    #[tokio::test]
    async fn test_thumbnail_success_and_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let (app, fetcher) = app(dir.path());
        let uri = "/thumbnail?url=http://example.com/a/photo.jpg&width=100&height=100";

        let (status, content_type, first) = call(&app, "GET", uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "image/jpeg");
        assert!(!first.is_empty());

        let (_, _, second) = call(&app, "GET", uri).await;
        assert_eq!(first, second);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_param_is_json_400() {
        let dir = tempfile::tempdir().unwrap();
        let (app, fetcher) = app(dir.path());

        let (status, content_type, body) =
            call(&app, "GET", "/thumbnail?url=foo.jpg&width=10").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type, "application/json");

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["result"], "");
        assert!(json["error"].as_str().unwrap().contains("height"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let (app, fetcher) = app(dir.path());

        let (status, _, body) = call(
            &app,
            "GET",
            "/thumbnail?url=http://example.com/a.png&width=10&height=10",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("not a jpg"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(dir.path());

        let (status, _, body) = call(&app, "GET", "/somewhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, Bytes::from_static(NOT_FOUND_BODY.as_bytes()));
    }

    #[tokio::test]
    async fn test_other_method_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (app, fetcher) = app(dir.path());

        for method in ["POST", "PUT", "DELETE", "HEAD"] {
            let (status, _, _) = call(
                &app,
                method,
                "/thumbnail?url=http://example.com/a.jpg&width=10&height=10",
            )
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
