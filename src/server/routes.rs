//! Router configuration.
//!
//! # Route Structure
//!
//! ```text
//! /health                          - Health check
//! /callback                        - LINE webhook (legacy path)
//! /platforms/line/callback         - LINE webhook
//! /platforms/telegram/callback     - Telegram webhook
//! /images/{digest}.jpeg            - Generated images (static files)
//! ```
//!
//! Webhook routes are only mounted for configured platforms. Under `/images`
//! only names of the form `<digest>.jpeg` are served; in-flight temp files
//! and anything else in the store root answer 404.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use textshot::server::{create_router, Platforms, RouterConfig};
//!
//! let platforms = Platforms::new().with_line(Arc::new(line));
//! let router = create_router(dispatcher, platforms, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use http::header::CACHE_CONTROL;
use http::{HeaderValue, StatusCode};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::handlers::{health_handler, webhook_handler, WebhookState};
use crate::dispatch::Dispatcher;
use crate::pipeline::IMAGES_PATH;
use crate::platform::Platform;
use crate::render::JPEG_EXTENSION;
use crate::store::ContentDigest;

/// Default Cache-Control max-age for images (one year).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 31_536_000;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Cache-Control max-age in seconds for served images
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - Cache max-age is one year; image URLs are content-addressed
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            enable_tracing: true,
        }
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Platforms to mount webhook routes for.
#[derive(Clone, Default)]
pub struct Platforms {
    pub line: Option<Arc<dyn Platform>>,
    pub telegram: Option<Arc<dyn Platform>>,
}

impl Platforms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line(mut self, platform: Arc<dyn Platform>) -> Self {
        self.line = Some(platform);
        self
    }

    pub fn with_telegram(mut self, platform: Arc<dyn Platform>) -> Self {
        self.telegram = Some(platform);
        self
    }

    /// Whether no platform is configured.
    pub fn is_empty(&self) -> bool {
        self.line.is_none() && self.telegram.is_none()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Images are served straight from the dispatcher's store root, so every URL
/// the pipeline hands out resolves on this router.
pub fn create_router(
    dispatcher: Arc<Dispatcher>,
    platforms: Platforms,
    config: RouterConfig,
) -> Router {
    if platforms.is_empty() {
        warn!("No chat platform configured; only images and health are served");
    }

    let images_root = dispatcher.pipeline().store().root().to_path_buf();

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .merge(image_routes(images_root, config.cache_max_age));

    if let Some(line) = platforms.line {
        let state = WebhookState::new(Arc::clone(&dispatcher), line);
        router = router.merge(
            Router::new()
                .route("/callback", post(webhook_handler))
                .route("/platforms/line/callback", post(webhook_handler))
                .with_state(state),
        );
    }

    if let Some(telegram) = platforms.telegram {
        let state = WebhookState::new(Arc::clone(&dispatcher), telegram);
        router = router.merge(
            Router::new()
                .route("/platforms/telegram/callback", post(webhook_handler))
                .with_state(state),
        );
    }

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Static file routes for stored images.
fn image_routes(root: PathBuf, cache_max_age: u32) -> Router {
    let cache_control = cache_control_value(cache_max_age);

    Router::new()
        .nest_service(IMAGES_PATH, ServeDir::new(root))
        .layer(middleware::from_fn(require_digest_name))
        .layer(middleware::from_fn_with_state(
            cache_control,
            cache_control_middleware,
        ))
}

/// Relative file name of an image request, with or without the mount prefix.
fn image_file_name(path: &str) -> &str {
    path.strip_prefix(IMAGES_PATH)
        .unwrap_or(path)
        .trim_start_matches('/')
}

/// Reject anything that is not a stored image name before touching the disk.
async fn require_digest_name(request: Request, next: Next) -> Response {
    let name = image_file_name(request.uri().path());
    if ContentDigest::from_file_name(name, JPEG_EXTENSION).is_err() {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

fn cache_control_value(max_age: u32) -> HeaderValue {
    // Formatted from an integer, always a valid header value.
    HeaderValue::from_str(&format!("public, max-age={}, immutable", max_age))
        .unwrap_or_else(|_| HeaderValue::from_static("public, immutable"))
}

/// Mark successful image responses as immutable.
async fn cache_control_middleware(
    State(cache_control): State<HeaderValue>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(CACHE_CONTROL, cache_control);
    }
    response
}

// =============================================================================
// Tests
// =============================================================================
