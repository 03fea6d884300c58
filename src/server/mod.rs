//! HTTP server layer.
//!
//! Receives chat webhooks and serves the generated images.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   POST /platforms/{line,telegram}/callback   GET /images/*      │
//! │                                                                 │
//! │  ┌─────────────────────────┐  ┌──────────────────────────────┐  │
//! │  │        handlers         │  │            routes            │  │
//! │  │ (webhooks, errors)      │  │ (router, static images)      │  │
//! │  └─────────────────────────┘  └──────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                         Dispatcher
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    dispatch_error_status, health_handler, webhook_handler, ErrorResponse, HealthResponse,
    WebhookState,
};
pub use routes::{create_router, Platforms, RouterConfig, DEFAULT_CACHE_MAX_AGE};
