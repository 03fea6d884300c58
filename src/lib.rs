//! # textshot
//!
//! A chat bot backend that renders incoming text messages into 240×240 JPEG
//! images and replies with a public link to the image.
//!
//! ## Features
//!
//! - **Text rendering**: one line of white text centered on a black canvas
//! - **Content-addressed cache**: images are stored under the SHA-256 of their
//!   bytes, so identical messages share one file and one URL
//! - **Safe concurrent writes**: per-digest locking and atomic rename; readers
//!   never see a partial file
//! - **Chat platforms**: LINE (signed webhooks) and Telegram (secret token)
//!
//! ## Architecture
//!
//! - [`render`] - Font loading, rasterization and JPEG encoding
//! - [`store`] - Content digests and the on-disk image store
//! - [`pipeline`] - Text to stored image to public URL
//! - [`platform`] - Webhook parsing and replies per chat platform
//! - [`dispatch`] - Routes parsed events through the pipeline
//! - [`server`] - Axum routes for webhooks and static images
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use textshot::{ContentStore, FontFace, ImagePipeline, Renderer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let font = Arc::new(FontFace::load("fonts/Sarabun-Regular.ttf", 12.0)?);
//!     let store = Arc::new(ContentStore::open("public/images").await?);
//!     let pipeline = ImagePipeline::new(Renderer::new(font), store, "https://bot.example.com");
//!
//!     let image = pipeline.generate("hello").await?;
//!     println!("{}", image.url);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod pipeline;
pub mod platform;
pub mod render;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::{Cli, Command, ImageConfig, RenderConfig, RenderOutputFormat, ServeConfig};
pub use dispatch::{DispatchSummary, Dispatcher};
pub use error::{
    DispatchError, EncodeError, FontError, PipelineError, PlatformError, RenderError, ReplyError,
    StorageError,
};
pub use pipeline::{GeneratedImage, ImagePipeline, IMAGES_PATH};
pub use platform::{
    EventKind, InboundEvent, LinePlatform, Platform, PlatformKind, TelegramPlatform,
};
pub use render::{
    EncodedImage, FontFace, JpegEncoder, RenderRequest, RenderedImage, Renderer, CANVAS_HEIGHT,
    CANVAS_WIDTH,
};
pub use server::{create_router, ErrorResponse, HealthResponse, Platforms, RouterConfig};
pub use store::{ContentDigest, ContentStore, StoreOutcome};
