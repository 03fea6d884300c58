//! Image pipeline: text in, public URL out.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         ImagePipeline                         │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │                      generate()                         │  │
//! │  │  1. Validate text      3. Encode JPEG                   │  │
//! │  │  2. Render 240x240     4. Store if absent  5. Build URL │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! │        │                     │                     │          │
//! │        ▼                     ▼                     ▼          │
//! │   ┌──────────┐        ┌─────────────┐      ┌──────────────┐   │
//! │   │ Renderer │        │ JpegEncoder │      │ ContentStore │   │
//! │   └──────────┘        └─────────────┘      └──────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::error::PipelineError;
use crate::render::{
    EncodedImage, JpegEncoder, RenderRequest, Renderer, CANVAS_HEIGHT, CANVAS_WIDTH,
};
use crate::store::{ContentDigest, ContentStore};

/// URL path prefix under which stored images are served.
pub const IMAGES_PATH: &str = "/images";

/// Result of a successful [`ImagePipeline::generate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Public URL of the image
    pub url: String,

    /// Content digest of the encoded bytes
    pub digest: ContentDigest,

    /// Whether the image was already in the store
    pub cache_hit: bool,
}

/// Orchestrates render, encode and store for a message text.
///
/// The pipeline holds no per-request state and can be shared across tasks
/// behind an `Arc`.
///
/// # Example
///
/// ```ignore
/// let font = Arc::new(FontFace::load("fonts/Sarabun-Regular.ttf", 12.0)?);
/// let store = Arc::new(ContentStore::open("public/images").await?);
/// let pipeline = ImagePipeline::new(Renderer::new(font), store, "https://bot.example.com");
///
/// let image = pipeline.generate("hello").await?;
/// assert!(image.url.starts_with("https://bot.example.com/images/"));
/// ```
#[derive(Debug)]
pub struct ImagePipeline {
    renderer: Renderer,
    encoder: JpegEncoder,
    store: Arc<ContentStore>,
    base_url: String,
}

impl ImagePipeline {
    /// Create a pipeline.
    ///
    /// `base_url` is the externally visible origin of this server; trailing
    /// slashes are ignored.
    pub fn new(renderer: Renderer, store: Arc<ContentStore>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            renderer,
            encoder: JpegEncoder::new(),
            store,
            base_url,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    /// The base URL used for image links.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public URL for a stored digest.
    pub fn image_url(&self, digest: &ContentDigest) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            IMAGES_PATH,
            digest.file_name(crate::render::JPEG_EXTENSION)
        )
    }

    /// Render `text`, store the JPEG if it is new, and return its URL.
    ///
    /// Cache hits and fresh writes return the same URL.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidInput`] if `text` is empty (nothing is written)
    /// - [`PipelineError::Render`], [`PipelineError::Encode`],
    ///   [`PipelineError::Storage`] for failures in the corresponding stage
    pub async fn generate(&self, text: &str) -> Result<GeneratedImage, PipelineError> {
        if text.is_empty() {
            return Err(PipelineError::InvalidInput {
                reason: "message text is empty".to_string(),
            });
        }

        let encoded = self.render_and_encode(text).await?;
        let outcome = self.store.store_if_absent(&encoded).await?;
        let url = self.image_url(&outcome.digest);

        debug!(
            digest = %outcome.digest,
            stored = outcome.stored,
            url = %url,
            "Generated image"
        );

        Ok(GeneratedImage {
            url,
            digest: outcome.digest,
            cache_hit: !outcome.stored,
        })
    }

    /// Rasterize and encode on the blocking pool.
    async fn render_and_encode(&self, text: &str) -> Result<EncodedImage, PipelineError> {
        let renderer = self.renderer.clone();
        let encoder = self.encoder.clone();
        let request = RenderRequest::with_canvas(text, CANVAS_WIDTH, CANVAS_HEIGHT);

        tokio::task::spawn_blocking(move || -> Result<EncodedImage, PipelineError> {
            let rendered = renderer.render(&request)?;
            Ok(encoder.encode(&rendered)?)
        })
        .await
        .map_err(|e| PipelineError::Task {
            message: e.to_string(),
        })?
    }
}
