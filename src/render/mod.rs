//! Text-to-image rendering.
//!
//! ```text
//!  text ──► Renderer ──► RenderedImage ──► JpegEncoder ──► EncodedImage
//!              │
//!              └── Arc<FontFace> (loaded once, read-only)
//! ```
//!
//! # Components
//!
//! - [`FontFace`]: a parsed font at a fixed pixel size, shared by all renders
//! - [`Renderer`]: draws one centered line of text on a fixed-size canvas
//! - [`JpegEncoder`]: encodes the canvas as JPEG at a fixed quality

mod encoder;
mod font;
mod renderer;

pub use encoder::{
    EncodedImage, JpegEncoder, DEFAULT_JPEG_QUALITY, JPEG_EXTENSION, JPEG_MIME_TYPE,
};
pub use font::{FontFace, DEFAULT_FONT_SIZE};
pub use renderer::{
    RenderRequest, RenderedImage, Renderer, TextOrigin, BACKGROUND, CANVAS_HEIGHT, CANVAS_WIDTH,
    WHITE,
};
