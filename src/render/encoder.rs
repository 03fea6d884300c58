//! JPEG encoder for rendered canvases.
//!
//! # Design Decisions
//!
//! - **Fixed codec and quality**: every image is encoded as baseline JPEG at
//!   the codec's default quality. The digest of the output is the cache key,
//!   so identical pixels must always produce identical bytes.
//!
//! - **No metadata**: nothing time- or host-dependent is written into the
//!   stream.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;

use super::renderer::RenderedImage;
use crate::error::EncodeError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// MIME type of every encoded image.
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// File extension used for stored images.
pub const JPEG_EXTENSION: &str = "jpeg";

/// Encoded image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// The compressed byte stream
    pub bytes: Bytes,

    /// Always `image/jpeg`
    pub mime_type: &'static str,
}

impl EncodedImage {
    /// Wrap already-encoded JPEG bytes.
    pub fn jpeg(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: JPEG_MIME_TYPE,
        }
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        JPEG_EXTENSION
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Serializes rendered canvases to JPEG.
#[derive(Debug, Clone, Default)]
pub struct JpegEncoder {
    // Stateless; quality is fixed so output stays content-addressable.
}

impl JpegEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self {}
    }

    /// Encode a rendered canvas.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if the codec fails. This is not retried.
    pub fn encode(&self, image: &RenderedImage) -> Result<EncodedImage, EncodeError> {
        let mut output = Vec::new();
        let mut encoder = ImageJpegEncoder::new_with_quality(&mut output, DEFAULT_JPEG_QUALITY);

        encoder
            .encode_image(&image.pixels)
            .map_err(|e| EncodeError {
                message: e.to_string(),
            })?;

        Ok(EncodedImage::jpeg(output))
    }
}
