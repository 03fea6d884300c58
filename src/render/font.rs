//! The shared font face.
//!
//! A [`FontFace`] is loaded once during startup and handed to the renderer
//! behind an `Arc`. It is never mutated afterwards, so any number of
//! concurrent renders can read it without locking.

use std::fmt;
use std::path::Path;

use ab_glyph::{Font, FontVec, GlyphId, PxScale, ScaleFont};

use crate::error::FontError;

/// Default em size in pixels (12pt at 72 DPI).
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// An immutable, parsed font at a fixed pixel size.
pub struct FontFace {
    font: FontVec,
    scale: PxScale,
    size_px: f32,
    name: String,
}

impl FontFace {
    /// Read and parse a font file.
    ///
    /// # Errors
    ///
    /// Returns [`FontError::Read`] if the file cannot be read and
    /// [`FontError::Parse`] if it is not a usable font.
    pub fn load(path: impl AsRef<Path>, size_px: f32) -> Result<Self, FontError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| FontError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::parse(data, size_px, path.display().to_string())
    }

    /// Parse a font from memory.
    pub fn from_bytes(data: impl Into<Vec<u8>>, size_px: f32) -> Result<Self, FontError> {
        Self::parse(data.into(), size_px, "<memory>".to_string())
    }

    fn parse(data: Vec<u8>, size_px: f32, name: String) -> Result<Self, FontError> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(FontError::InvalidSize(size_px));
        }

        let font = FontVec::try_from_vec(data).map_err(|e| FontError::Parse {
            source_name: name.clone(),
            message: e.to_string(),
        })?;

        let units_per_em = font.units_per_em().ok_or_else(|| FontError::Parse {
            source_name: name.clone(),
            message: "font has no valid units-per-em".to_string(),
        })?;

        let height = font.height_unscaled();
        if height <= 0.0 {
            return Err(FontError::Parse {
                source_name: name,
                message: "font has a non-positive line height".to_string(),
            });
        }

        // ab_glyph scales relative to ascent - descent, not the em square.
        let scale = PxScale::from(size_px * height / units_per_em);

        Ok(Self {
            font,
            scale,
            size_px,
            name,
        })
    }

    /// The underlying font.
    pub fn font(&self) -> &FontVec {
        &self.font
    }

    /// Scale used to position and outline glyphs.
    pub fn scale(&self) -> PxScale {
        self.scale
    }

    /// Em size in pixels.
    pub fn size_px(&self) -> f32 {
        self.size_px
    }

    /// Where the font was loaded from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Distance from the baseline to the top of the line box, in pixels.
    pub fn ascent(&self) -> f32 {
        self.font.as_scaled(self.scale).ascent()
    }

    /// Distance from the baseline to the bottom of the line box (negative).
    pub fn descent(&self) -> f32 {
        self.font.as_scaled(self.scale).descent()
    }

    /// Height of one line: ascent - descent + line gap.
    pub fn line_height(&self) -> f32 {
        let scaled = self.font.as_scaled(self.scale);
        scaled.height() + scaled.line_gap()
    }

    /// Total horizontal advance of `text` including kerning, in pixels.
    pub fn advance_width(&self, text: &str) -> f32 {
        let scaled = self.font.as_scaled(self.scale);
        let mut width = 0.0f32;
        let mut prev: Option<GlyphId> = None;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }

        width
    }
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFace")
            .field("name", &self.name)
            .field("size_px", &self.size_px)
            .finish_non_exhaustive()
    }
}
