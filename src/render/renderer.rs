//! Text rasterizer.
//!
//! Draws a single line of text centered on a fixed-size canvas.
//!
//! # Layout
//!
//! - **Horizontal**: the pen starts at `(width - ceil(advance)) / 2`
//!   (floor division). Text wider than the canvas starts left of the origin
//!   and is clipped by the canvas edge; it is never wrapped or shrunk.
//! - **Vertical**: the baseline is placed at `(height - ceil(line_height)) / 2`
//!   (floor division), so glyph ink sits above that row.
//!
//! Line breaks are not interpreted; they are drawn with whatever glyph the
//! font maps them to.

use std::sync::Arc;

use ab_glyph::{point, Font, GlyphId, ScaleFont};
use image::{Rgb, RgbImage};

use super::font::FontFace;
use crate::error::RenderError;

/// Fixed canvas width in pixels.
pub const CANVAS_WIDTH: u32 = 240;

/// Fixed canvas height in pixels.
pub const CANVAS_HEIGHT: u32 = 240;

/// Default text color.
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Canvas background.
pub const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// Parameters for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Text to draw on a single line
    pub text: String,

    /// Canvas width in pixels
    pub canvas_width: u32,

    /// Canvas height in pixels
    pub canvas_height: u32,

    /// Text color
    pub foreground: Rgb<u8>,
}

impl RenderRequest {
    /// Create a request for the fixed 240x240 canvas with white text.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_canvas(text, CANVAS_WIDTH, CANVAS_HEIGHT)
    }

    /// Create a request with a custom canvas size.
    pub fn with_canvas(text: impl Into<String>, canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            text: text.into(),
            canvas_width,
            canvas_height,
            foreground: WHITE,
        }
    }

    /// Override the text color.
    pub fn with_foreground(mut self, foreground: Rgb<u8>) -> Self {
        self.foreground = foreground;
        self
    }
}

/// A rendered pixel buffer, owned by the pipeline call that produced it.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub pixels: RgbImage,
    pub width: u32,
    pub height: u32,
}

/// Pen position computed for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOrigin {
    /// X of the pen at the start of the run
    pub x: i32,
    /// Y of the baseline
    pub baseline: i32,
}

/// Rasterizes text with a shared, read-only font face.
#[derive(Debug, Clone)]
pub struct Renderer {
    font: Arc<FontFace>,
}

impl Renderer {
    /// Create a renderer backed by the given font face.
    pub fn new(font: Arc<FontFace>) -> Self {
        Self { font }
    }

    /// The font face used for rendering.
    pub fn font(&self) -> &FontFace {
        &self.font
    }

    /// Compute where the text run starts for the given canvas.
    pub fn origin(&self, text: &str, canvas_width: u32, canvas_height: u32) -> TextOrigin {
        let advance = self.font.advance_width(text).ceil() as i64;
        let line_height = self.font.line_height().ceil() as i64;

        let x = (canvas_width as i64 - advance).div_euclid(2);
        let baseline = (canvas_height as i64 - line_height).div_euclid(2);

        TextOrigin {
            x: clamp_i32(x),
            baseline: clamp_i32(baseline),
        }
    }

    /// Draw the request's text centered on a fresh black canvas.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EmptyCanvas`] if either canvas dimension is zero.
    pub fn render(&self, request: &RenderRequest) -> Result<RenderedImage, RenderError> {
        let (width, height) = (request.canvas_width, request.canvas_height);
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyCanvas { width, height });
        }

        let mut pixels = RgbImage::from_pixel(width, height, BACKGROUND);
        let origin = self.origin(&request.text, width, height);

        let font = self.font.font();
        let scale = self.font.scale();
        let scaled = font.as_scaled(scale);

        let mut cursor_x = origin.x as f32;
        let baseline = origin.baseline as f32;
        let mut prev: Option<GlyphId> = None;

        for c in request.text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                cursor_x += scaled.kern(prev, id);
            }

            let glyph = id.with_scale_and_position(scale, point(cursor_x, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let x = bounds.min.x as i64 + gx as i64;
                    let y = bounds.min.y as i64 + gy as i64;
                    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                        return;
                    }

                    let pixel = pixels.get_pixel_mut(x as u32, y as u32);
                    *pixel = blend(*pixel, request.foreground, coverage);
                });
            }

            cursor_x += scaled.h_advance(id);
            prev = Some(id);
        }

        Ok(RenderedImage {
            pixels,
            width,
            height,
        })
    }
}

/// Mix `fg` over `bg` by glyph coverage.
fn blend(bg: Rgb<u8>, fg: Rgb<u8>, coverage: f32) -> Rgb<u8> {
    let a = coverage.clamp(0.0, 1.0);
    let mix = |b: u8, f: u8| -> u8 { (f as f32 * a + b as f32 * (1.0 - a)).round() as u8 };
    Rgb([mix(bg[0], fg[0]), mix(bg[1], fg[1]), mix(bg[2], fg[2])])
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
