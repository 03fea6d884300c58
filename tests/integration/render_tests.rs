//! Rendering tests with the synthesized fixed-width font.
//!
//! At 40px the test font has ascent 32, line height 40, advance 24 and a
//! 16x28 box per glyph starting 4px after the pen position.

use textshot::render::{FontFace, JpegEncoder, RenderRequest, Renderer, CANVAS_WIDTH};

use super::test_utils::{is_valid_jpeg, lit_bounds, test_font, test_font_bytes};

#[test]
fn test_font_metrics() {
    let font = test_font(40.0);
    assert!((font.ascent() - 32.0).abs() < 0.01);
    assert!((font.descent() + 8.0).abs() < 0.01);
    assert!((font.line_height() - 40.0).abs() < 0.01);
    assert!((font.advance_width("A") - 24.0).abs() < 0.01);
    assert!((font.advance_width("AB C") - 96.0).abs() < 0.01);
    assert_eq!(font.name(), "<memory>");
}

#[test]
fn test_font_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("box.ttf");
    std::fs::write(&path, test_font_bytes()).unwrap();

    let font = FontFace::load(&path, 12.0).unwrap();
    assert_eq!(font.size_px(), 12.0);
    assert!(font.name().ends_with("box.ttf"));
}

#[test]
fn test_single_glyph_is_centered() {
    let renderer = Renderer::new(test_font(40.0));
    let origin = renderer.origin("A", 240, 240);
    assert_eq!(origin.x, 108);
    assert_eq!(origin.baseline, 100);

    let image = renderer.render(&RenderRequest::new("A")).unwrap();
    assert_eq!(image.width, CANVAS_WIDTH);

    let (x0, y0, x1, y1) = lit_bounds(&image.pixels).expect("glyph should be drawn");
    assert!((x0 as i32 - 112).abs() <= 1, "min x {}", x0);
    assert!((x1 as i32 - 127).abs() <= 1, "max x {}", x1);
    // The box spans 0..700 units above the baseline, so ink ends on row 99.
    assert!((y0 as i32 - 72).abs() <= 1, "min y {}", y0);
    assert!((y1 as i32 - 99).abs() <= 1, "max y {}", y1);

    // The glyph box is centered horizontally within its advance, so the ink
    // is centered on the canvas as well.
    let ink_center = (x0 + x1 + 1) as f32 / 2.0;
    assert!((ink_center - 120.0).abs() <= 1.0);
}

#[test]
fn test_baseline_tracks_canvas_height() {
    let renderer = Renderer::new(test_font(40.0));

    // (101 - 40) / 2 floors to 30.
    assert_eq!(renderer.origin("A", 240, 101).baseline, 30);

    // A canvas shorter than the line puts the baseline above the top edge.
    assert_eq!(renderer.origin("A", 240, 10).baseline, -15);

    let image = renderer
        .render(&RenderRequest::with_canvas("A", 240, 101))
        .unwrap();
    let (_, y0, _, y1) = lit_bounds(&image.pixels).unwrap();
    assert!((y0 as i32 - 2).abs() <= 1, "min y {}", y0);
    assert!((y1 as i32 - 29).abs() <= 1, "max y {}", y1);
}

#[test]
fn test_text_run_is_centered() {
    let renderer = Renderer::new(test_font(40.0));
    let image = renderer.render(&RenderRequest::new("ABC")).unwrap();

    // Advance 72 -> pen starts at 84; first ink at 88, last ink ends at 84 + 48 + 20.
    let (x0, _, x1, _) = lit_bounds(&image.pixels).unwrap();
    assert!((x0 as i32 - 88).abs() <= 1);
    assert!((x1 as i32 - 151).abs() <= 1);
}

#[test]
fn test_background_is_black_and_space_draws_nothing() {
    let renderer = Renderer::new(test_font(40.0));
    let image = renderer.render(&RenderRequest::new(" ")).unwrap();
    assert!(lit_bounds(&image.pixels).is_none());
    assert!(image.pixels.pixels().all(|p| p.0 == [0, 0, 0]));
}

#[test]
fn test_wide_text_is_clipped() {
    let renderer = Renderer::new(test_font(40.0));
    let text = "W".repeat(40);
    let image = renderer.render(&RenderRequest::new(text)).unwrap();

    // Ink reaches both edges to within one advance; off-canvas pixels are dropped.
    let (x0, _, x1, _) = lit_bounds(&image.pixels).unwrap();
    assert!(x0 < 24, "min x {}", x0);
    assert!(x1 >= CANVAS_WIDTH - 24, "max x {}", x1);
}

#[test]
fn test_render_then_encode() {
    let renderer = Renderer::new(test_font(40.0));
    let image = renderer.render(&RenderRequest::new("hello")).unwrap();
    let encoded = JpegEncoder::new().encode(&image).unwrap();

    assert!(is_valid_jpeg(&encoded.bytes));
    let decoded = image::load_from_memory(&encoded.bytes).unwrap();
    assert_eq!(decoded.width(), 240);
    assert_eq!(decoded.height(), 240);
}
