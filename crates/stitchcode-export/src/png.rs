//! PNG preview renderer.
//!
//! Rasterizes the same scene as the SVG renderer with `tiny-skia` on a
//! white background, then encodes it with the `image` crate.

use image::{ExtendedColorType, ImageEncoder, codecs::png::PngEncoder};
use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use stitchcode_pipeline::Design;

use crate::CodecError;
use crate::render::{Canvas, Line, RenderConfig, Scene};

#[allow(clippy::cast_possible_truncation)]
fn stroke_lines(pixmap: &mut Pixmap, lines: &[Line], rgb: [u8; 3], width: f64) {
    let mut pb = PathBuilder::new();
    for line in lines {
        pb.move_to(line.from.0 as f32, line.from.1 as f32);
        pb.line_to(line.to.0 as f32, line.to.1 as f32);
    }
    // Nothing to draw.
    let Some(path) = pb.finish() else {
        return;
    };

    let stroke = Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], 255);
    paint.anti_alias = true;

    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

fn marker_lines(markers: &[(f64, f64)], half: f64) -> Vec<Line> {
    markers
        .iter()
        .flat_map(|&(x, y)| {
            [
                Line {
                    from: (x - half, y - half),
                    to: (x + half, y + half),
                },
                Line {
                    from: (x - half, y + half),
                    to: (x + half, y - half),
                },
            ]
        })
        .collect()
}

/// Convert premultiplied RGBA to straight RGBA.
#[allow(clippy::cast_possible_truncation)]
fn unpremultiply(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for px in data.chunks_exact(4) {
        let a = px[3];
        if a == 0 {
            out.extend_from_slice(&[0, 0, 0, 0]);
        } else {
            let ch = |c: u8| (u16::from(c) * 255 / u16::from(a)) as u8;
            out.extend_from_slice(&[ch(px[0]), ch(px[1]), ch(px[2]), a]);
        }
    }
    out
}

/// Render `design` as PNG bytes.
///
/// One pixel per design unit at `scale = 1.0`.
///
/// # Errors
///
/// Returns [`CodecError::EmptyDesign`] if the design has no stitches, or
/// [`CodecError::Render`] if the canvas cannot be allocated or encoded.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_png(design: &Design, config: &RenderConfig) -> Result<Vec<u8>, CodecError> {
    let canvas = Canvas::fit(design, config.scale)?;
    let scene = Scene::build(design, &canvas, config);

    let width = canvas.width.ceil().max(1.0) as u32;
    let height = canvas.height.ceil().max(1.0) as u32;
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| CodecError::Render(format!("cannot allocate {width}x{height} canvas")))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let line_width = config.scale;
    stroke_lines(&mut pixmap, &scene.stitches, [0, 0, 0], line_width);
    stroke_lines(&mut pixmap, &scene.jumps, [255, 0, 0], line_width);
    stroke_lines(
        &mut pixmap,
        &marker_lines(&scene.markers, canvas.marker()),
        [0, 0, 255],
        line_width,
    );

    let rgba = unpremultiply(pixmap.data());
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(&rgba, width, height, ExtendedColorType::Rgba8)
        .map_err(|e| CodecError::Render(e.to_string()))?;

    tracing::debug!(width, height, bytes = buf.len(), "rendered PNG");
    Ok(buf)
}
