//! Shared layout for the SVG and PNG renderers.
//!
//! Both renderers draw the same picture: sewn segments in black, jump
//! segments in red when requested, and an optional blue cross on every
//! needle position.  A [`Canvas`] maps design coordinates (+Y up) to
//! image coordinates (+Y down) with a fixed border around the design.

use serde::{Deserialize, Serialize};
use stitchcode_pipeline::{Design, Stitch};

use crate::CodecError;

/// Border around the design, in design units.
pub const BORDER: f64 = 5.0;

/// Half-size of a stitch marker cross, in design units.
pub const MARKER_HALF_SIZE: f64 = 2.0;

/// Rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Draw a small cross at every sewn needle position.
    pub mark_stitches: bool,
    /// Draw jump segments in red instead of leaving them out.
    pub show_jumps: bool,
    /// Output pixels (or SVG user units) per design unit.
    pub scale: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mark_stitches: false,
            show_jumps: false,
            scale: 1.0,
        }
    }
}

/// Design-to-image coordinate mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    min_x: f64,
    max_y: f64,
    scale: f64,
    /// Image width in output units.
    pub width: f64,
    /// Image height in output units.
    pub height: f64,
}

impl Canvas {
    /// Fit a canvas around `design`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmptyDesign`] if the design has no stitches.
    /// Returns [`CodecError::Render`] if `scale` is not finite and positive.
    pub fn fit(design: &Design, scale: f64) -> Result<Self, CodecError> {
        let bounds = design.bounds().ok_or(CodecError::EmptyDesign)?;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CodecError::Render(format!(
                "scale must be finite and > 0, got {scale}"
            )));
        }
        Ok(Self {
            min_x: bounds.min_x,
            max_y: bounds.max_y,
            scale,
            width: 2.0f64.mul_add(BORDER, bounds.width()) * scale,
            height: 2.0f64.mul_add(BORDER, bounds.height()) * scale,
        })
    }

    /// Image position of a design point.
    #[must_use]
    pub fn map(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.min_x + BORDER) * self.scale,
            (self.max_y - y + BORDER) * self.scale,
        )
    }

    /// Marker half-size in output units.
    #[must_use]
    pub fn marker(&self) -> f64 {
        MARKER_HALF_SIZE * self.scale
    }
}

/// A line to draw, in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub from: (f64, f64),
    pub to: (f64, f64),
}

/// Everything a renderer has to draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// Sewn segments, drawn black.
    pub stitches: Vec<Line>,
    /// Jump segments, drawn red.  Empty unless `show_jumps`.
    pub jumps: Vec<Line>,
    /// Centers of marker crosses, drawn blue.  Empty unless `mark_stitches`.
    pub markers: Vec<(f64, f64)>,
}

impl Scene {
    /// Lay out `design` on `canvas`.
    ///
    /// A sewn stitch is marked, and so is the landing point of a jump
    /// that is followed by sewing.
    #[must_use]
    pub fn build(design: &Design, canvas: &Canvas, config: &RenderConfig) -> Self {
        let mut scene = Self::default();
        let pos = |s: &Stitch| canvas.map(s.x, s.y);
        let stitches = design.stitches();

        if config.mark_stitches
            && let Some(first) = stitches.first()
            && !first.jump
        {
            scene.markers.push(pos(first));
        }

        for w in stitches.windows(2) {
            let (last, stitch) = (&w[0], &w[1]);
            let line = Line {
                from: pos(last),
                to: pos(stitch),
            };
            if stitch.jump {
                if config.show_jumps {
                    scene.jumps.push(line);
                }
            } else {
                scene.stitches.push(line);
                if config.mark_stitches {
                    if last.jump {
                        scene.markers.push(pos(last));
                    }
                    scene.markers.push(pos(stitch));
                }
            }
        }
        scene
    }
}
