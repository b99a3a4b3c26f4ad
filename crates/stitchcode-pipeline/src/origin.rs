//! Pointwise coordinate transforms: origin translation and scaling.
//!
//! Both transforms touch only `x`/`y`; jump flags, colors, and the
//! stitch order pass through unchanged.

use crate::types::{Design, DesignError};

/// Shift the design so its bounding box starts at `(0, 0)`.
///
/// Subtracts the true bounding-box minimum from every stitch, so the
/// result always has `min_x == min_y == 0`.  Applying it twice is the
/// same as applying it once.
///
/// # Errors
///
/// Returns [`DesignError::EmptyDesign`] if the design has no stitches.
pub fn translate_to_origin(design: Design) -> Result<Design, DesignError> {
    let bounds = design.bounds().ok_or(DesignError::EmptyDesign)?;
    let (dx, dy) = (bounds.min_x, bounds.min_y);

    let translated: Design = design
        .into_stitches()
        .into_iter()
        .map(|s| s.moved_to(s.x - dx, s.y - dy))
        .collect();

    tracing::debug!(
        width_mm = bounds.width() / crate::types::UNITS_PER_MM,
        height_mm = bounds.height() / crate::types::UNITS_PER_MM,
        "translated to origin",
    );
    Ok(translated)
}

/// Multiply every coordinate by `factor` on both axes.
///
/// `factor == 1.0` returns bit-identical coordinates.
///
/// # Errors
///
/// Returns [`DesignError::EmptyDesign`] if the design has no stitches.
pub fn scale(design: Design, factor: f64) -> Result<Design, DesignError> {
    design.ensure_not_empty()?;
    Ok(design
        .into_stitches()
        .into_iter()
        .map(|s| s.moved_to(s.x * factor, s.y * factor))
        .collect())
}
