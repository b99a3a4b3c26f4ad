//! Long-stitch flattening: break over-long sewn segments into shorter ones.
//!
//! Machines clamp the per-record move, and some formats (PEC's short
//! form) cannot express moves past 63 units.  Flattening inserts
//! evenly-spaced intermediate stitches so that no sewn segment's
//! per-axis delta exceeds the limit.
//!
//! Jump segments are left alone: a jump is a frame move, not a stitch,
//! and interpolating it would sew thread where none should be.

use crate::types::{Design, DesignError};

/// Subdivide sewn segments so no segment has `max(|dx|, |dy|) > max_length`.
///
/// A segment whose larger axis delta `dmax` exceeds `max_length` is
/// replaced by `floor(dmax / max_length) + 1` equal steps ending exactly
/// on the original stitch.  Segments within the limit, and all segments
/// ending in a jump, are kept as-is.
///
/// Returns the design unchanged when `max_length` is non-positive or the
/// design has fewer than 2 stitches.
///
/// # Errors
///
/// Returns [`DesignError::EmptyDesign`] if the design has no stitches.
///
/// # Examples
///
/// ```
/// use stitchcode_pipeline::{Design, Stitch};
/// use stitchcode_pipeline::flatten::flatten;
///
/// let design = Design::new(vec![Stitch::new(0.0, 0.0), Stitch::new(300.0, 0.0)]);
/// let flat = flatten(design, 127.0).unwrap();
/// // 300 / 127 = 2, + 1 = 3 steps of 100
/// assert_eq!(flat.len(), 4);
/// ```
pub fn flatten(design: Design, max_length: f64) -> Result<Design, DesignError> {
    design.ensure_not_empty()?;
    let stitches = design.stitches();
    if stitches.len() < 2 || max_length <= 0.0 {
        return Ok(design);
    }

    let before = stitches.len();
    let mut result = Vec::with_capacity(stitches.len());
    result.push(stitches[0]);

    for window in stitches.windows(2) {
        let (a, b) = (window[0], window[1]);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let dmax = dx.abs().max(dy.abs());

        if dmax > max_length && !b.jump {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_precision_loss
            )]
            let steps = (dmax / max_length).floor() as usize + 1;
            #[allow(clippy::cast_precision_loss)]
            let steps_f = steps as f64;
            for i in 1..steps {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f64 / steps_f;
                result.push(b.moved_to(dx.mul_add(t, a.x), dy.mul_add(t, a.y)));
            }
        }
        result.push(b);
    }

    tracing::debug!(before, after = result.len(), max_length, "flatten");
    Ok(Design::new(result))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Stitch;

    fn design(coords: &[(f64, f64)]) -> Design {
        coords.iter().map(|&(x, y)| Stitch::new(x, y)).collect()
    }

    fn max_axis_delta(d: &Design) -> f64 {
        d.stitches()
            .windows(2)
            .map(|w| (w[1].x - w[0].x).abs().max((w[1].y - w[0].y).abs()))
            .fold(0.0, f64::max)
    }

    // --- No-op cases ---

    #[test]
    fn empty_design_is_error() {
        assert_eq!(flatten(Design::default(), 10.0), Err(DesignError::EmptyDesign));
    }

    #[test]
    fn single_stitch_returns_unchanged() {
        let d = design(&[(1.0, 2.0)]);
        assert_eq!(flatten(d.clone(), 10.0).unwrap(), d);
    }

    #[test]
    fn short_segment_returns_unchanged() {
        let d = design(&[(0.0, 0.0), (50.0, -30.0)]);
        assert_eq!(flatten(d.clone(), 63.0).unwrap(), d);
    }

    #[test]
    fn segment_exactly_max_length_not_split() {
        let d = design(&[(0.0, 0.0), (63.0, 0.0)]);
        assert_eq!(flatten(d, 63.0).unwrap().len(), 2);
    }

    #[test]
    fn non_positive_max_length_returns_unchanged() {
        let d = design(&[(0.0, 0.0), (500.0, 0.0)]);
        assert_eq!(flatten(d.clone(), 0.0).unwrap().len(), 2);
        assert_eq!(flatten(d, -5.0).unwrap().len(), 2);
    }

    #[test]
    fn jump_segment_is_not_split() {
        let d = Design::new(vec![Stitch::new(0.0, 0.0), Stitch::jump_to(1000.0, 0.0)]);
        let flat = flatten(d, 63.0).unwrap();
        assert_eq!(flat.len(), 2);
        assert!(flat.stitches()[1].jump);
    }

    // --- Splitting cases ---

    #[test]
    fn long_segment_split_into_equal_steps() {
        let d = design(&[(0.0, 0.0), (300.0, 0.0)]);
        let flat = flatten(d, 127.0).unwrap();
        let xs: Vec<f64> = flat.stitches().iter().map(|s| s.x).collect();
        assert_eq!(xs.len(), 4);
        let eps = 1e-9;
        assert!((xs[1] - 100.0).abs() < eps);
        assert!((xs[2] - 200.0).abs() < eps);
        assert!((xs[3] - 300.0).abs() < eps);
    }

    #[test]
    fn step_count_uses_larger_axis() {
        // dmax = 200 on y; 200 / 63 = 3, + 1 = 4 steps.
        let d = design(&[(0.0, 0.0), (20.0, -200.0)]);
        let flat = flatten(d, 63.0).unwrap();
        assert_eq!(flat.len(), 5);
        assert!((flat.stitches()[1].y + 50.0).abs() < 1e-9);
        assert!((flat.stitches()[1].x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn inserted_stitches_inherit_color() {
        let d = Design::new(vec![
            Stitch::new(0.0, 0.0),
            Stitch::new(200.0, 0.0).with_color(4),
        ]);
        let flat = flatten(d, 63.0).unwrap();
        assert!(flat.stitches()[1..].iter().all(|s| s.color == 4 && !s.jump));
    }

    #[test]
    fn no_segment_exceeds_max_and_endpoints_preserved() {
        let d = Design::new(vec![
            Stitch::new(0.3, -0.7),
            Stitch::new(500.0, 0.0),
            Stitch::new(500.0, 333.3),
            Stitch::jump_to(-800.0, 10.0),
            Stitch::new(-100.0, -1000.0),
            Stitch::new(-99.0, -999.0),
        ]);
        let max_len = 63.0;
        let flat = flatten(d.clone(), max_len).unwrap();

        assert_eq!(flat.first(), d.first());
        assert_eq!(flat.last(), d.last());
        for w in flat.stitches().windows(2) {
            if w[1].jump {
                continue;
            }
            let dm = (w[1].x - w[0].x).abs().max((w[1].y - w[0].y).abs());
            assert!(dm <= max_len + 1e-9, "segment delta {dm} exceeds {max_len}");
        }
    }

    #[test]
    fn sewn_only_design_fully_bounded() {
        let d = design(&[(0.0, 0.0), (1000.0, 10.0), (-3000.0, 77.0)]);
        let flat = flatten(d, 127.0).unwrap();
        assert!(max_axis_delta(&flat) <= 127.0 + 1e-9);
    }
}
