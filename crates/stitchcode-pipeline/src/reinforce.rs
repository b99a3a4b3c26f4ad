//! Reinforcement patterns: triple stitch and redwork.
//!
//! Both replace each sewn segment with a multi-pass pattern offset
//! perpendicular to the segment by `length` units.  The perpendicular is
//! the segment direction rotated 90° counter-clockwise, `(-dy, dx)`.
//!
//! Neither transform is idempotent.  Running one on its own output
//! treats every inserted offset point as an ordinary segment and
//! reinforces it again.

use crate::geometry::{offset, unit_direction};
use crate::types::{Design, DesignError, Stitch};

/// Which offset pattern to emit for each segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Triple,
    RedWork,
}

/// Convert every sewn segment to a triple stitch.
///
/// For a segment `a → b` with perpendicular offset `n`, the output is
/// `b, b+n, a-n, a+n, b-n, b`.
///
/// # Errors
///
/// Returns [`DesignError::EmptyDesign`] if the design has no stitches.
pub fn to_triple_stitches(design: Design, length: f64) -> Result<Design, DesignError> {
    reinforce(design, length, Pattern::Triple)
}

/// Convert every sewn segment to redwork.
///
/// For a segment `a → b` with perpendicular offset `n`, the output is
/// the lozenge `b-n, a-n, b+n, a+n` followed by `b` twice, so the
/// destination is sewn into before the next segment leaves it.
///
/// # Errors
///
/// Returns [`DesignError::EmptyDesign`] if the design has no stitches.
pub fn to_red_work(design: Design, length: f64) -> Result<Design, DesignError> {
    reinforce(design, length, Pattern::RedWork)
}

fn reinforce(design: Design, length: f64, pattern: Pattern) -> Result<Design, DesignError> {
    design.ensure_not_empty()?;
    let stitches = design.stitches();
    if stitches.len() < 2 {
        return Ok(design);
    }

    let mut out = Vec::with_capacity(stitches.len() * 6);
    out.push(stitches[0]);

    for w in stitches.windows(2) {
        let (prev, stitch) = (w[0], w[1]);
        let from = prev.rounded();
        let to = stitch.rounded();

        let direction = if stitch.jump {
            None
        } else {
            unit_direction(from, to)
        };
        let Some((ux, uy)) = direction else {
            out.push(stitch);
            continue;
        };
        let normal = (-uy, ux);

        let at = |point: (i32, i32), sign: f64| {
            let (x, y) = offset(point, normal, sign * length);
            Stitch {
                x,
                y,
                jump: false,
                color: stitch.color,
            }
        };

        match pattern {
            Pattern::Triple => {
                out.push(stitch);
                out.push(at(to, 1.0));
                out.push(at(from, -1.0));
                out.push(at(from, 1.0));
                out.push(at(to, -1.0));
                out.push(stitch);
            }
            Pattern::RedWork => {
                out.push(at(to, -1.0));
                out.push(at(from, -1.0));
                out.push(at(to, 1.0));
                out.push(at(from, 1.0));
                out.push(stitch);
                out.push(stitch);
            }
        }
    }

    tracing::debug!(
        ?pattern,
        before = stitches.len(),
        after = out.len(),
        length,
        "reinforce",
    );
    Ok(Design::new(out))
}
