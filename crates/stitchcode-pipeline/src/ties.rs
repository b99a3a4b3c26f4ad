//! Tie-stitch ("endstitch") insertion.
//!
//! Long moves and jumps leave thread that can pull loose when the
//! machine does not lock it.  A tie is a short back-and-forth stitch
//! anchored on the stitch at either end of the move.
//!
//! Inserted points are computed from quantized stitch positions.  A
//! missing neighbour or a zero-length direction vector skips that tie
//! silently; neither is an error.

use crate::geometry::{max_axis_delta, offset, unit_direction};
use crate::types::{Design, DesignError, Stitch};

/// A sewn stitch at `(x, y)` with the given color.
const fn sewn(x: f64, y: f64, color: u32) -> Stitch {
    Stitch {
        x,
        y,
        jump: false,
        color,
    }
}

/// Insert ties around every segment longer than `max_stitch_length`.
///
/// For a segment from `a` to `b` whose larger axis delta exceeds the
/// limit, the output carries:
///
/// 1. a point `length` units from `a` toward `b`,
/// 2. `a` again,
/// 3. `b`,
/// 4. a point `length` units back from `b` toward `a`,
/// 5. `b` again.
///
/// The repeated `a` and `b` are exact copies, jump flag included; only
/// the two offset points are always sewn.  Segments within the limit
/// pass through unchanged.  Designs with a single stitch are returned
/// as-is.
///
/// # Errors
///
/// Returns [`DesignError::EmptyDesign`] if the design has no stitches.
pub fn add_endstitches(
    design: Design,
    length: f64,
    max_stitch_length: f64,
) -> Result<Design, DesignError> {
    design.ensure_not_empty()?;
    let stitches = design.stitches();
    if stitches.len() < 2 {
        return Ok(design);
    }

    let mut out = Vec::with_capacity(stitches.len());
    out.push(stitches[0]);

    for w in stitches.windows(2) {
        let (prev, stitch) = (w[0], w[1]);
        let from = prev.rounded();
        let to = stitch.rounded();

        let direction = if max_axis_delta(from, to) > max_stitch_length {
            unit_direction(from, to)
        } else {
            None
        };

        match direction {
            Some(dir) => {
                let (sx, sy) = offset(from, dir, length);
                let (ex, ey) = offset(to, dir, -length);
                out.push(sewn(sx, sy, stitch.color));
                out.push(prev);
                out.push(stitch);
                out.push(sewn(ex, ey, stitch.color));
                out.push(stitch);
            }
            None => out.push(stitch),
        }
    }

    tracing::debug!(
        before = stitches.len(),
        after = out.len(),
        length,
        max_stitch_length,
        "add endstitches",
    );
    Ok(Design::new(out))
}

/// Insert ties before and after every jump stitch.
///
/// For a jump at index `j`:
///
/// - **Before the jump**: a back-tack along the last sewn segment
///   `j-2 → j-1` (a point `length` units back from `j-1`, then `j-1`
///   again).  Skipped when `j < 2` or the segment has zero length.
/// - **After the jump**: a tie at the landing point `j`, pointing toward
///   the next stitch `j+1` (a point `length` units toward it, then `j`
///   again).  Skipped when that direction has zero length.  When the
///   jump is the final stitch, the tie points back along the jump's own
///   arrival direction `j-1 → j`.
///
/// Non-jump stitches pass through unchanged.
///
/// # Errors
///
/// Returns [`DesignError::EmptyDesign`] if the design has no stitches.
pub fn add_endstitches_to_jumps(design: Design, length: f64) -> Result<Design, DesignError> {
    design.ensure_not_empty()?;
    let stitches = design.stitches();
    if stitches.len() < 2 {
        return Ok(design);
    }

    let mut out = Vec::with_capacity(stitches.len());
    out.push(stitches[0]);

    for (j, &stitch) in stitches.iter().enumerate().skip(1) {
        if !stitch.jump {
            out.push(stitch);
            continue;
        }

        let last_sewn = stitches[j - 1];
        if j >= 2 {
            let anchor = last_sewn.rounded();
            if let Some(dir) = unit_direction(stitches[j - 2].rounded(), anchor) {
                let (bx, by) = offset(anchor, dir, -length);
                out.push(sewn(bx, by, last_sewn.color));
                out.push(Stitch {
                    jump: false,
                    ..last_sewn
                });
            }
        }

        out.push(stitch);

        let landing = stitch.rounded();
        let direction = match stitches.get(j + 1) {
            Some(next) => unit_direction(landing, next.rounded()),
            None => unit_direction(landing, last_sewn.rounded()),
        };
        if let Some(dir) = direction {
            let (tx, ty) = offset(landing, dir, length);
            out.push(sewn(tx, ty, stitch.color));
            out.push(sewn(
                f64::from(landing.0),
                f64::from(landing.1),
                stitch.color,
            ));
        }
    }

    tracing::debug!(
        before = stitches.len(),
        after = out.len(),
        length,
        "add endstitches to jumps",
    );
    Ok(Design::new(out))
}
