//! Quantized moves and over-limit splitting shared by the codecs.

use stitchcode_pipeline::Design;

use crate::CodecError;

/// One relative move to emit, in integer design units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub dx: i32,
    pub dy: i32,
    pub jump: bool,
    /// The thread color changes before this move.
    pub color_change: bool,
}

/// Where the first emitted move starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The first stitch is the origin and is not emitted (EXP, DST).
    FirstStitch,
    /// Moves start at an implicit `(0, 0)`; the first stitch is emitted
    /// as a move from there (KSM, PES).
    Zero,
}

/// Quantized relative moves between consecutive stitches.
///
/// # Errors
///
/// Returns [`CodecError::EmptyDesign`] if the design has no stitches.
pub fn moves(design: &Design, origin: Origin) -> Result<Vec<Move>, CodecError> {
    design.ensure_not_empty()?;
    let stitches = design.stitches();

    let (mut last, mut color, rest) = match origin {
        Origin::FirstStitch => (stitches[0].rounded(), stitches[0].color, &stitches[1..]),
        Origin::Zero => ((0, 0), 0, stitches),
    };

    let mut out = Vec::with_capacity(rest.len());
    for s in rest {
        let p = s.rounded();
        out.push(Move {
            dx: p.0 - last.0,
            dy: p.1 - last.1,
            jump: s.jump,
            color_change: s.color != color,
        });
        last = p;
        color = s.color;
    }
    Ok(out)
}

/// Split `(dx, dy)` into steps whose larger axis is at most `limit`.
///
/// A move within the limit is returned as a single step.  Otherwise it
/// becomes `n = dmax / limit + 1` steps: `n - 1` steps of the truncated
/// quotient `d / n`, then one step carrying the exact remainder, so the
/// steps always sum to the original delta.
///
/// When that remainder step would itself exceed `limit` (10 000 at 127
/// leaves 172), the steps end at the truncated positions `d * i / n`
/// instead, which spreads the remainder and keeps every step within
/// `ceil(|d| / n) <= limit`.
///
/// # Errors
///
/// Returns [`CodecError::EncodingLimitExceeded`] if a step still
/// exceeds `limit`.
pub fn split(dx: i32, dy: i32, limit: i32) -> Result<Vec<(i32, i32)>, CodecError> {
    let dmax = dx.unsigned_abs().max(dy.unsigned_abs());
    let limit_abs = limit.unsigned_abs();
    if dmax <= limit_abs {
        return Ok(vec![(dx, dy)]);
    }

    let n = i64::from(dmax / limit_abs + 1);
    let (dx64, dy64) = (i64::from(dx), i64::from(dy));
    let within = |x: i64, y: i64| x.unsigned_abs().max(y.unsigned_abs()) <= u64::from(limit_abs);

    let (qx, qy) = (dx64 / n, dy64 / n);
    let (rx, ry) = (dx64 - (n - 1) * qx, dy64 - (n - 1) * qy);
    let ends: Vec<(i64, i64)> = if within(rx, ry) {
        (1..=n)
            .map(|i| if i < n { (qx * i, qy * i) } else { (dx64, dy64) })
            .collect()
    } else {
        tracing::trace!(dx, dy, limit, "remainder step over limit, spreading");
        (1..=n).map(|i| (dx64 * i / n, dy64 * i / n)).collect()
    };

    let mut steps = Vec::with_capacity(ends.len());
    let (mut px, mut py) = (0_i64, 0_i64);
    for (x, y) in ends {
        let step = (narrow(x - px)?, narrow(y - py)?);
        if step.0.unsigned_abs() > limit_abs || step.1.unsigned_abs() > limit_abs {
            return Err(CodecError::EncodingLimitExceeded {
                dx: step.0,
                dy: step.1,
                limit,
            });
        }
        steps.push(step);
        (px, py) = (x, y);
    }
    tracing::trace!(dx, dy, limit, steps = steps.len(), "split move");
    Ok(steps)
}

fn narrow(v: i64) -> Result<i32, CodecError> {
    i32::try_from(v).map_err(|_| CodecError::EncodingLimitExceeded {
        dx: i32::MAX,
        dy: i32::MAX,
        limit: i32::MAX,
    })
}
