//! Pfaff KSM codec.
//!
//! A zero-filled 512-byte header followed by 3-byte records
//! `[|dy|, |dx|, mode]`.  The mode byte starts from `0x80` for a plain
//! stitch, `0x99` when the thread color changes before this move, or
//! `0x82` for a jump.  Bit `0x20` marks `dy < 0` and bit `0x40` marks
//! `dx < 0`.
//!
//! Moves start at an implicit `(0, 0)`: the first stitch is written as
//! a move from there and decoding inserts no origin stitch.

use stitchcode_pipeline::{Design, Stitch};

use crate::bytes::Cursor;
use crate::chunk::{Origin, moves, split};
use crate::{Codec, CodecError};

/// Largest per-axis delta of one record.
pub const MAX_DELTA: i32 = 127;

/// Header size in bytes.
pub const HEADER_LEN: usize = 512;

const STITCH: u8 = 0x80;
const COLOR_CHANGE: u8 = 0x99;
const JUMP_BIT: u8 = 0x02;
const NEG_Y: u8 = 0x20;
const NEG_X: u8 = 0x40;

/// Pfaff KSM codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ksm;

impl Codec for Ksm {
    fn encode(&self, design: &Design) -> Result<Vec<u8>, CodecError> {
        let moves = moves(design, Origin::Zero)?;
        let mut out = vec![0; HEADER_LEN];

        for m in &moves {
            for (i, (dx, dy)) in split(m.dx, m.dy, MAX_DELTA)?.into_iter().enumerate() {
                let mut mode = if m.color_change && i == 0 {
                    COLOR_CHANGE
                } else {
                    STITCH
                };
                if m.jump {
                    mode |= JUMP_BIT;
                }
                if dy < 0 {
                    mode |= NEG_Y;
                }
                if dx < 0 {
                    mode |= NEG_X;
                }
                out.extend_from_slice(&[magnitude(dy), magnitude(dx), mode]);
            }
        }

        tracing::debug!(stitches = design.len(), bytes = out.len(), "encoded KSM");
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Design, CodecError> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::InvalidInput(format!(
                "KSM needs a {HEADER_LEN}-byte header, got {} bytes",
                bytes.len()
            )));
        }

        let mut cursor = Cursor::at(bytes, HEADER_LEN);
        let mut design = Design::default();
        let (mut x, mut y) = (0_i32, 0_i32);
        let mut color = 0_u32;

        while let Some(&[ay, ax, mode]) = cursor.take(3) {
            if mode & 0x19 == 0x19 {
                color = color.saturating_add(1);
            }
            let dy = if mode & NEG_Y == 0 {
                i32::from(ay)
            } else {
                -i32::from(ay)
            };
            let dx = if mode & NEG_X == 0 {
                i32::from(ax)
            } else {
                -i32::from(ax)
            };
            x += dx;
            y += dy;
            design.push(Stitch {
                x: f64::from(x),
                y: f64::from(y),
                jump: mode & JUMP_BIT != 0,
                color,
            });
        }
        if !cursor.is_empty() {
            tracing::warn!(offset = cursor.position(), "truncated KSM record");
        }

        tracing::debug!(bytes = bytes.len(), stitches = design.len(), "decoded KSM");
        Ok(design)
    }
}

/// `|v|` as a byte; `v` is within `±MAX_DELTA` after splitting.
#[allow(clippy::cast_possible_truncation)]
const fn magnitude(v: i32) -> u8 {
    v.unsigned_abs() as u8
}
