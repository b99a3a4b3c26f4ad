//! Melco EXP codec.
//!
//! A headerless stream of signed byte pairs `(dx, dy)`, each byte
//! stored as `v & 0xFF`.  Control records start with `0x80`:
//!
//! | Bytes | Meaning |
//! |-------|---------|
//! | `80 04` + pair | jump by the following pair |
//! | `80 02` / `80 00` + pair | jump (older writers) |
//! | `80 01 00 00` | color change |
//!
//! The first design stitch is the origin and is not written.  Decoding
//! therefore starts with a `(0, 0)` stitch.

use stitchcode_pipeline::{Design, Stitch};

use crate::bytes::Cursor;
use crate::chunk::{Origin, moves, split};
use crate::{Codec, CodecError};

/// Largest per-axis delta of one record.
pub const MAX_DELTA: i32 = 127;

const CONTROL: u8 = 0x80;
const COLOR_CHANGE: u8 = 0x01;
const JUMP: u8 = 0x04;

/// Melco EXP codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exp;

impl Codec for Exp {
    fn encode(&self, design: &Design) -> Result<Vec<u8>, CodecError> {
        let moves = moves(design, Origin::FirstStitch)?;
        let mut out = Vec::with_capacity(moves.len() * 2);

        for m in &moves {
            if m.color_change {
                out.extend_from_slice(&[CONTROL, COLOR_CHANGE, 0x00, 0x00]);
            }
            for (dx, dy) in split(m.dx, m.dy, MAX_DELTA)? {
                if m.jump {
                    out.extend_from_slice(&[CONTROL, JUMP]);
                }
                out.push(low_byte(dx));
                out.push(low_byte(dy));
            }
        }

        tracing::debug!(stitches = design.len(), bytes = out.len(), "encoded EXP");
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Design, CodecError> {
        let mut cursor = Cursor::new(bytes);
        let mut design = Design::new(vec![Stitch::new(0.0, 0.0)]);
        let (mut x, mut y) = (0_i32, 0_i32);
        let mut color = 0_u32;

        while !cursor.is_empty() {
            let mut jump = false;
            if cursor.peek() == Some(CONTROL) {
                let Some(&[_, code]) = cursor.take(2) else {
                    tracing::warn!(offset = cursor.position(), "truncated EXP control record");
                    break;
                };
                match code {
                    COLOR_CHANGE => {
                        if cursor.take(2).is_none() {
                            tracing::warn!("truncated EXP color change");
                            break;
                        }
                        color = color.saturating_add(1);
                        continue;
                    }
                    0x00 | 0x02 | JUMP => jump = true,
                    other => {
                        tracing::warn!(code = other, "unknown EXP control code, treating as jump");
                        jump = true;
                    }
                }
            }

            let Some(&[bx, by]) = cursor.take(2) else {
                tracing::warn!(offset = cursor.position(), "truncated EXP record");
                break;
            };
            let (dx, dy) = (signed(bx), signed(by));
            x += dx;
            y += dy;
            if jump || dx != 0 || dy != 0 {
                let stitch = Stitch {
                    x: f64::from(x),
                    y: f64::from(y),
                    jump,
                    color,
                };
                design.push(stitch);
            }
        }

        tracing::debug!(bytes = bytes.len(), stitches = design.len(), "decoded EXP");
        Ok(design)
    }
}

/// Two's-complement low byte of a delta in `-128..=127`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn low_byte(v: i32) -> u8 {
    (v & 0xFF) as u8
}

/// Interpret a byte as a signed delta.
fn signed(b: u8) -> i32 {
    i32::from(i8::from_ne_bytes([b]))
}
