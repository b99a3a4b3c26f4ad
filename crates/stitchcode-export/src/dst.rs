//! Tajima DST codec.
//!
//! A 512-byte text header, each field ending in `0A 1A`, followed by
//! 3-byte records.  Each record moves by a sum of balanced-ternary
//! weights {1, 3, 9, 27, 81} per axis, so a single record reaches ±121.  Byte 2 also carries the control bits:
//! `0x80` jump, `0x40` color change (always together with jump), and the
//! constant `0x03`.  `00 00 F3` ends the stream.
//!
//! The first design stitch is the origin and is not written.  Decoding
//! starts with a `(0, 0)` stitch.

use stitchcode_pipeline::{Design, Stitch};

use crate::bytes::Cursor;
use crate::chunk::{Origin, moves, split};
use crate::{Codec, CodecError};

/// Largest per-axis delta of one record (1 + 3 + 9 + 27 + 81).
pub const MAX_DELTA: i32 = 121;

/// Header size in bytes.
pub const HEADER_LEN: usize = 512;

const BYTE2_BASE: u8 = 0x03;
const JUMP_BIT: u8 = 0x80;
const COLOR_BIT: u8 = 0x40;
const END_RECORD: [u8; 3] = [0x00, 0x00, 0xF3];
const COLOR_RECORD: [u8; 3] = [0x00, 0x00, 0xC3];
/// Ends every header field.
const FIELD_END: [u8; 2] = [0x0A, 0x1A];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// `(byte index, bit, axis, signed weight)` for every displacement bit.
const BITS: [(usize, u8, Axis, i32); 20] = [
    (0, 0x01, Axis::X, 1),
    (0, 0x02, Axis::X, -1),
    (0, 0x04, Axis::X, 9),
    (0, 0x08, Axis::X, -9),
    (0, 0x10, Axis::Y, -9),
    (0, 0x20, Axis::Y, 9),
    (0, 0x40, Axis::Y, -1),
    (0, 0x80, Axis::Y, 1),
    (1, 0x01, Axis::X, 3),
    (1, 0x02, Axis::X, -3),
    (1, 0x04, Axis::X, 27),
    (1, 0x08, Axis::X, -27),
    (1, 0x10, Axis::Y, -27),
    (1, 0x20, Axis::Y, 27),
    (1, 0x40, Axis::Y, -3),
    (1, 0x80, Axis::Y, 3),
    (2, 0x04, Axis::X, 81),
    (2, 0x08, Axis::X, -81),
    (2, 0x10, Axis::Y, -81),
    (2, 0x20, Axis::Y, 81),
];

/// Tajima DST codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dst {
    /// Design name written to the `LA` header field (16 characters max).
    pub label: String,
}

impl Default for Dst {
    fn default() -> Self {
        Self {
            label: String::from("Untitled"),
        }
    }
}

impl Codec for Dst {
    fn encode(&self, design: &Design) -> Result<Vec<u8>, CodecError> {
        let moves = moves(design, Origin::FirstStitch)?;

        let mut records = Vec::with_capacity(moves.len() * 3);
        let mut color_changes = 0_usize;
        for m in &moves {
            if m.color_change {
                records.extend_from_slice(&COLOR_RECORD);
                color_changes += 1;
            }
            for (dx, dy) in split(m.dx, m.dy, MAX_DELTA)? {
                records.extend_from_slice(&encode_record(dx, dy, m.jump));
            }
        }
        records.extend_from_slice(&END_RECORD);

        let mut out = header(&self.label, design, records.len() / 3, color_changes);
        out.extend_from_slice(&records);

        tracing::debug!(stitches = design.len(), bytes = out.len(), "encoded DST");
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Design, CodecError> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::InvalidInput(format!(
                "DST needs a {HEADER_LEN}-byte header, got {} bytes",
                bytes.len()
            )));
        }
        if !bytes.starts_with(b"LA:") {
            return Err(CodecError::InvalidInput(
                "DST header does not start with \"LA:\"".to_string(),
            ));
        }

        let mut cursor = Cursor::at(bytes, HEADER_LEN);
        let mut design = Design::new(vec![Stitch::new(0.0, 0.0)]);
        let (mut x, mut y) = (0_i32, 0_i32);
        let mut color = 0_u32;
        let mut ended = false;

        while let Some(record) = cursor.take(3) {
            let b2 = record[2];
            if b2 & 0xF3 == 0xF3 {
                ended = true;
                break;
            }
            if b2 & COLOR_BIT != 0 {
                color = color.saturating_add(1);
                continue;
            }
            let (dx, dy) = decode_record([record[0], record[1], b2]);
            x += dx;
            y += dy;
            design.push(Stitch {
                x: f64::from(x),
                y: f64::from(y),
                jump: b2 & JUMP_BIT != 0,
                color,
            });
        }
        if !ended {
            tracing::warn!(
                trailing = bytes.len() - cursor.position(),
                "DST stream has no end record",
            );
        }

        tracing::debug!(bytes = bytes.len(), stitches = design.len(), "decoded DST");
        Ok(design)
    }
}

/// Balanced-ternary digits of `v`, largest weight first.
///
/// Adds `±w` whenever the remainder is closer to `±w` than to zero,
/// which leaves a zero remainder for every `|v| <= 121`.
fn ternary(v: i32) -> impl Iterator<Item = i32> {
    let mut rest = v;
    [81, 27, 9, 3, 1].into_iter().filter_map(move |w| {
        if 2 * rest.abs() > w {
            let term = w * rest.signum();
            rest -= term;
            Some(term)
        } else {
            None
        }
    })
}

fn encode_record(dx: i32, dy: i32, jump: bool) -> [u8; 3] {
    let mut rec = [0, 0, BYTE2_BASE];
    if jump {
        rec[2] |= JUMP_BIT;
    }
    for (axis, v) in [(Axis::X, dx), (Axis::Y, dy)] {
        for term in ternary(v) {
            if let Some(&(byte, bit, ..)) = BITS.iter().find(|b| b.2 == axis && b.3 == term) {
                rec[byte] |= bit;
            }
        }
    }
    rec
}

fn decode_record(rec: [u8; 3]) -> (i32, i32) {
    BITS.iter()
        .filter(|(byte, bit, ..)| rec[*byte] & bit != 0)
        .fold((0, 0), |(x, y), &(_, _, axis, w)| match axis {
            Axis::X => (x + w, y),
            Axis::Y => (x, y + w),
        })
}

/// Build the 512-byte header.
///
/// Extents and the end offset are measured from the first stitch, which
/// is where the machine starts.
fn header(label: &str, design: &Design, record_count: usize, color_changes: usize) -> Vec<u8> {
    let origin = design.first().map_or((0, 0), |s| s.rounded());
    let (mut max_x, mut min_x, mut max_y, mut min_y) = (0, 0, 0, 0);
    for s in design.stitches() {
        let (x, y) = s.rounded();
        max_x = max_x.max(x - origin.0);
        min_x = min_x.min(x - origin.0);
        max_y = max_y.max(y - origin.1);
        min_y = min_y.min(y - origin.1);
    }
    let end = design
        .last()
        .map_or((0, 0), |s| (s.rounded().0 - origin.0, s.rounded().1 - origin.1));

    let label: String = label.chars().filter(char::is_ascii).take(16).collect();
    let fields = [
        format!("LA:{label:<16}"),
        format!("ST:{record_count:>7}"),
        format!("CO:{color_changes:>3}"),
        format!("+X:{max_x:>5}"),
        format!("-X:{:>5}", -min_x),
        format!("+Y:{max_y:>5}"),
        format!("-Y:{:>5}", -min_y),
        format!("AX:{}{:>5}", sign(end.0), end.0.abs()),
        format!("AY:{}{:>5}", sign(end.1), end.1.abs()),
        String::from("MX:+    0"),
        String::from("MY:+    0"),
        String::from("PD:******"),
    ];

    let mut out = Vec::with_capacity(HEADER_LEN);
    for field in &fields {
        out.extend_from_slice(field.as_bytes());
        out.extend_from_slice(&FIELD_END);
    }
    out.truncate(HEADER_LEN);
    out.resize(HEADER_LEN, b' ');
    out
}

const fn sign(v: i32) -> char {
    if v < 0 { '-' } else { '+' }
}
