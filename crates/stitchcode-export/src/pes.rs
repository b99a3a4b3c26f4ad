//! Brother PES codec.
//!
//! A PES file wraps a PEC block, which is what the machine actually sews.
//! The writer produces a version-1 container:
//!
//! - `#PES0001`, the PEC block offset, and a short hoop preamble.
//! - A `CEmbOne` block with the design extents and an identity transform.
//! - A `CSewSeg` block listing absolute coordinates in runs of equal
//!   `(jump, color)`, followed by the color table.
//! - The PEC block: a 512-byte header with the label and color indices,
//!   a 20-byte stitch header, variable-width stitch codes, and 48x38
//!   monochrome thumbnails.
//!
//! The reader only needs the PEC stitch codes.  Each axis is either one
//! byte (`-64..=63`, seven-bit two's complement) or two bytes
//! `0x80 | flags | high nibble, low byte` holding a 12-bit signed value.
//! Flag `0x10` marks a jump and `0x20` a trim; both decode as jumps.
//! PEC's Y axis points down, so Y is negated both ways.

use std::fmt::Write as _;

use stitchcode_pipeline::{Bounds, Design, Stitch};

use crate::bytes::Cursor;
use crate::chunk::{Origin, moves, split};
use crate::{Codec, CodecError};

/// Largest per-axis delta of one long-form stitch code.
pub const MAX_DELTA: i32 = 2047;

/// Size of the PEC header that precedes the stitch header.
pub const PEC_HEADER_LEN: usize = 512;

/// Size of the stitch header that precedes the stitch codes.
pub const STITCH_HEADER_LEN: usize = 20;

/// Thumbnail width in pixels.
pub const THUMB_WIDTH: usize = 48;

/// Thumbnail height in pixels.
pub const THUMB_HEIGHT: usize = 38;

const THUMB_ROW_BYTES: usize = THUMB_WIDTH / 8;
const THUMB_LEN: usize = THUMB_ROW_BYTES * THUMB_HEIGHT;
const THUMB_MARGIN: f64 = 3.0;

const MAGIC: &[u8; 4] = b"#PES";
const LONG_FORM: u8 = 0x80;
const JUMP_FLAG: u8 = 0x10;
const TRIM_FLAG: u8 = 0x20;
const COLOR_CHANGE: [u8; 2] = [0xFE, 0xB0];
const END: u8 = 0xFF;
const BLOCK_SEPARATOR: [u8; 4] = [0xFF, 0xFF, 0x00, 0x00];
const RUN_SEPARATOR: u16 = 0x8003;

/// Brother PES codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pes {
    /// Design name written to the PEC `LA` field (16 characters max).
    pub label: String,
}

impl Default for Pes {
    fn default() -> Self {
        Self {
            label: String::from("Untitled"),
        }
    }
}

impl Codec for Pes {
    fn encode(&self, design: &Design) -> Result<Vec<u8>, CodecError> {
        let bounds = design.bounds().ok_or(CodecError::EmptyDesign)?;
        let extents = Extents::new(&bounds)?;

        let mut out = Vec::new();
        out.extend_from_slice(b"#PES0001");
        let offset_pos = out.len();
        put_u32(&mut out, 0);
        for v in [1, 1, 1] {
            put_u16(&mut out, v);
        }
        out.extend_from_slice(&BLOCK_SEPARATOR);
        emb_one(&mut out, &extents);
        out.extend_from_slice(&BLOCK_SEPARATOR);
        sew_seg(&mut out, design)?;

        let pec_offset = u32::try_from(out.len())
            .map_err(|_| CodecError::InvalidInput("design too large for PES".to_string()))?;
        out[offset_pos..offset_pos + 4].copy_from_slice(&pec_offset.to_le_bytes());

        pec(&mut out, &self.label, design, &bounds, &extents)?;

        tracing::debug!(stitches = design.len(), bytes = out.len(), "encoded PES");
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Design, CodecError> {
        if !bytes.starts_with(MAGIC) {
            return Err(CodecError::InvalidInput("missing #PES signature".to_string()));
        }
        let pec_offset = Cursor::at(bytes, 8)
            .u32_le()
            .ok_or_else(|| CodecError::InvalidInput("truncated PES header".to_string()))?;
        let start = usize::try_from(pec_offset)
            .ok()
            .and_then(|o| o.checked_add(PEC_HEADER_LEN + STITCH_HEADER_LEN))
            .filter(|&s| s <= bytes.len())
            .ok_or_else(|| {
                CodecError::InvalidInput(format!("PEC offset {pec_offset} is past end of file"))
            })?;

        let mut cursor = Cursor::at(bytes, start);
        let mut design = Design::default();
        let (mut x, mut y) = (0_i32, 0_i32);
        let mut color = 0_u32;

        loop {
            match cursor.peek() {
                None => {
                    tracing::warn!(
                        offset = cursor.position(),
                        "PEC stitches end without terminator"
                    );
                    break;
                }
                Some(END) => break,
                Some(b) if b == COLOR_CHANGE[0] => {
                    if cursor.take(3).is_none() {
                        tracing::warn!("truncated PEC color change");
                        break;
                    }
                    color = color.saturating_add(1);
                    continue;
                }
                Some(_) => {}
            }

            let Some((dx, jump_x)) = read_value(&mut cursor) else {
                tracing::warn!(offset = cursor.position(), "truncated PEC stitch");
                break;
            };
            let Some((dy, jump_y)) = read_value(&mut cursor) else {
                tracing::warn!(offset = cursor.position(), "truncated PEC stitch");
                break;
            };
            x += dx;
            y -= dy;
            design.push(Stitch {
                x: f64::from(x),
                y: f64::from(y),
                jump: jump_x || jump_y,
                color,
            });
        }

        tracing::debug!(bytes = bytes.len(), stitches = design.len(), "decoded PES");
        Ok(design)
    }
}

/// Read one axis value and whether it carries a jump or trim flag.
fn read_value(cursor: &mut Cursor<'_>) -> Option<(i32, bool)> {
    let b1 = cursor.u8()?;
    if b1 & LONG_FORM == 0 {
        let v = i32::from(b1);
        return Some((if v >= 0x40 { v - 0x80 } else { v }, false));
    }
    let b2 = cursor.u8()?;
    let raw = (i32::from(b1 & 0x0F) << 8) | i32::from(b2);
    let v = if raw & 0x800 == 0 { raw } else { raw - 0x1000 };
    Some((v, b1 & (JUMP_FLAG | TRIM_FLAG) != 0))
}

/// Append one axis value.  `v` is within `±MAX_DELTA`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn write_value(out: &mut Vec<u8>, v: i32, jump: bool) {
    if !jump && (-64..=63).contains(&v) {
        out.push((v & 0x7F) as u8);
    } else {
        let flag = if jump { JUMP_FLAG } else { 0 };
        out.push(LONG_FORM | flag | ((v >> 8) & 0x0F) as u8);
        out.push((v & 0xFF) as u8);
    }
}

/// Design extents in PEC orientation (Y down), as 16-bit integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Extents {
    left: i16,
    top: i16,
    right: i16,
    bottom: i16,
}

impl Extents {
    fn new(bounds: &Bounds) -> Result<Self, CodecError> {
        let min = Stitch::new(bounds.min_x, bounds.min_y).rounded();
        let max = Stitch::new(bounds.max_x, bounds.max_y).rounded();
        Ok(Self {
            left: coord(min.0, min.1)?,
            top: coord(-max.1, max.0)?,
            right: coord(max.0, max.1)?,
            bottom: coord(-min.1, min.0)?,
        })
    }

    fn width(&self) -> u16 {
        span(self.left, self.right)
    }

    fn height(&self) -> u16 {
        span(self.top, self.bottom)
    }
}

fn span(lo: i16, hi: i16) -> u16 {
    (i32::from(hi) - i32::from(lo))
        .unsigned_abs()
        .try_into()
        .unwrap_or(u16::MAX)
}

/// Narrow an absolute coordinate to `i16`; `other` is reported alongside.
fn coord(v: i32, other: i32) -> Result<i16, CodecError> {
    i16::try_from(v).map_err(|_| CodecError::EncodingLimitExceeded {
        dx: v,
        dy: other,
        limit: i32::from(i16::MAX),
    })
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_i16(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn block_name(out: &mut Vec<u8>, name: &str) {
    put_u16(out, u16::try_from(name.len()).unwrap_or(u16::MAX));
    out.extend_from_slice(name.as_bytes());
}

fn emb_one(out: &mut Vec<u8>, e: &Extents) {
    block_name(out, "CEmbOne");
    for _ in 0..2 {
        for v in [e.left, e.top, e.right, e.bottom] {
            put_i16(out, v);
        }
    }
    for v in [1.0_f32, 0.0, 0.0, 1.0, 0.0, 0.0] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    put_u16(out, 1);
    put_i16(out, 0);
    put_i16(out, 0);
    put_u16(out, e.width());
    put_u16(out, e.height());
    out.extend_from_slice(&[0; 8]);
}

/// Write the `CSewSeg` block: runs of absolute coordinates, then the
/// table of runs that start a new color.
fn sew_seg(out: &mut Vec<u8>, design: &Design) -> Result<(), CodecError> {
    block_name(out, "CSewSeg");

    let mut runs: Vec<&[Stitch]> = Vec::new();
    for group in design
        .stitches()
        .chunk_by(|a, b| a.jump == b.jump && a.color == b.color)
    {
        runs.extend(group.chunks(usize::from(u16::MAX)));
    }

    let mut color_starts: Vec<(u16, u16)> = Vec::new();
    let mut last_color = None;
    for (i, run) in runs.iter().enumerate() {
        let first = run[0];
        let color = u16::try_from(first.color).unwrap_or(u16::MAX);
        if i > 0 {
            put_u16(out, RUN_SEPARATOR);
        }
        if last_color != Some(first.color) {
            color_starts.push((u16::try_from(i).unwrap_or(u16::MAX), color));
            last_color = Some(first.color);
        }
        put_u16(out, u16::from(first.jump));
        put_u16(out, color);
        put_u16(out, u16::try_from(run.len()).unwrap_or(u16::MAX));
        for s in *run {
            let (x, y) = s.rounded();
            put_i16(out, coord(x, y)?);
            put_i16(out, coord(-y, x)?);
        }
    }

    put_u16(out, u16::try_from(color_starts.len()).unwrap_or(u16::MAX));
    for (run, color) in color_starts {
        put_u16(out, run);
        put_u16(out, color);
    }
    put_u16(out, 0);
    put_u16(out, 0);
    Ok(())
}

/// Index of the color block each stitch belongs to.
fn color_blocks(stitches: &[Stitch]) -> Vec<usize> {
    let mut block = 0;
    let mut prev = None;
    stitches
        .iter()
        .map(|s| {
            if prev.is_some_and(|c| c != s.color) {
                block += 1;
            }
            prev = Some(s.color);
            block
        })
        .collect()
}

/// PEC stitch codes, starting at `(0, 0)` and ending with the terminator.
fn stitch_codes(design: &Design) -> Result<Vec<u8>, CodecError> {
    let moves = moves(design, Origin::Zero)?;
    let mut out = Vec::with_capacity(moves.len() * 2 + 2);
    let mut toggle = 2;
    for m in &moves {
        if m.color_change {
            out.extend_from_slice(&COLOR_CHANGE);
            out.push(toggle);
            toggle = 3 - toggle;
        }
        for (dx, dy) in split(m.dx, m.dy, MAX_DELTA)? {
            write_value(&mut out, dx, m.jump);
            write_value(&mut out, -dy, m.jump);
        }
    }
    out.extend_from_slice(&[END, 0x00]);
    Ok(out)
}

/// Twelve-bit header offset of the design's top-left corner.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn corner(v: i16) -> u16 {
    0x9000 | ((-i32::from(v)) & 0x0FFF) as u16
}

fn pec(
    out: &mut Vec<u8>,
    label: &str,
    design: &Design,
    bounds: &Bounds,
    e: &Extents,
) -> Result<(), CodecError> {
    let start = out.len();
    let blocks = color_blocks(design.stitches());
    let block_colors: Vec<u32> = design
        .stitches()
        .chunk_by(|a, b| a.color == b.color)
        .map(|run| run[0].color)
        .collect();

    let label: String = label.chars().filter(char::is_ascii).take(16).collect();
    let mut text = String::new();
    let _ = write!(text, "LA:{label:<16}\r");
    out.extend_from_slice(text.as_bytes());
    out.extend_from_slice(&[b' '; 12]);
    out.extend_from_slice(&[0xFF, 0x00]);
    // thumbnail row bytes and height
    out.extend_from_slice(&[0x06, 0x26]);
    out.extend_from_slice(&[b' '; 12]);

    let listed = &block_colors[..block_colors.len().min(256)];
    out.push(u8::try_from(listed.len() - 1).unwrap_or(u8::MAX));
    out.extend(listed.iter().map(|&c| u8::try_from(c % 64 + 1).unwrap_or(1)));
    out.resize(start + PEC_HEADER_LEN, b' ');

    let codes = stitch_codes(design)?;
    let section = u32::try_from(codes.len() + STITCH_HEADER_LEN)
        .ok()
        .filter(|&n| n <= 0x00FF_FFFF)
        .ok_or_else(|| CodecError::InvalidInput("design too large for PEC".to_string()))?;
    out.extend_from_slice(&[0x00, 0x00]);
    out.extend_from_slice(&section.to_le_bytes()[..3]);
    out.extend_from_slice(&[0x31, 0xFF, 0xF0]);
    put_u16(out, e.width());
    put_u16(out, e.height());
    put_u16(out, 0x01E0);
    put_u16(out, 0x01B0);
    out.extend_from_slice(&corner(e.left).to_be_bytes());
    out.extend_from_slice(&corner(e.top).to_be_bytes());
    out.extend_from_slice(&codes);

    let stitches = design.stitches();
    out.extend_from_slice(&thumbnail(stitches, bounds, |_| true));
    for block in 0..block_colors.len() {
        out.extend_from_slice(&thumbnail(stitches, bounds, |i| blocks[i] == block));
    }
    Ok(())
}

/// 1bpp 48x38 picture of the sewn segments whose end stitch index
/// satisfies `include`.  Rows are 6 bytes, least significant bit first.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn thumbnail(
    stitches: &[Stitch],
    bounds: &Bounds,
    include: impl Fn(usize) -> bool,
) -> [u8; THUMB_LEN] {
    let mut bits = [0_u8; THUMB_LEN];
    let avail_w = 2.0f64.mul_add(-THUMB_MARGIN, THUMB_WIDTH as f64) - 1.0;
    let avail_h = 2.0f64.mul_add(-THUMB_MARGIN, THUMB_HEIGHT as f64) - 1.0;
    let fit = |extent: f64, avail: f64| {
        if extent > 0.0 {
            avail / extent
        } else {
            f64::INFINITY
        }
    };
    let mut scale = fit(bounds.width(), avail_w).min(fit(bounds.height(), avail_h));
    if !scale.is_finite() {
        scale = 0.0;
    }
    let map = |s: &Stitch| {
        (
            (s.x - bounds.min_x).mul_add(scale, THUMB_MARGIN),
            (bounds.max_y - s.y).mul_add(scale, THUMB_MARGIN),
        )
    };
    let mut set = |x: f64, y: f64| {
        let (col, row) = (x.round() as usize, y.round() as usize);
        if col < THUMB_WIDTH && row < THUMB_HEIGHT {
            bits[row * THUMB_ROW_BYTES + col / 8] |= 1 << (col % 8);
        }
    };

    for (i, w) in stitches.windows(2).enumerate() {
        if w[1].jump || !include(i + 1) {
            continue;
        }
        let (x0, y0) = map(&w[0]);
        let (x1, y1) = map(&w[1]);
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0);
        let n = steps as usize;
        for k in 0..=n {
            let t = k as f64 / steps;
            set((x1 - x0).mul_add(t, x0), (y1 - y0).mul_add(t, y0));
        }
    }
    bits
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pec_start(bytes: &[u8]) -> usize {
        u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize
    }

    fn codes(bytes: &[u8]) -> &[u8] {
        &bytes[pec_start(bytes) + PEC_HEADER_LEN + STITCH_HEADER_LEN..]
    }

    fn square() -> Design {
        Design::new(vec![
            Stitch::new(0.0, 0.0),
            Stitch::new(20.0, 0.0),
            Stitch::new(20.0, 20.0),
            Stitch::new(0.0, 20.0),
        ])
    }

    #[test]
    fn container_starts_with_signature() {
        let bytes = Pes::default().encode(&square()).unwrap();
        assert_eq!(&bytes[..8], b"#PES0001");
        assert_eq!(&bytes[22..24], [7, 0]);
        assert_eq!(&bytes[24..31], b"CEmbOne");
        let pec = pec_start(&bytes);
        assert_eq!(&bytes[pec..pec + 3], b"LA:");
    }

    #[test]
    fn sew_seg_block_present() {
        let bytes = Pes::default().encode(&square()).unwrap();
        let pos = bytes.windows(7).position(|w| w == b"CSewSeg").unwrap();
        // one run: flag 0, color 0, four stitches
        assert_eq!(&bytes[pos + 7..pos + 13], [0, 0, 0, 0, 4, 0]);
        // second stitch (20, 0) -> (20, -0)
        assert_eq!(&bytes[pos + 17..pos + 21], [20, 0, 0, 0]);
    }

    #[test]
    fn pec_header_layout() {
        let pes = Pes {
            label: "Rose".to_string(),
        };
        let d = Design::new(vec![
            Stitch::new(0.0, 0.0),
            Stitch::new(5.0, 0.0).with_color(3),
        ]);
        let bytes = pes.encode(&d).unwrap();
        let pec = &bytes[pec_start(&bytes)..];
        assert_eq!(&pec[..20], b"LA:Rose            \r");
        assert_eq!(&pec[32..36], [0xFF, 0x00, 0x06, 0x26]);
        assert_eq!(&pec[48..51], [1, 1, 4]);
        assert_eq!(pec[51], b' ');
        assert_eq!(&pec[PEC_HEADER_LEN + 5..PEC_HEADER_LEN + 8], [0x31, 0xFF, 0xF0]);
    }

    #[test]
    fn short_and_long_forms() {
        let d = Design::new(vec![
            Stitch::new(0.0, 0.0),
            Stitch::new(63.0, -64.0),
            Stitch::new(127.0, -64.0),
        ]);
        let bytes = Pes::default().encode(&d).unwrap();
        // Inverted y of 64 and x of 64 both need the long form.
        assert_eq!(
            codes(&bytes)[..10],
            [0x00, 0x00, 0x3F, 0x80, 0x40, 0x80, 0x40, 0x00, 0xFF, 0x00]
        );
    }

    #[test]
    fn jumps_always_long_form_with_flag() {
        let d = Design::new(vec![Stitch::jump_to(1.0, -2.0)]);
        let bytes = Pes::default().encode(&d).unwrap();
        assert_eq!(codes(&bytes)[..6], [0x90, 0x01, 0x90, 0x02, 0xFF, 0x00]);
    }

    #[test]
    fn color_changes_alternate() {
        let d = Design::new(vec![
            Stitch::new(0.0, 0.0),
            Stitch::new(1.0, 0.0).with_color(1),
            Stitch::new(2.0, 0.0).with_color(2),
        ]);
        let bytes = Pes::default().encode(&d).unwrap();
        assert_eq!(
            codes(&bytes)[..14],
            [0, 0, 0xFE, 0xB0, 2, 1, 0, 0xFE, 0xB0, 1, 1, 0, 0xFF, 0x00]
        );
    }

    #[test]
    fn thumbnails_follow_terminator() {
        let d = Design::new(vec![
            Stitch::new(0.0, 0.0),
            Stitch::new(10.0, 0.0),
            Stitch::new(20.0, 0.0).with_color(1),
        ]);
        let bytes = Pes::default().encode(&d).unwrap();
        let c = codes(&bytes);
        let end = c.windows(2).position(|w| w == [0xFF, 0x00]).unwrap() + 2;
        // full design plus two color blocks
        assert_eq!(c.len() - end, 3 * THUMB_LEN);
        assert!(c[end..end + THUMB_LEN].iter().any(|&b| b != 0));
    }

    #[test]
    fn thumbnail_draws_horizontal_line() {
        let d = [Stitch::new(0.0, 0.0), Stitch::new(100.0, 0.0)];
        let b = Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 100.0,
            max_y: 0.0,
        };
        let t = thumbnail(&d, &b, |_| true);
        // Row 3 from column 3 to column 44 is set.
        let row = &t[3 * THUMB_ROW_BYTES..4 * THUMB_ROW_BYTES];
        assert_eq!(row[0], 0b1111_1000);
        assert_eq!(row[5], 0b0001_1111);
        assert!(t[..3 * THUMB_ROW_BYTES].iter().all(|&b| b == 0));
    }

    #[test]
    fn coordinates_beyond_i16_rejected() {
        let d = Design::new(vec![Stitch::new(0.0, 0.0), Stitch::new(40_000.0, 0.0)]);
        assert!(matches!(
            Pes::default().encode(&d),
            Err(CodecError::EncodingLimitExceeded { .. })
        ));
    }

    #[test]
    fn decode_requires_signature() {
        assert!(matches!(
            Pes::default().decode(b"#PEC0001"),
            Err(CodecError::InvalidInput(_))
        ));
        let mut bytes = b"#PES0001".to_vec();
        bytes.extend_from_slice(&1000_u32.to_le_bytes());
        assert!(matches!(
            Pes::default().decode(&bytes),
            Err(CodecError::InvalidInput(_))
        ));
    }

    #[test]
    fn decode_sign_extends_long_form() {
        let mut bytes = b"#PES0001".to_vec();
        bytes.extend_from_slice(&12_u32.to_le_bytes());
        bytes.resize(12 + PEC_HEADER_LEN + STITCH_HEADER_LEN, 0);
        // x = -1 long, y = 0x7F short (-1 before inversion), trim flag
        bytes.extend_from_slice(&[0x8F, 0xFF, 0x7F, 0xA0, 0x05, 0x00, 0xFF]);
        let d = Pes::default().decode(&bytes).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.stitches()[0], Stitch::new(-1.0, 1.0));
        assert!(!d.stitches()[0].jump);
        assert_eq!(d.stitches()[1], Stitch::new(4.0, 1.0));
        assert!(d.stitches()[1].jump);
    }

    #[test]
    fn decode_stops_on_truncation() {
        let mut bytes = b"#PES0001".to_vec();
        bytes.extend_from_slice(&12_u32.to_le_bytes());
        bytes.resize(12 + PEC_HEADER_LEN + STITCH_HEADER_LEN, 0);
        bytes.extend_from_slice(&[0x05, 0x05, 0x90]);
        let d = Pes::default().decode(&bytes).unwrap();
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn round_trip() {
        let d = Design::new(vec![
            Stitch::new(-100.0, 50.0),
            Stitch::new(-40.3, 60.8),
            Stitch::jump_to(900.0, -700.0),
            Stitch::new(905.0, -690.0).with_color(2),
            Stitch::new(910.0, -700.0).with_color(2),
        ]);
        let pes = Pes::default();
        let back = pes.decode(&pes.encode(&d).unwrap()).unwrap();
        assert_eq!(back.len(), d.len());
        for (a, b) in d.stitches().iter().zip(back.stitches()) {
            assert!((a.x - b.x).abs() <= 1.0 && (a.y - b.y).abs() <= 1.0, "{a:?} {b:?}");
            assert_eq!(a.jump, b.jump);
        }
        assert_eq!(back.stitches()[3].color, 1);
        assert_eq!(back.color_changes(), 1);
    }
}
