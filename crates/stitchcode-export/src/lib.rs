//! stitchcode-export: Embroidery codecs and renderers (sans-IO).
//!
//! Binary codecs translate a [`Design`] to and from machine formats:
//!
//! | Format | Codec | Record limit | Leading `(0,0)` on decode |
//! |--------|-------|--------------|---------------------------|
//! | Melco EXP | [`Exp`] | ±127 | yes |
//! | Tajima DST | [`Dst`] | ±121 | yes |
//! | Pfaff KSM | [`Ksm`] | ±127 | no |
//! | Brother PES | [`Pes`] | ±2047 | no |
//!
//! Codecs quantize coordinates with [`Stitch::rounded`] at encode time
//! and split over-limit moves into equal sub-moves whose sum is exact.
//!
//! [`to_svg`] and [`to_png`] render a design for preview.  [`Format`]
//! maps file extensions to the right codec or renderer.
//!
//! Everything here works on in-memory byte slices.  The filesystem is
//! the binary's business.
//!
//! [`Stitch::rounded`]: stitchcode_pipeline::Stitch::rounded

mod bytes;
mod chunk;
pub mod dst;
pub mod exp;
pub mod format;
pub mod ksm;
pub mod pes;
pub mod png;
pub mod render;
pub mod svg;

pub use dst::Dst;
pub use exp::Exp;
pub use format::Format;
pub use ksm::Ksm;
pub use pes::Pes;
pub use png::to_png;
pub use render::RenderConfig;
pub use svg::to_svg;

use stitchcode_pipeline::{Design, DesignError};

/// A binary embroidery format.
///
/// `decode(encode(d))` reproduces the coordinates of `d` within ±1 unit
/// and keeps its jump flags and the positions of its color changes.
/// Decoded colors count changes from zero, so `0, 0, 3` comes back as
/// `0, 0, 1`.  Stitch count is kept as long as no move exceeds the
/// format's record limit.
pub trait Codec {
    /// Serialize `design` into the format's byte layout.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmptyDesign`] if the design has no stitches.
    fn encode(&self, design: &Design) -> Result<Vec<u8>, CodecError>;

    /// Parse a byte buffer into a design.
    ///
    /// Truncated trailing records are dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidInput`] if the buffer lacks the
    /// format's signature or header.
    fn decode(&self, bytes: &[u8]) -> Result<Design, CodecError>;
}

/// Errors from encoding, decoding, and rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The input buffer is not a valid file of this format.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Encoding or rendering was invoked on zero stitches.
    #[error("design has no stitches")]
    EmptyDesign,

    /// No format is registered for this file extension.
    #[error("unsupported file extension: {0:?}")]
    UnsupportedExtension(String),

    /// A move could not be represented after chunking.
    ///
    /// Chunking keeps every step within the limit, so this signals an
    /// internal bug rather than bad input.
    #[error("move ({dx}, {dy}) exceeds record limit {limit}")]
    EncodingLimitExceeded {
        /// Horizontal component of the offending move.
        dx: i32,
        /// Vertical component of the offending move.
        dy: i32,
        /// The format's per-record limit.
        limit: i32,
    },

    /// The format can be written but not read.
    #[error("{0} files cannot be read")]
    ReadUnsupported(Format),

    /// Raster or vector rendering failed.
    #[error("rendering failed: {0}")]
    Render(String),
}

impl From<DesignError> for CodecError {
    fn from(err: DesignError) -> Self {
        match err {
            DesignError::EmptyDesign => Self::EmptyDesign,
            DesignError::InvalidConfig(msg) => Self::InvalidInput(msg),
        }
    }
}
