//! Shared types for the stitchcode data model.
//!
//! Coordinates are real-valued design units (1 unit = 0.1 mm) with +Y
//! pointing up.  They stay real until a codec quantizes them at encode
//! time via [`Stitch::rounded`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Design units per millimetre.
pub const UNITS_PER_MM: f64 = 10.0;

/// One recorded needle position.
///
/// `jump == true` moves the frame without sewing (trim or carry);
/// otherwise a stitch is sewn ending at `(x, y)`.
///
/// Equality and ordering compare `(x, y)` only.  The jump flag and the
/// color index are ignored, so two stitches at the same position compare
/// equal even if one of them is a jump.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Stitch {
    /// Horizontal position in design units.
    pub x: f64,
    /// Vertical position in design units (+Y up).
    pub y: f64,
    /// Move without sewing.
    #[serde(default)]
    pub jump: bool,
    /// Thread color index (0-based, incremented on each color change).
    #[serde(default)]
    pub color: u32,
}

impl Stitch {
    /// A sewn stitch ending at `(x, y)` with color 0.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            jump: false,
            color: 0,
        }
    }

    /// A jump (move without sewing) to `(x, y)` with color 0.
    #[must_use]
    pub const fn jump_to(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            jump: true,
            color: 0,
        }
    }

    /// Returns a copy of this stitch with the given color index.
    #[must_use]
    pub const fn with_color(self, color: u32) -> Self {
        Self { color, ..self }
    }

    /// Returns a copy of this stitch moved to `(x, y)`, keeping the jump
    /// flag and color.
    #[must_use]
    pub const fn moved_to(self, x: f64, y: f64) -> Self {
        Self { x, y, ..self }
    }

    /// Quantize to integer design units, rounding half away from zero.
    ///
    /// Every codec uses this single rounding rule so encoded byte
    /// streams are reproducible.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn rounded(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

impl PartialEq for Stitch {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl PartialOrd for Stitch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.x.partial_cmp(&other.x)? {
            Ordering::Equal => self.y.partial_cmp(&other.y),
            ord => Some(ord),
        }
    }
}

/// Axis-aligned bounding box over a design's stitches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest x coordinate.
    pub min_x: f64,
    /// Smallest y coordinate.
    pub min_y: f64,
    /// Largest x coordinate.
    pub max_x: f64,
    /// Largest y coordinate.
    pub max_y: f64,
}

impl Bounds {
    /// Horizontal extent.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical extent.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// An ordered sequence of stitches forming one embroidery pattern.
///
/// The bounding box is derived: [`bounds`](Self::bounds) rescans the
/// stitches on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Design(Vec<Stitch>);

impl Design {
    /// Create a design from a vector of stitches.
    #[must_use]
    pub const fn new(stitches: Vec<Stitch>) -> Self {
        Self(stitches)
    }

    /// Append a stitch.
    pub fn push(&mut self, stitch: Stitch) {
        self.0.push(stitch);
    }

    /// Returns `true` if the design has no stitches.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of stitches.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first stitch, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Stitch> {
        self.0.first()
    }

    /// Returns the last stitch, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Stitch> {
        self.0.last()
    }

    /// Returns a slice of all stitches.
    #[must_use]
    pub fn stitches(&self) -> &[Stitch] {
        &self.0
    }

    /// Consumes the design and returns the underlying stitches.
    #[must_use]
    pub fn into_stitches(self) -> Vec<Stitch> {
        self.0
    }

    /// Fail with [`DesignError::EmptyDesign`] when there are no stitches.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::EmptyDesign`] if the design is empty.
    pub fn ensure_not_empty(&self) -> Result<(), DesignError> {
        if self.0.is_empty() {
            Err(DesignError::EmptyDesign)
        } else {
            Ok(())
        }
    }

    /// Bounding box over all stitches, or `None` when empty.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.0.first()?;
        let init = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(self.0.iter().fold(init, |b, s| Bounds {
            min_x: b.min_x.min(s.x),
            min_y: b.min_y.min(s.y),
            max_x: b.max_x.max(s.x),
            max_y: b.max_y.max(s.y),
        }))
    }

    /// Number of color changes between consecutive stitches.
    #[must_use]
    pub fn color_changes(&self) -> usize {
        self.0
            .windows(2)
            .filter(|w| w[0].color != w[1].color)
            .count()
    }

    /// Summary statistics for display.
    #[must_use]
    pub fn info(&self) -> DesignInfo {
        let bounds = self.bounds();
        let (width_mm, height_mm) =
            bounds.map_or((0.0, 0.0), |b| (b.width() / UNITS_PER_MM, b.height() / UNITS_PER_MM));
        DesignInfo {
            stitch_count: self.0.len(),
            jump_count: self.0.iter().filter(|s| s.jump).count(),
            color_count: if self.0.is_empty() {
                0
            } else {
                self.color_changes() + 1
            },
            bounds,
            width_mm,
            height_mm,
        }
    }
}

impl FromIterator<Stitch> for Design {
    fn from_iter<I: IntoIterator<Item = Stitch>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Summary statistics of a [`Design`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignInfo {
    /// Total stitch records, jumps included.
    pub stitch_count: usize,
    /// Stitches with the jump flag set.
    pub jump_count: usize,
    /// Color blocks (color changes + 1, or 0 for an empty design).
    pub color_count: usize,
    /// Bounding box, `None` when empty.
    pub bounds: Option<Bounds>,
    /// Field width in millimetres.
    pub width_mm: f64,
    /// Field height in millimetres.
    pub height_mm: f64,
}

impl fmt::Display for DesignInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "stitches: {}", self.stitch_count)?;
        writeln!(f, "jumps:    {}", self.jump_count)?;
        writeln!(f, "colors:   {}", self.color_count)?;
        if let Some(b) = self.bounds {
            writeln!(
                f,
                "extents:  ({:.1}, {:.1}) .. ({:.1}, {:.1})",
                b.min_x, b.min_y, b.max_x, b.max_y,
            )?;
        }
        write!(f, "size:     {:.2}mm x {:.2}mm", self.width_mm, self.height_mm)
    }
}

/// Errors raised by design operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DesignError {
    /// A transform or encode was invoked on a design with no stitches.
    #[error("design has no stitches")]
    EmptyDesign,

    /// A transform parameter is out of range.
    #[error("invalid transform configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Stitch tests ---

    #[test]
    fn stitch_new_is_sewn_color_zero() {
        let s = Stitch::new(3.0, 4.0);
        assert!(!s.jump);
        assert_eq!(s.color, 0);
    }

    #[test]
    fn stitch_jump_to_sets_flag() {
        assert!(Stitch::jump_to(1.0, 2.0).jump);
    }

    #[test]
    fn stitch_equality_ignores_jump_and_color() {
        let a = Stitch::new(1.0, 2.0);
        let b = Stitch::jump_to(1.0, 2.0).with_color(3);
        assert_eq!(a, b);
        assert_ne!(a, Stitch::new(1.0, 2.5));
    }

    #[test]
    fn stitch_ordering_is_x_then_y() {
        assert!(Stitch::new(1.0, 9.0) < Stitch::new(2.0, 0.0));
        assert!(Stitch::new(1.0, 1.0) < Stitch::new(1.0, 2.0));
    }

    #[test]
    fn rounded_is_half_away_from_zero() {
        assert_eq!(Stitch::new(0.5, -0.5).rounded(), (1, -1));
        assert_eq!(Stitch::new(1.49, -1.51).rounded(), (1, -2));
        assert_eq!(Stitch::new(2.5, 3.5).rounded(), (3, 4));
    }

    #[test]
    fn moved_to_keeps_flags() {
        let s = Stitch::jump_to(0.0, 0.0).with_color(2).moved_to(5.0, 6.0);
        assert!(s.jump);
        assert_eq!(s.color, 2);
        assert_eq!(s, Stitch::new(5.0, 6.0));
    }

    // --- Design tests ---

    #[test]
    fn design_push_and_len() {
        let mut d = Design::default();
        assert!(d.is_empty());
        d.push(Stitch::new(0.0, 0.0));
        d.push(Stitch::new(1.0, 1.0));
        assert_eq!(d.len(), 2);
        assert_eq!(d.first(), Some(&Stitch::new(0.0, 0.0)));
        assert_eq!(d.last(), Some(&Stitch::new(1.0, 1.0)));
    }

    #[test]
    fn empty_design_has_no_bounds() {
        assert!(Design::default().bounds().is_none());
        assert_eq!(
            Design::default().ensure_not_empty(),
            Err(DesignError::EmptyDesign)
        );
    }

    #[test]
    fn bounds_scans_all_stitches() {
        let d = Design::new(vec![
            Stitch::new(5.0, -2.0),
            Stitch::new(-3.0, 7.0),
            Stitch::jump_to(10.0, 1.0),
        ]);
        let b = d.bounds().unwrap();
        assert_eq!(
            b,
            Bounds {
                min_x: -3.0,
                min_y: -2.0,
                max_x: 10.0,
                max_y: 7.0,
            }
        );
        assert!((b.width() - 13.0).abs() < f64::EPSILON);
        assert!((b.height() - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn info_counts_jumps_and_colors() {
        let d = Design::new(vec![
            Stitch::new(0.0, 0.0),
            Stitch::new(100.0, 0.0),
            Stitch::jump_to(100.0, 50.0).with_color(1),
            Stitch::new(0.0, 50.0).with_color(1),
        ]);
        let info = d.info();
        assert_eq!(info.stitch_count, 4);
        assert_eq!(info.jump_count, 1);
        assert_eq!(info.color_count, 2);
        assert!((info.width_mm - 10.0).abs() < 1e-9);
        assert!((info.height_mm - 5.0).abs() < 1e-9);
        let text = info.to_string();
        assert!(text.contains("stitches: 4"));
        assert!(text.contains("10.00mm x 5.00mm"));
    }

    #[test]
    fn design_from_iterator() {
        let d: Design = (0..3).map(|i| Stitch::new(f64::from(i), 0.0)).collect();
        assert_eq!(d.len(), 3);
    }

    // --- Error tests ---

    #[test]
    fn error_display() {
        assert_eq!(DesignError::EmptyDesign.to_string(), "design has no stitches");
        assert_eq!(
            DesignError::InvalidConfig("zoom < 0".to_string()).to_string(),
            "invalid transform configuration: zoom < 0",
        );
    }

    // --- Serde round-trip tests ---

    #[test]
    fn design_serde_round_trip() {
        let d = Design::new(vec![
            Stitch::new(0.0, 0.0),
            Stitch::jump_to(1.5, -2.5).with_color(1),
        ]);
        let json = serde_json::to_string(&d).unwrap();
        let back: Design = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
        assert!(back.stitches()[1].jump);
        assert_eq!(back.stitches()[1].color, 1);
    }

    #[test]
    fn stitch_deserializes_without_optional_fields() {
        let s: Stitch = serde_json::from_str(r#"{"x":1.0,"y":2.0}"#).unwrap();
        assert!(!s.jump);
        assert_eq!(s.color, 0);
    }
}
