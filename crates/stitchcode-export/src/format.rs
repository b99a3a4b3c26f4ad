//! File format selection by extension.

use std::fmt;
use std::path::Path;

use stitchcode_pipeline::Design;

use crate::render::RenderConfig;
use crate::{Codec, CodecError, Dst, Exp, Ksm, Pes, png, svg};

/// Every file format the converter knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Exp,
    Dst,
    Ksm,
    Pes,
    /// Raster preview, write-only.
    Png,
    /// Vector preview, write-only.
    Svg,
}

impl Format {
    /// All formats, readable ones first.
    pub const ALL: [Self; 6] = [
        Self::Exp,
        Self::Dst,
        Self::Ksm,
        Self::Pes,
        Self::Png,
        Self::Svg,
    ];

    /// Look up a format by file extension, ignoring case and a leading dot.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedExtension`] for anything else.
    ///
    /// # Examples
    ///
    /// ```
    /// use stitchcode_export::Format;
    ///
    /// assert_eq!(Format::from_extension("DST").unwrap(), Format::Dst);
    /// assert_eq!(Format::from_extension(".pes").unwrap(), Format::Pes);
    /// assert!(Format::from_extension("jef").is_err());
    /// ```
    pub fn from_extension(ext: &str) -> Result<Self, CodecError> {
        let wanted = ext.strip_prefix('.').unwrap_or(ext);
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CodecError::UnsupportedExtension(ext.to_string()))
    }

    /// Look up a format from a path's extension.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedExtension`] when the path has no
    /// extension or an unknown one.
    pub fn from_path(path: &Path) -> Result<Self, CodecError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| CodecError::UnsupportedExtension(path.display().to_string()))?;
        Self::from_extension(ext)
    }

    /// Canonical lowercase extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Exp => "exp",
            Self::Dst => "dst",
            Self::Ksm => "ksm",
            Self::Pes => "pes",
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }

    /// Whether [`read`](Self::read) can parse this format.
    #[must_use]
    pub const fn is_readable(self) -> bool {
        !matches!(self, Self::Png | Self::Svg)
    }

    /// Longest stitch the target machine handles comfortably, if the
    /// format has a preference tighter than its record limit.
    #[must_use]
    pub const fn preferred_max_stitch(self) -> Option<f64> {
        match self {
            Self::Pes => Some(63.0),
            _ => None,
        }
    }

    /// Parse `bytes` as this format.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ReadUnsupported`] for the preview formats,
    /// or whatever the codec reports.
    pub fn read(self, bytes: &[u8]) -> Result<Design, CodecError> {
        match self {
            Self::Exp => Exp.decode(bytes),
            Self::Dst => Dst::default().decode(bytes),
            Self::Ksm => Ksm.decode(bytes),
            Self::Pes => Pes::default().decode(bytes),
            Self::Png | Self::Svg => Err(CodecError::ReadUnsupported(self)),
        }
    }

    /// Serialize `design` as this format.  `render` only affects the
    /// preview formats.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmptyDesign`] for an empty design, or
    /// whatever the codec or renderer reports.
    pub fn write(self, design: &Design, render: &RenderConfig) -> Result<Vec<u8>, CodecError> {
        self.write_labeled(design, None, render)
    }

    /// Like [`write`](Self::write), with the design name stored by the
    /// DST and PES headers.  `None` keeps the codec's default label;
    /// other formats ignore it.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn write_labeled(
        self,
        design: &Design,
        label: Option<&str>,
        render: &RenderConfig,
    ) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Exp => Exp.encode(design),
            Self::Dst => {
                let mut dst = Dst::default();
                if let Some(label) = label {
                    label.clone_into(&mut dst.label);
                }
                dst.encode(design)
            }
            Self::Ksm => Ksm.encode(design),
            Self::Pes => {
                let mut pes = Pes::default();
                if let Some(label) = label {
                    label.clone_into(&mut pes.label);
                }
                pes.encode(design)
            }
            Self::Png => png::to_png(design, render),
            Self::Svg => svg::to_svg(design, render).map(String::into_bytes),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}
