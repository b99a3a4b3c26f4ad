//! stitchcode-pipeline: Stitch data model and geometry transforms (sans-IO).
//!
//! A [`Design`] is an ordered sequence of [`Stitch`] values in design
//! units (0.1 mm).  Transforms are pure functions `Design -> Design`:
//! origin translation, scaling, long-segment flattening, tie-stitch
//! insertion, triple stitch and redwork.  They compose through an
//! explicit [`Pipeline`].
//!
//! This crate has **no I/O dependencies**.  Binary codecs and renderers
//! live in `stitchcode-export`; the filesystem lives in the binary.

pub mod diagnostics;
pub mod flatten;
mod geometry;
pub mod origin;
pub mod pipeline;
pub mod reinforce;
pub mod ties;
pub mod types;

pub use pipeline::{EndstitchConfig, Pipeline, Transform, TransformConfig};
pub use types::{Bounds, Design, DesignError, DesignInfo, Stitch, UNITS_PER_MM};

/// Apply every transform `config` enables to `design`.
///
/// Equivalent to `config.to_pipeline()?.run(design)`.
///
/// # Errors
///
/// Returns [`DesignError::InvalidConfig`] if the config fails validation.
/// Returns [`DesignError::EmptyDesign`] if the design has no stitches.
pub fn process(design: Design, config: &TransformConfig) -> Result<Design, DesignError> {
    config.to_pipeline()?.run(design)
}
