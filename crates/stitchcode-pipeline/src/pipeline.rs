//! Explicit transform composition.
//!
//! A [`Pipeline`] is an ordered list of [`Transform`] steps.  Each step
//! consumes the [`Design`] produced by the previous one and hands a new
//! design to the next, so ownership moves through the run and no two
//! steps ever see the same sequence.
//!
//! [`TransformConfig`] is the user-facing parameter record.  It decides
//! which steps run and in what order via [`TransformConfig::to_pipeline`].
//!
//! ```
//! use stitchcode_pipeline::{Design, Pipeline, Stitch, Transform};
//!
//! let design = Design::new(vec![Stitch::new(-10.0, -10.0), Stitch::new(290.0, -10.0)]);
//! let out = Pipeline::new(vec![
//!     Transform::TranslateToOrigin,
//!     Transform::Flatten { max_length: 127.0 },
//! ])
//! .run(design)?;
//! assert_eq!(out.len(), 4);
//! # Ok::<(), stitchcode_pipeline::DesignError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Clock, PipelineDiagnostics, StageDiagnostics};
use crate::types::{Design, DesignError, UNITS_PER_MM};
use crate::{flatten, origin, reinforce, ties};

/// One geometry transform with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// Shift so the bounding box starts at `(0, 0)`.
    TranslateToOrigin,
    /// Uniform scale on both axes.
    Scale {
        /// Multiplier applied to every coordinate.
        factor: f64,
    },
    /// Subdivide sewn segments longer than `max_length`.
    Flatten {
        /// Largest allowed per-axis delta.
        max_length: f64,
    },
    /// Tie off both ends of every over-long segment.
    Endstitches {
        /// Tie stitch length.
        length: f64,
        /// Segments with a larger per-axis delta get ties.
        max_stitch_length: f64,
    },
    /// Tie off around every jump.
    JumpEndstitches {
        /// Tie stitch length.
        length: f64,
    },
    /// Convert sewn segments to triple stitches.
    TripleStitch {
        /// Perpendicular offset.
        length: f64,
    },
    /// Convert sewn segments to redwork.
    RedWork {
        /// Perpendicular offset.
        length: f64,
    },
}

impl Transform {
    /// Short machine-friendly name of the step.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TranslateToOrigin => "translate_to_origin",
            Self::Scale { .. } => "scale",
            Self::Flatten { .. } => "flatten",
            Self::Endstitches { .. } => "endstitches",
            Self::JumpEndstitches { .. } => "jump_endstitches",
            Self::TripleStitch { .. } => "triple_stitch",
            Self::RedWork { .. } => "red_work",
        }
    }

    /// Apply this step to `design`.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::EmptyDesign`] if the design has no stitches.
    pub fn apply(&self, design: Design) -> Result<Design, DesignError> {
        match *self {
            Self::TranslateToOrigin => origin::translate_to_origin(design),
            Self::Scale { factor } => origin::scale(design, factor),
            Self::Flatten { max_length } => flatten::flatten(design, max_length),
            Self::Endstitches {
                length,
                max_stitch_length,
            } => ties::add_endstitches(design, length, max_stitch_length),
            Self::JumpEndstitches { length } => ties::add_endstitches_to_jumps(design, length),
            Self::TripleStitch { length } => reinforce::to_triple_stitches(design, length),
            Self::RedWork { length } => reinforce::to_red_work(design, length),
        }
    }
}

/// An ordered sequence of transforms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    steps: Vec<Transform>,
}

impl Pipeline {
    /// Create a pipeline from an ordered list of steps.
    #[must_use]
    pub const fn new(steps: Vec<Transform>) -> Self {
        Self { steps }
    }

    /// Append a step.
    pub fn push(&mut self, step: Transform) {
        self.steps.push(step);
    }

    /// The steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Transform] {
        &self.steps
    }

    /// Make sure the final step limits sewn segments to `max_length`.
    ///
    /// A trailing flatten that is already at least as strict is kept.
    /// Otherwise a `Flatten { max_length }` step is appended, since any
    /// later step could reintroduce long segments.
    #[must_use]
    pub fn with_max_stitch_length(mut self, max_length: f64) -> Self {
        let satisfied = matches!(
            self.steps.last(),
            Some(Transform::Flatten { max_length: m }) if *m > 0.0 && *m <= max_length
        );
        if !satisfied {
            self.steps.push(Transform::Flatten { max_length });
        }
        self
    }

    /// Run every step in order.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::EmptyDesign`] if the design has no stitches,
    /// even when the pipeline has no steps.
    pub fn run(&self, design: Design) -> Result<Design, DesignError> {
        design.ensure_not_empty()?;
        self.steps.iter().try_fold(design, |d, step| step.apply(d))
    }

    /// Run every step in order, timing each with `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::EmptyDesign`] if the design has no stitches.
    pub fn run_with_diagnostics<C: Clock>(
        &self,
        design: Design,
        clock: &C,
    ) -> Result<(Design, PipelineDiagnostics), DesignError> {
        design.ensure_not_empty()?;
        let run_start = clock.now();
        let stitches_before = design.len();

        let mut steps = Vec::with_capacity(self.steps.len());
        let mut current = design;
        for step in &self.steps {
            let before = current.len();
            let start = clock.now();
            current = step.apply(current)?;
            steps.push(StageDiagnostics {
                transform: *step,
                duration: clock.elapsed(&start),
                stitches_before: before,
                stitches_after: current.len(),
            });
        }

        let diagnostics = PipelineDiagnostics {
            steps,
            total_duration: clock.elapsed(&run_start),
            stitches_before,
            stitches_after: current.len(),
        };
        Ok((current, diagnostics))
    }
}

/// Tie-stitch parameters for [`TransformConfig::endstitches`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EndstitchConfig {
    /// Tie stitch length in design units.
    pub length: f64,
    /// Segments with a larger per-axis delta get ties.
    pub max_stitch_length: f64,
}

impl Default for EndstitchConfig {
    fn default() -> Self {
        Self {
            length: TransformConfig::DEFAULT_ENDSTITCH_LENGTH,
            max_stitch_length: TransformConfig::DEFAULT_MAX_STITCH_LENGTH,
        }
    }
}

/// User-facing transform parameters.
///
/// Lengths are in design units (0.1 mm) except `distance_mm`, which is
/// in millimetres for parity with the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Uniform scale factor. Must be finite and non-negative.
    pub zoom: f64,

    /// Shift the design so its bounding box starts at `(0, 0)`.
    pub translate_to_origin: bool,

    /// Convert sewn segments to triple stitches.
    pub triple_stitch: bool,

    /// Convert sewn segments to redwork.
    pub red_work: bool,

    /// Perpendicular offset for triple stitch and redwork, in millimetres.
    pub distance_mm: f64,

    /// Tie off over-long segments.
    pub endstitches: Option<EndstitchConfig>,

    /// Tie off around jumps with this tie length.
    pub jump_endstitches: Option<f64>,

    /// Subdivide sewn segments longer than this.
    pub flatten: Option<f64>,
}

impl TransformConfig {
    /// Default zoom factor.
    pub const DEFAULT_ZOOM: f64 = 1.0;
    /// Default triple/redwork offset in millimetres.
    pub const DEFAULT_DISTANCE_MM: f64 = 0.3;
    /// Default tie length for over-long segments.
    pub const DEFAULT_ENDSTITCH_LENGTH: f64 = 20.0;
    /// Default tie length around jumps.
    pub const DEFAULT_JUMP_ENDSTITCH_LENGTH: f64 = 10.0;
    /// Default per-axis stitch length limit.
    pub const DEFAULT_MAX_STITCH_LENGTH: f64 = 127.0;

    /// Check every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::InvalidConfig`] for a negative or
    /// non-finite zoom, or a non-finite or non-positive length.
    pub fn validate(&self) -> Result<(), DesignError> {
        if !self.zoom.is_finite() || self.zoom < 0.0 {
            return Err(DesignError::InvalidConfig(format!(
                "zoom must be finite and >= 0, got {}",
                self.zoom,
            )));
        }
        if self.triple_stitch || self.red_work {
            positive("distance_mm", self.distance_mm)?;
        }
        if let Some(e) = self.endstitches {
            positive("endstitch length", e.length)?;
            positive("endstitch max_stitch_length", e.max_stitch_length)?;
        }
        if let Some(len) = self.jump_endstitches {
            positive("jump endstitch length", len)?;
        }
        if let Some(len) = self.flatten {
            positive("flatten length", len)?;
        }
        Ok(())
    }

    /// Offset for triple stitch and redwork, in design units.
    #[must_use]
    pub fn distance_units(&self) -> f64 {
        self.distance_mm * UNITS_PER_MM
    }

    /// Validate and build the ordered pipeline.
    ///
    /// Order: scale, translate, triple stitch, redwork, jump ties,
    /// length ties, flatten.  A zoom of exactly 1 adds no scale step.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::InvalidConfig`] if [`validate`](Self::validate) fails.
    pub fn to_pipeline(&self) -> Result<Pipeline, DesignError> {
        self.validate()?;
        let mut pipeline = Pipeline::default();

        #[allow(clippy::float_cmp)]
        let identity_zoom = self.zoom == 1.0;
        if !identity_zoom {
            pipeline.push(Transform::Scale { factor: self.zoom });
        }
        if self.translate_to_origin {
            pipeline.push(Transform::TranslateToOrigin);
        }
        if self.triple_stitch {
            pipeline.push(Transform::TripleStitch {
                length: self.distance_units(),
            });
        }
        if self.red_work {
            pipeline.push(Transform::RedWork {
                length: self.distance_units(),
            });
        }
        if let Some(length) = self.jump_endstitches {
            pipeline.push(Transform::JumpEndstitches { length });
        }
        if let Some(e) = self.endstitches {
            pipeline.push(Transform::Endstitches {
                length: e.length,
                max_stitch_length: e.max_stitch_length,
            });
        }
        if let Some(max_length) = self.flatten {
            pipeline.push(Transform::Flatten { max_length });
        }

        tracing::debug!(
            steps = ?pipeline.steps().iter().map(Transform::name).collect::<Vec<_>>(),
            "built pipeline",
        );
        Ok(pipeline)
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            zoom: Self::DEFAULT_ZOOM,
            translate_to_origin: true,
            triple_stitch: false,
            red_work: false,
            distance_mm: Self::DEFAULT_DISTANCE_MM,
            endstitches: None,
            jump_endstitches: None,
            flatten: None,
        }
    }
}

fn positive(what: &str, value: f64) -> Result<(), DesignError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DesignError::InvalidConfig(format!(
            "{what} must be finite and > 0, got {value}"
        )))
    }
}
