//! Pipeline diagnostics: timing and stitch counts for each transform step.
//!
//! Collected by [`Pipeline::run_with_diagnostics`](crate::Pipeline::run_with_diagnostics)
//! with a caller-supplied [`Clock`].  The pipeline crate performs no I/O
//! and reads no global time source, so the binary decides how time is
//! measured.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Transform;

/// Source of timestamps for diagnostics.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Capture the current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// One entry per executed step, in execution order.
    pub steps: Vec<StageDiagnostics>,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Stitch count of the input design.
    pub stitches_before: usize,
    /// Stitch count of the output design.
    pub stitches_after: usize,
}

/// Diagnostics for a single transform step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// The step that ran, parameters included.
    pub transform: Transform,
    /// Wall-clock duration of this step (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stitches going in.
    pub stitches_before: usize,
    /// Stitches coming out.
    pub stitches_after: usize,
}

impl StageDiagnostics {
    /// Output-to-input stitch ratio (> 1.0 means the step inserted stitches).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn expansion_ratio(&self) -> f64 {
        if self.stitches_before == 0 {
            0.0
        } else {
            self.stitches_after as f64 / self.stitches_before as f64
        }
    }
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Step", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        for step in &self.steps {
            let ms = duration_ms(step.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let name = step.transform.name();
            let details = format!(
                "{} {}->{} stitches (x{:.2})",
                format_params(&step.transform),
                step.stitches_before,
                step.stitches_after,
                step.expansion_ratio(),
            );
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Stitches: {} -> {}",
            self.stitches_before, self.stitches_after,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format step parameters into a compact detail string.
fn format_params(transform: &Transform) -> String {
    match *transform {
        Transform::TranslateToOrigin => String::from("-"),
        Transform::Scale { factor } => format!("factor={factor:.3}"),
        Transform::Flatten { max_length } => format!("max={max_length:.1}"),
        Transform::Endstitches {
            length,
            max_stitch_length,
        } => format!("len={length:.1} max={max_stitch_length:.1}"),
        Transform::JumpEndstitches { length }
        | Transform::TripleStitch { length }
        | Transform::RedWork { length } => format!("len={length:.1}"),
    }
}
