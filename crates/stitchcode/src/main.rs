//! stitchcode: convert and reshape machine embroidery files.
//!
//! Reads a stitch file (EXP, DST, KSM, PES), runs the configured
//! transforms, and writes any supported format, including PNG and SVG
//! previews.  Useful for:
//!
//! - Converting between machine formats
//! - Reinforcing outlines with triple stitch or redwork
//! - Adding tie stitches and keeping stitches short enough to sew
//! - Inspecting a design's size and per-step transform cost
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin stitchcode -- [OPTIONS] <INPUT> [-o <OUTPUT>]
//! ```

#![allow(clippy::print_stdout)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use stitchcode_export::{CodecError, Format, RenderConfig};
use stitchcode_pipeline::diagnostics::Clock;
use stitchcode_pipeline::{Design, DesignError, EndstitchConfig, TransformConfig};

/// Convert and reshape machine embroidery files.
///
/// The input format is chosen by file extension.  Without `--output`
/// the design is transformed and summarized but nothing is written.
#[derive(Parser)]
#[command(name = "stitchcode", version)]
struct Cli {
    /// Input stitch file (EXP, DST, KSM, PES).
    input: PathBuf,

    /// Output file (EXP, DST, KSM, PES, PNG, SVG).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Scale factor applied before any other transform.
    #[arg(long, default_value_t = TransformConfig::DEFAULT_ZOOM)]
    zoom: f64,

    /// Keep the original placement instead of moving the design to (0, 0).
    #[arg(long)]
    keep_position: bool,

    /// Convert sewn segments to triple stitches.
    #[arg(long)]
    to_triples: bool,

    /// Convert sewn segments to redwork.
    #[arg(long)]
    to_red_work: bool,

    /// Triple stitch and redwork offset in millimetres.
    #[arg(long, default_value_t = TransformConfig::DEFAULT_DISTANCE_MM)]
    distance: f64,

    /// Split sewn segments longer than LEN units (default 127).
    #[arg(long, value_name = "LEN", num_args = 0..=1, default_missing_value = "127")]
    flatten: Option<f64>,

    /// Tie off segments longer than 127 units with ties of LEN units (default 20).
    #[arg(long, value_name = "LEN", num_args = 0..=1, default_missing_value = "20")]
    endstitches: Option<f64>,

    /// Tie off before and after jumps with ties of LEN units (default 10).
    #[arg(long, value_name = "LEN", num_args = 0..=1, default_missing_value = "10")]
    jump_endstitches: Option<f64>,

    /// Design name stored in DST and PES headers (16 characters max).
    #[arg(long)]
    label: Option<String>,

    /// Mark needle positions in PNG/SVG output.
    #[arg(long)]
    show_stitches: bool,

    /// Draw jumps in red in PNG/SVG output.
    #[arg(long)]
    show_jumps: bool,

    /// Pixels per design unit in PNG/SVG output.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Print stitch count, extents, and size of the result.
    #[arg(long)]
    show_info: bool,

    /// Print per-step timing and stitch counts.
    #[arg(long)]
    diagnostics: bool,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long, requires = "diagnostics")]
    json: bool,

    /// Full transform config as a JSON string.
    ///
    /// When provided, all other transform flags are ignored.
    /// The JSON must be a valid `TransformConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Log progress at debug level (`RUST_LOG` overrides).
    #[arg(short, long)]
    verbose: bool,
}

/// Everything that can stop a conversion.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("error parsing --config-json: {0}")]
    ConfigJson(#[source] serde_json::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Design(#[from] DesignError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("error serializing diagnostics: {0}")]
    Json(#[source] serde_json::Error),
}

/// Build a [`TransformConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual transform flags are ignored.  Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<TransformConfig, CliError> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(CliError::ConfigJson);
    }

    Ok(TransformConfig {
        zoom: cli.zoom,
        translate_to_origin: !cli.keep_position,
        triple_stitch: cli.to_triples,
        red_work: cli.to_red_work,
        distance_mm: cli.distance,
        endstitches: cli.endstitches.map(|length| EndstitchConfig {
            length,
            ..EndstitchConfig::default()
        }),
        jump_endstitches: cli.jump_endstitches,
        flatten: cli.flatten,
    })
}

const fn render_from_cli(cli: &Cli) -> RenderConfig {
    RenderConfig {
        mark_stitches: cli.show_stitches,
        show_jumps: cli.show_jumps,
        scale: cli.scale,
    }
}

/// Install a stderr `fmt` subscriber.  `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_design(path: &Path) -> Result<Design, CliError> {
    let format = Format::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let design = format.read(&bytes)?;
    tracing::info!(
        path = %path.display(),
        %format,
        bytes = bytes.len(),
        stitches = design.len(),
        "read design"
    );
    Ok(design)
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = config_from_cli(cli)?;
    tracing::debug!(?config, "transform config");

    // Resolve the output format before doing any work.
    let output = cli
        .output
        .as_deref()
        .map(|path| Format::from_path(path).map(|format| (path, format)))
        .transpose()?;

    let mut pipeline = config.to_pipeline()?;
    if let Some(max) = output.and_then(|(_, format)| format.preferred_max_stitch()) {
        pipeline = pipeline.with_max_stitch_length(max);
    }

    let design = read_design(&cli.input)?;

    let design = if cli.diagnostics {
        let (design, diagnostics) = pipeline.run_with_diagnostics(design, &StdClock)?;
        if cli.json {
            let json = serde_json::to_string_pretty(&diagnostics).map_err(CliError::Json)?;
            println!("{json}");
        } else {
            println!("{}", diagnostics.report());
        }
        design
    } else {
        pipeline.run(design)?
    };

    if cli.show_info || output.is_none() {
        println!("{}", design.info());
    }

    if let Some((path, format)) = output {
        let bytes = format.write_labeled(&design, cli.label.as_deref(), &render_from_cli(cli))?;
        std::fs::write(path, &bytes).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            path = %path.display(),
            %format,
            bytes = bytes.len(),
            stitches = design.len(),
            "wrote design"
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use stitchcode_pipeline::Transform;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("stitchcode").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_only_translate() {
        let cli = parse(&["in.dst"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config, TransformConfig::default());
        assert_eq!(
            config.to_pipeline().unwrap().steps(),
            [Transform::TranslateToOrigin]
        );
    }

    #[test]
    fn optional_lengths_take_defaults() {
        let cli = parse(&["in.exp", "--flatten", "--endstitches", "--jump-endstitches"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.flatten, Some(127.0));
        assert_eq!(config.endstitches, Some(EndstitchConfig::default()));
        assert_eq!(config.jump_endstitches, Some(10.0));
    }

    #[test]
    fn explicit_lengths() {
        let cli = parse(&["in.exp", "--flatten", "50", "--endstitches=15"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.flatten, Some(50.0));
        assert_eq!(config.endstitches.unwrap().length, 15.0);
    }

    #[test]
    fn transform_flags_map_to_config() {
        let cli = parse(&[
            "in.ksm",
            "--zoom",
            "2",
            "--to-triples",
            "--distance",
            "0.5",
            "--keep-position",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.zoom, 2.0);
        assert!(config.triple_stitch);
        assert!(!config.red_work);
        assert!(!config.translate_to_origin);
        assert_eq!(config.distance_mm, 0.5);
    }

    #[test]
    fn config_json_replaces_flags() {
        let cli = parse(&[
            "in.pes",
            "--zoom",
            "3",
            "--config-json",
            r#"{"red_work": true, "zoom": 0.5}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.zoom, 0.5);
        assert!(config.red_work);
    }

    #[test]
    fn bad_config_json_is_error() {
        let cli = parse(&["in.pes", "--config-json", "{"]);
        assert!(matches!(
            config_from_cli(&cli),
            Err(CliError::ConfigJson(_))
        ));
    }

    #[test]
    fn json_requires_diagnostics() {
        assert!(Cli::try_parse_from(["stitchcode", "in.dst", "--json"]).is_err());
    }

    #[test]
    fn render_flags() {
        let cli = parse(&["in.dst", "--show-jumps", "--scale", "4"]);
        let render = render_from_cli(&cli);
        assert!(render.show_jumps);
        assert!(!render.mark_stitches);
        assert_eq!(render.scale, 4.0);
    }

    #[test]
    fn label_flag_is_optional() {
        assert_eq!(parse(&["in.dst"]).label, None);
        let cli = parse(&["in.dst", "-o", "out.pes", "--label", "Rose"]);
        assert_eq!(cli.label.as_deref(), Some("Rose"));
    }

    #[test]
    fn unknown_output_extension_fails_before_reading() {
        let cli = parse(&["does-not-exist.dst", "-o", "out.jef"]);
        assert!(matches!(
            run(&cli),
            Err(CliError::Codec(CodecError::UnsupportedExtension(_)))
        ));
    }

    #[test]
    fn missing_input_is_io_error() {
        let cli = parse(&["does-not-exist.dst"]);
        assert!(matches!(run(&cli), Err(CliError::Io { .. })));
    }
}
