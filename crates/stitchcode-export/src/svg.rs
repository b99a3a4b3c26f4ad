//! SVG preview renderer.
//!
//! Builds the document with the [`svg`] crate: one black path for all
//! sewn segments, one red path for jumps (when shown), and one blue path
//! of marker crosses.  The design summary goes in a `<desc>` element.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::Text;
use svg::node::element::path::Data;
use svg::node::element::{Description, Path};

use stitchcode_pipeline::Design;

use crate::CodecError;
use crate::render::{Canvas, Line, RenderConfig, Scene};

/// Join consecutive lines into path data, lifting the pen only where a
/// line does not start at the previous end.
fn lines_data(lines: &[Line]) -> Data {
    let mut data = Data::new();
    let mut pen: Option<(f64, f64)> = None;
    for line in lines {
        if pen != Some(line.from) {
            data = data.move_to(line.from);
        }
        data = data.line_to(line.to);
        pen = Some(line.to);
    }
    data
}

fn markers_data(markers: &[(f64, f64)], half: f64) -> Data {
    let mut data = Data::new();
    for &(x, y) in markers {
        data = data
            .move_to((x - half, y - half))
            .line_to((x + half, y + half))
            .move_to((x - half, y + half))
            .line_to((x + half, y - half));
    }
    data
}

fn stroked(data: Data, color: &str, width: f64) -> Path {
    Path::new()
        .set("d", data)
        .set("fill", "none")
        .set("stroke", color)
        .set("stroke-width", width)
}

/// Render `design` as an SVG document.
///
/// # Errors
///
/// Returns [`CodecError::EmptyDesign`] if the design has no stitches.
///
/// # Examples
///
/// ```
/// use stitchcode_export::{RenderConfig, to_svg};
/// use stitchcode_pipeline::{Design, Stitch};
///
/// let design = Design::new(vec![Stitch::new(0.0, 0.0), Stitch::new(10.0, 0.0)]);
/// let svg = to_svg(&design, &RenderConfig::default()).unwrap();
/// assert!(svg.contains("<path"));
/// ```
pub fn to_svg(design: &Design, config: &RenderConfig) -> Result<String, CodecError> {
    let canvas = Canvas::fit(design, config.scale)?;
    let scene = Scene::build(design, &canvas, config);
    let width = config.scale;

    let mut doc = Document::new()
        .set("width", canvas.width)
        .set("height", canvas.height)
        .set("viewBox", (0, 0, canvas.width, canvas.height))
        .add(Description::new().add(Text::new(design.info().to_string())));

    if !scene.stitches.is_empty() {
        doc = doc.add(stroked(lines_data(&scene.stitches), "black", width));
    }
    if !scene.jumps.is_empty() {
        doc = doc.add(stroked(lines_data(&scene.jumps), "red", width));
    }
    if !scene.markers.is_empty() {
        doc = doc.add(stroked(
            markers_data(&scene.markers, canvas.marker()),
            "blue",
            width,
        ));
    }

    tracing::debug!(
        stitches = scene.stitches.len(),
        jumps = scene.jumps.len(),
        markers = scene.markers.len(),
        "rendered SVG"
    );

    // The svg crate omits the XML declaration, so we prepend it.
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stitchcode_pipeline::Stitch;

    use super::*;

    fn design() -> Design {
        Design::new(vec![
            Stitch::new(0.0, 0.0),
            Stitch::new(10.0, 0.0),
            Stitch::new(10.0, 10.0),
            Stitch::jump_to(30.0, 10.0),
            Stitch::new(30.0, 0.0),
        ])
    }

    #[test]
    fn starts_with_xml_declaration() {
        let svg = to_svg(&design(), &RenderConfig::default()).unwrap();
        assert!(svg.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn size_includes_border() {
        let svg = to_svg(&design(), &RenderConfig::default()).unwrap();
        assert!(svg.contains("width=\"40\""), "{svg}");
        assert!(svg.contains("height=\"20\""), "{svg}");
        assert!(svg.contains("viewBox=\"0 0 40 20\""), "{svg}");
    }

    #[test]
    fn description_carries_info() {
        let svg = to_svg(&design(), &RenderConfig::default()).unwrap();
        assert!(svg.contains("<desc>"));
        assert!(svg.contains("stitches: 5"));
    }

    #[test]
    fn jumps_only_when_requested() {
        let plain = to_svg(&design(), &RenderConfig::default()).unwrap();
        assert!(plain.contains("stroke=\"black\""));
        assert!(!plain.contains("stroke=\"red\""));
        assert!(!plain.contains("stroke=\"blue\""));

        let config = RenderConfig {
            mark_stitches: true,
            show_jumps: true,
            ..RenderConfig::default()
        };
        let full = to_svg(&design(), &config).unwrap();
        assert!(full.contains("stroke=\"red\""));
        assert!(full.contains("stroke=\"blue\""));
    }

    #[test]
    fn connected_lines_share_one_subpath() {
        let lines = [
            Line {
                from: (0.0, 0.0),
                to: (1.0, 0.0),
            },
            Line {
                from: (1.0, 0.0),
                to: (1.0, 1.0),
            },
            Line {
                from: (5.0, 5.0),
                to: (6.0, 5.0),
            },
        ];
        let d = String::from(svg::node::Value::from(lines_data(&lines)));
        assert_eq!(d.matches('M').count(), 2, "{d}");
        assert_eq!(d.matches('L').count(), 3, "{d}");
    }

    #[test]
    fn empty_design_is_error() {
        assert_eq!(
            to_svg(&Design::default(), &RenderConfig::default()),
            Err(CodecError::EmptyDesign)
        );
    }
}
