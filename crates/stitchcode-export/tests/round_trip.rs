//! Integration test: every binary codec reproduces designs through an
//! encode/decode cycle, and long moves are split without drift.

#![allow(clippy::unwrap_used, clippy::cast_precision_loss)]

use stitchcode_export::{Codec, Dst, Exp, Format, Ksm, Pes};
use stitchcode_pipeline::{Design, Stitch, TransformConfig};

fn codecs() -> Vec<(&'static str, Box<dyn Codec>)> {
    vec![
        ("EXP", Box::new(Exp)),
        ("DST", Box::new(Dst::default())),
        ("KSM", Box::new(Ksm)),
        ("PES", Box::new(Pes::default())),
    ]
}

/// Small linear congruential generator, so the designs are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    /// At least 10 units, so no move quantizes to zero.
    fn step(&mut self) -> f64 {
        let magnitude = 10.0 + (self.next() % 1100) as f64 / 10.0;
        if self.next() % 2 == 0 {
            magnitude
        } else {
            -magnitude
        }
    }
}

/// Wandering design starting at the origin, with moves inside every
/// codec's record limit, scattered jumps, and color changes numbered
/// from zero.
fn wander(seed: u64, len: usize) -> Design {
    let mut rng = Lcg(seed);
    let mut design = Design::new(vec![Stitch::new(0.0, 0.0)]);
    let (mut x, mut y, mut color) = (0.0, 0.0, 0_u32);
    for _ in 1..len {
        x += rng.step();
        y += rng.step();
        if rng.next() % 17 == 0 {
            color += 1;
        }
        let jump = rng.next() % 9 == 0;
        design.push(Stitch {
            x,
            y,
            jump,
            color,
        });
    }
    design
}

#[test]
fn all_codecs_reproduce_designs() {
    for seed in 1..=8 {
        let design = wander(seed, 200);
        for (name, codec) in codecs() {
            let bytes = codec.encode(&design).unwrap();
            let back = codec.decode(&bytes).unwrap();
            assert_eq!(back.len(), design.len(), "{name} seed {seed}");
            for (i, (a, b)) in design.stitches().iter().zip(back.stitches()).enumerate() {
                assert!(
                    (a.x - b.x).abs() <= 1.0 && (a.y - b.y).abs() <= 1.0,
                    "{name} seed {seed} stitch {i}: {a:?} vs {b:?}"
                );
                assert_eq!(a.jump, b.jump, "{name} seed {seed} stitch {i}");
                assert_eq!(a.color, b.color, "{name} seed {seed} stitch {i}");
            }
        }
    }
}

#[test]
fn long_moves_land_exactly() {
    for d in (-10_000..=10_000).step_by(1_111) {
        let target = (f64::from(d), f64::from(-d / 2 + 7));
        let design = Design::new(vec![
            Stitch::new(0.0, 0.0),
            Stitch::new(target.0, target.1),
        ]);
        for (name, codec) in codecs() {
            let back = codec.decode(&codec.encode(&design).unwrap()).unwrap();
            let last = back.last().unwrap();
            assert_eq!((last.x, last.y), target, "{name} delta {d}");
            assert!(back.stitches().iter().all(|s| !s.jump), "{name}");
        }
    }
}

#[test]
fn exp_splits_three_hundred_into_equal_pairs() {
    let design = Design::new(vec![Stitch::new(0.0, 0.0), Stitch::new(300.0, 0.0)]);
    assert_eq!(Exp.encode(&design).unwrap(), [100, 0, 100, 0, 100, 0]);
}

#[test]
fn exp_puts_the_remainder_on_the_last_step() {
    let design = Design::new(vec![Stitch::new(0.0, 0.0), Stitch::new(302.0, 0.0)]);
    assert_eq!(Exp.encode(&design).unwrap(), [100, 0, 100, 0, 102, 0]);
}

#[test]
fn dst_header_fields_end_in_line_feed_and_substitute() {
    let design = Design::new(vec![Stitch::new(0.0, 0.0), Stitch::new(10.0, 0.0)]);
    let bytes = Dst::default().encode(&design).unwrap();
    // "LA:" plus the 16-character label
    assert_eq!(bytes[19..21], [0x0A, 0x1A]);
    assert_eq!(Dst::default().decode(&bytes).unwrap().len(), 2);
}

#[test]
fn dst_splits_three_hundred_into_three_records() {
    let design = Design::new(vec![Stitch::new(0.0, 0.0), Stitch::new(300.0, 0.0)]);
    let bytes = Dst::default().encode(&design).unwrap();
    // header, three moves, end record
    assert_eq!(bytes.len(), 512 + 3 * 3 + 3);

    let back = Dst::default().decode(&bytes).unwrap();
    let xs: Vec<f64> = back.stitches().iter().map(|s| s.x).collect();
    assert_eq!(xs, [0.0, 100.0, 200.0, 300.0]);
}

#[test]
fn pipeline_output_survives_every_format() {
    // Keep the design at (0, 0) so the first KSM/PES move is never split.
    let config = TransformConfig {
        translate_to_origin: false,
        triple_stitch: true,
        flatten: Some(50.0),
        ..TransformConfig::default()
    };
    let design = stitchcode_pipeline::process(wander(42, 60), &config).unwrap();
    for format in Format::ALL {
        let bytes = format.write(&design, &Default::default()).unwrap();
        assert!(!bytes.is_empty(), "{format}");
        if format.is_readable() {
            assert_eq!(format.read(&bytes).unwrap().len(), design.len(), "{format}");
        }
    }
}

#[test]
fn empty_design_is_rejected_everywhere() {
    for format in Format::ALL {
        assert!(
            format.write(&Design::default(), &Default::default()).is_err(),
            "{format}"
        );
    }
}
