//! Catalogue-wide contract tests
//!
//! Every parseable filter must behave identically to a fresh clone fed the
//! same prefix, must refuse to run without a sampling rate where it needs
//! one, and must reproduce its output bit-exactly on identical input.

use sf_filter::{parse_filter, Filter};

const DETERMINISTIC_EXPRESSIONS: &[&str] = &[
    "BW(4,0.5,5)",
    "BW_LP(4,5)",
    "BW_HP(4,0.5)",
    "BW_BS(3,1,2)",
    "BW_HLP(3,0.5,5)",
    "AVG(1)",
    "MIN(0.5)",
    "MAX(0.5)",
    "CUTOFF(50)",
    "STALTA(1,10)",
    "STALTA2(1,10,3,1)",
    "BPENV(2)",
    "RMHP(2)",
    "ITAPER(1)",
    "SELF",
    "WA",
    "SM5",
    "RES(5,0.707,1)",
    "BW(4,0.5,5)>>STALTA(1,60)",
    "ITAPER(1)>>BW(4,0.5,5)>>AVG(0.5)",
];

fn test_signal(n: usize) -> Vec<f64> {
    // Deterministic mix of tones and a step, no RNG involved
    (0..n)
        .map(|i| {
            let t = i as f64 / 100.0;
            let step = if i > n / 2 { 25.0 } else { 0.0 };
            40.0 * (2.0 * std::f64::consts::PI * 1.5 * t).sin()
                + 10.0 * (2.0 * std::f64::consts::PI * 7.0 * t).sin()
                + step
        })
        .collect()
}

fn run(filter: &mut dyn Filter, input: &[f64], block: usize) -> Vec<f64> {
    let mut out = input.to_vec();
    for chunk in out.chunks_mut(block) {
        filter.apply(chunk).expect("apply");
    }
    out
}

#[test]
fn clone_then_apply_matches_original() {
    for expr in DETERMINISTIC_EXPRESSIONS {
        let mut original = parse_filter(expr).unwrap_or_else(|e| panic!("{expr}: {e}"));
        original.set_sampling_rate(100.0).expect(expr);
        let mut clone = original.clone_fresh();

        let input = test_signal(2048);
        let a = run(original.as_mut(), &input, 2048);
        let b = run(clone.as_mut(), &input, 2048);

        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert_eq!(x, y, "{expr}: clone diverged at sample {i}");
        }
    }
}

#[test]
fn block_size_does_not_change_output() {
    for expr in DETERMINISTIC_EXPRESSIONS {
        let mut whole = parse_filter(expr).unwrap();
        whole.set_sampling_rate(100.0).unwrap();
        let mut blocks = parse_filter(expr).unwrap();
        blocks.set_sampling_rate(100.0).unwrap();

        let input = test_signal(1000);
        let a = run(whole.as_mut(), &input, 1000);
        let b = run(blocks.as_mut(), &input, 17);

        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!(
                (x - y).abs() < 1e-9,
                "{expr}: blocked apply diverged at sample {i}: {x} vs {y}"
            );
        }
    }
}

#[test]
fn reset_restores_initial_behavior() {
    for expr in DETERMINISTIC_EXPRESSIONS {
        let mut filter = parse_filter(expr).unwrap();
        filter.set_sampling_rate(100.0).unwrap();

        let input = test_signal(512);
        let first = run(filter.as_mut(), &input, 512);
        filter.reset();
        let second = run(filter.as_mut(), &input, 512);

        for (i, (x, y)) in first.iter().zip(second.iter()).enumerate() {
            assert!(
                (x - y).abs() < 1e-9,
                "{expr}: reset did not restore state at sample {i}"
            );
        }
    }
}
