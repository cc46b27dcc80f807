//! Biquad cascade benchmarks

use criterion::{criterion_group, criterion_main, Criterion};
use sf_filter::{design_bandpass, BiquadCascade};

fn bench_cascade(c: &mut Criterion) {
    let coeffs = design_bandpass(4, 0.5, 5.0, 100.0).unwrap();
    let mut cascade = BiquadCascade::from_coeffs(coeffs);
    let mut buffer: Vec<f64> = (0..4096).map(|i| ((i % 64) as f64) / 64.0 - 0.5).collect();

    c.bench_function("bandpass_order4_4096", |b| {
        b.iter(|| {
            cascade.apply_in_place(std::hint::black_box(&mut buffer));
        })
    });
}

criterion_group!(benches, bench_cascade);
criterion_main!(benches);
