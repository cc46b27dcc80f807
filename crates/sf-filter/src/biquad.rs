//! Biquad filter sections using Transposed Direct Form II
//!
//! TDF-II is numerically optimal for floating-point arithmetic, minimizing
//! quantization noise and ensuring stability. Cascades carry state across
//! calls; clones share structure but reset state.

use std::any::Any;

use crate::{Filter, FilterError, FilterResult, ParamCode};

/// Normalized biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    pub fn new(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Self { b0, b1, b2, a1, a2 }
    }

    /// Normalize a full six-coefficient set by `a0`.
    pub fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Unity gain, no filtering.
    pub fn bypass() -> Self {
        Self {
            b0: 1.0,
            ..Default::default()
        }
    }

    /// Complex frequency response magnitude at normalized angular
    /// frequency `omega` (radians per sample).
    pub fn magnitude_at(&self, omega: f64) -> f64 {
        use num_complex::Complex64;
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = Complex64::new(self.b0, 0.0) + z1 * self.b1 + z2 * self.b2;
        let den = Complex64::new(1.0, 0.0) + z1 * self.a1 + z2 * self.a2;
        (num / den).norm()
    }
}

/// A single TDF-II biquad section.
#[derive(Debug, Clone, Default)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    z1: f64,
    z2: f64,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    #[inline(always)]
    pub fn process_sample(&mut self, input: f64) -> f64 {
        let output = self.coeffs.b0 * input + self.z1;
        self.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.z2;
        self.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }

    pub fn reset_state(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

impl Filter for Biquad {
    fn name(&self) -> &'static str {
        "BIQUAD"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if !(rate > 0.0) {
            return Err(FilterError::InvalidSamplingRate(rate));
        }
        // Coefficients are given directly; nothing depends on the rate.
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        for x in data.iter_mut() {
            *x = self.process_sample(*x);
        }
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        if params.len() != 5 {
            return ParamCode::WrongCount { expected: 5 };
        }
        self.coeffs = BiquadCoeffs::new(params[0], params[1], params[2], params[3], params[4]);
        ParamCode::Accepted(5)
    }

    fn reset(&mut self) {
        self.reset_state();
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        Box::new(Biquad::new(self.coeffs))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An ordered cascade of biquad sections sharing one pass over the data.
#[derive(Debug, Clone, Default)]
pub struct BiquadCascade {
    stages: Vec<Biquad>,
}

impl BiquadCascade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_coeffs(coeffs: Vec<BiquadCoeffs>) -> Self {
        Self {
            stages: coeffs.into_iter().map(Biquad::new).collect(),
        }
    }

    pub fn set_coeffs(&mut self, coeffs: Vec<BiquadCoeffs>) {
        self.stages = coeffs.into_iter().map(Biquad::new).collect();
    }

    pub fn stages(&self) -> &[Biquad] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    #[inline(always)]
    pub fn process_sample(&mut self, input: f64) -> f64 {
        let mut x = input;
        for stage in &mut self.stages {
            x = stage.process_sample(x);
        }
        x
    }

    pub fn apply_in_place(&mut self, data: &mut [f64]) {
        for x in data.iter_mut() {
            *x = self.process_sample(*x);
        }
    }

    pub fn reset_state(&mut self) {
        for stage in &mut self.stages {
            stage.reset_state();
        }
    }

    /// Magnitude of the cascade response at `omega` radians per sample.
    pub fn magnitude_at(&self, omega: f64) -> f64 {
        self.stages
            .iter()
            .map(|s| s.coeffs().magnitude_at(omega))
            .product()
    }
}

impl Filter for BiquadCascade {
    fn name(&self) -> &'static str {
        "BIQUADS"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if !(rate > 0.0) {
            return Err(FilterError::InvalidSamplingRate(rate));
        }
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        self.apply_in_place(data);
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        // Flat groups of five per stage.
        if params.is_empty() || params.len() % 5 != 0 {
            return ParamCode::WrongCount {
                expected: (params.len() / 5 + 1) * 5,
            };
        }
        let coeffs = params
            .chunks_exact(5)
            .map(|c| BiquadCoeffs::new(c[0], c[1], c[2], c[3], c[4]))
            .collect();
        self.set_coeffs(coeffs);
        ParamCode::Accepted(params.len())
    }

    fn reset(&mut self) {
        self.reset_state();
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        Box::new(BiquadCascade::from_coeffs(
            self.stages.iter().map(|s| *s.coeffs()).collect(),
        ))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
