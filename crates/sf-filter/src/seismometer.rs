//! Seismometer response simulation
//!
//! Classic instrument responses as poles and zeros, and a filter that
//! applies such a response to a stream by exact bilinear transform of the
//! rational transfer function. The Wood-Anderson torsion instrument defines
//! the local magnitude ML; the 5-second seismometer backs the medium-period
//! amplitude types.

use std::any::Any;
use std::f64::consts::PI;

use num_complex::Complex64;

use crate::{Biquad, BiquadCoeffs, Filter, FilterError, FilterResult, ParamCode};

/// Physical quantity arriving at the simulated instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundMotion {
    Displacement,
    Velocity,
    Acceleration,
}

/// A transfer function as poles, zeros and a normalization factor.
#[derive(Debug, Clone, Default)]
pub struct PolesAndZeros {
    pub poles: Vec<Complex64>,
    pub zeros: Vec<Complex64>,
    pub norm: f64,
}

impl PolesAndZeros {
    pub fn new(poles: Vec<Complex64>, zeros: Vec<Complex64>, norm: f64) -> Self {
        Self { poles, zeros, norm }
    }

    /// Second-order instrument `(gain, T0, h)` responding to `input`.
    ///
    /// The displacement response carries two zeros at the origin; velocity
    /// and acceleration input remove one and two of them.
    pub fn second_order(gain: f64, t0: f64, h: f64, input: GroundMotion) -> Self {
        let w0 = 2.0 * PI / t0;
        let im = (1.0 - h * h).abs().sqrt();
        let (p1, p2) = if h <= 1.0 {
            (
                Complex64::new(-h, im) * w0,
                Complex64::new(-h, -im) * w0,
            )
        } else {
            (
                Complex64::new(-h + im, 0.0) * w0,
                Complex64::new(-h - im, 0.0) * w0,
            )
        };
        let zero_count = match input {
            GroundMotion::Displacement => 2,
            GroundMotion::Velocity => 1,
            GroundMotion::Acceleration => 0,
        };
        Self {
            poles: vec![p1, p2],
            zeros: vec![Complex64::new(0.0, 0.0); zero_count],
            norm: gain,
        }
    }
}

/// Wood-Anderson calibration constants.
///
/// Gutenberg (1935): gain=2800, T0=0.8 s, h=0.8. Uhrhammer and Collins
/// (1990): gain=2080, T0=0.8 s, h=0.7, the version recommended by the
/// IASPEI magnitude working group (2011).
#[derive(Debug, Clone, Copy)]
pub struct WoodAndersonConfig {
    pub gain: f64,
    pub t0: f64,
    pub h: f64,
}

impl Default for WoodAndersonConfig {
    fn default() -> Self {
        Self {
            gain: 2800.0,
            t0: 0.8,
            h: 0.8,
        }
    }
}

/// Wood-Anderson response for the given input motion.
pub fn wood_anderson(input: GroundMotion, config: WoodAndersonConfig) -> PolesAndZeros {
    PolesAndZeros::second_order(config.gain, config.t0, config.h, input)
}

/// Generic 5-second seismometer (T0=5 s, h=0.707, unity gain).
pub fn seismometer_5sec(input: GroundMotion) -> PolesAndZeros {
    PolesAndZeros::second_order(1.0, 5.0, 0.707, input)
}

/// Exact bilinear transform of a response with at most two poles and two
/// zeros into one digital biquad section.
pub fn paz_to_biquad(paz: &PolesAndZeros, fsamp: f64) -> FilterResult<BiquadCoeffs> {
    if paz.poles.len() > 2 || paz.zeros.len() > 2 || paz.poles.len() < paz.zeros.len() {
        return Err(FilterError::InvalidParameter(format!(
            "unsupported response shape: {} poles, {} zeros",
            paz.poles.len(),
            paz.zeros.len()
        )));
    }
    if !(fsamp > 0.0) {
        return Err(FilterError::InvalidSamplingRate(fsamp));
    }

    let two_fs = 2.0 * fsamp;
    let order = paz.poles.len();

    // s = 2 fs (z-1)/(z+1); every root r contributes the linear factor
    // (2 fs - r) z - (2 fs + r), and each missing zero a factor (z + 1).
    let linear = |r: Complex64| -> [Complex64; 2] {
        [Complex64::new(two_fs, 0.0) - r, -(Complex64::new(two_fs, 0.0) + r)]
    };
    let unit = [Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0)];

    let poly_mul = |a: &[Complex64], b: &[Complex64]| -> Vec<Complex64> {
        let mut out = vec![Complex64::new(0.0, 0.0); a.len() + b.len() - 1];
        for (i, &x) in a.iter().enumerate() {
            for (j, &y) in b.iter().enumerate() {
                out[i + j] += x * y;
            }
        }
        out
    };

    let mut num: Vec<Complex64> = vec![Complex64::new(paz.norm, 0.0)];
    for &z in &paz.zeros {
        num = poly_mul(&num, &linear(z));
    }
    for _ in paz.zeros.len()..order {
        num = poly_mul(&num, &unit);
    }

    let mut den: Vec<Complex64> = vec![Complex64::new(1.0, 0.0)];
    for &p in &paz.poles {
        den = poly_mul(&den, &linear(p));
    }

    // Descending powers of z; pad to degree 2.
    while num.len() < 3 {
        num.push(Complex64::new(0.0, 0.0));
    }
    while den.len() < 3 {
        den.push(Complex64::new(0.0, 0.0));
    }

    let a0 = den[0].re;
    if a0.abs() < f64::EPSILON {
        return Err(FilterError::InvalidParameter(
            "degenerate response denominator".into(),
        ));
    }
    Ok(BiquadCoeffs::new(
        num[0].re / a0,
        num[1].re / a0,
        num[2].re / a0,
        den[1].re / a0,
        den[2].re / a0,
    ))
}

/// Applies an instrument response to the stream.
#[derive(Debug, Clone)]
pub struct SimulationFilter {
    registry_name: &'static str,
    paz: PolesAndZeros,
    rate: Option<f64>,
    section: Biquad,
}

impl SimulationFilter {
    pub fn new(registry_name: &'static str, paz: PolesAndZeros) -> Self {
        Self {
            registry_name,
            paz,
            rate: None,
            section: Biquad::default(),
        }
    }

    /// Wood-Anderson simulation for velocity input (the usual case for
    /// modern instruments after gain removal).
    pub fn wood_anderson(input: GroundMotion) -> Self {
        Self::new("WA", wood_anderson(input, WoodAndersonConfig::default()))
    }

    pub fn seismometer_5sec(input: GroundMotion) -> Self {
        Self::new("SM5", seismometer_5sec(input))
    }

    pub fn response(&self) -> &PolesAndZeros {
        &self.paz
    }
}

impl Filter for SimulationFilter {
    fn name(&self) -> &'static str {
        self.registry_name
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if self.rate == Some(rate) {
            return Ok(());
        }
        self.section = Biquad::new(paz_to_biquad(&self.paz, rate)?);
        self.rate = Some(rate);
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        if self.rate.is_none() {
            return Err(FilterError::SamplingRateNotSet);
        }
        for x in data.iter_mut() {
            *x = self.section.process_sample(*x);
        }
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        if !params.is_empty() {
            return ParamCode::WrongCount { expected: 0 };
        }
        ParamCode::Accepted(0)
    }

    fn reset(&mut self) {
        self.section.reset_state();
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        let mut f = SimulationFilter::new(self.registry_name, self.paz.clone());
        if let Some(rate) = self.rate {
            let _ = f.set_sampling_rate(rate);
        }
        Box::new(f)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
