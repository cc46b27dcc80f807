//! Time-domain seismometer restitution
//!
//! Inverts a seismometer described by corner period `T0`, damping `h` and
//! gain, following the difference scheme of Kanamori & Rivera (2008): the
//! ground motion is recovered as a combination of the recorded trace and
//! its first and second running integrals. Works for h > 1 as well (both
//! poles on the real axis). An optional band pass stabilizes the two
//! integrators against drift.

use std::any::Any;
use std::f64::consts::PI;

use crate::{
    design_high_lowpass, BiquadCascade, Filter, FilterError, FilterResult, ParamCode,
};

/// Restitution coefficients for a seismometer `(T0, h, gain)` at `fsamp`.
///
/// `c0..c2` weight the trace, its single and its double cumulative sum.
pub fn coefficients_from_t0_h(fsamp: f64, gain: f64, t0: f64, h: f64) -> Option<(f64, f64, f64)> {
    if fsamp <= 0.0 || gain == 0.0 || t0 <= 0.0 || h <= 0.0 {
        return None;
    }
    let dt = 1.0 / fsamp;
    let w0 = 2.0 * PI / t0;
    let c0 = 1.0 / gain;
    let c1 = 2.0 * h * w0 * dt / gain;
    let c2 = w0 * w0 * dt * dt / gain;
    Some((c0, c1, c2))
}

#[derive(Debug, Clone)]
pub struct Restitution {
    t0: f64,
    h: f64,
    gain: f64,
    rate: Option<f64>,
    c: (f64, f64, f64),
    cumsum1: f64,
    cumsum2: f64,
    bandpass: Option<(usize, f64, f64)>,
    bandpass_filter: BiquadCascade,
}

impl Restitution {
    pub fn new(t0: f64, h: f64, gain: f64) -> Self {
        Self {
            t0,
            h,
            gain,
            rate: None,
            c: (0.0, 0.0, 0.0),
            cumsum1: 0.0,
            cumsum2: 0.0,
            bandpass: None,
            bandpass_filter: BiquadCascade::new(),
        }
    }

    /// Stabilizing band pass applied after the deconvolution. An order of
    /// four matches what Kanamori & Rivera used.
    pub fn set_bandpass(&mut self, order: usize, fmin: f64, fmax: f64) {
        self.bandpass = Some((order, fmin, fmax));
    }

    pub fn seismometer(&self) -> (f64, f64, f64) {
        (self.t0, self.h, self.gain)
    }
}

impl Filter for Restitution {
    fn name(&self) -> &'static str {
        "RES"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if !(rate > 0.0) {
            return Err(FilterError::InvalidSamplingRate(rate));
        }
        self.c = coefficients_from_t0_h(rate, self.gain, self.t0, self.h).ok_or_else(|| {
            FilterError::InvalidParameter(format!(
                "unusable seismometer constants T0={} h={} gain={}",
                self.t0, self.h, self.gain
            ))
        })?;
        if let Some((order, fmin, fmax)) = self.bandpass {
            self.bandpass_filter
                .set_coeffs(design_high_lowpass(order, fmin, fmax, rate)?);
        }
        self.rate = Some(rate);
        self.reset();
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        if self.rate.is_none() {
            return Err(FilterError::SamplingRateNotSet);
        }
        let (c0, c1, c2) = self.c;
        for x in data.iter_mut() {
            let y = *x;
            self.cumsum1 += y;
            self.cumsum2 += self.cumsum1;
            *x = c0 * y + c1 * self.cumsum1 + c2 * self.cumsum2;
        }
        if !self.bandpass_filter.is_empty() {
            self.bandpass_filter.apply_in_place(data);
        }
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        match params.len() {
            3 | 6 => {}
            _ => return ParamCode::WrongCount { expected: 3 },
        }
        if params[0] <= 0.0 {
            return ParamCode::BadValue { index: 0 };
        }
        if params[1] <= 0.0 {
            return ParamCode::BadValue { index: 1 };
        }
        if params[2] == 0.0 {
            return ParamCode::BadValue { index: 2 };
        }
        self.t0 = params[0];
        self.h = params[1];
        self.gain = params[2];
        if params.len() == 6 {
            if params[3] < 1.0 || params[3].fract() != 0.0 {
                return ParamCode::BadValue { index: 3 };
            }
            self.bandpass = Some((params[3] as usize, params[4], params[5]));
        }
        ParamCode::Accepted(params.len())
    }

    fn reset(&mut self) {
        self.cumsum1 = 0.0;
        self.cumsum2 = 0.0;
        self.bandpass_filter.reset_state();
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        let mut f = Restitution::new(self.t0, self.h, self.gain);
        f.bandpass = self.bandpass;
        if let Some(rate) = self.rate {
            let _ = f.set_sampling_rate(rate);
        }
        Box::new(f)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficients_shape() {
        let (c0, c1, c2) = coefficients_from_t0_h(100.0, 2.0, 120.0, 0.707).unwrap();
        assert!((c0 - 0.5).abs() < 1e-12);
        assert!(c1 > 0.0 && c1 < c0);
        assert!(c2 > 0.0 && c2 < c1);
        // Overdamped seismometers are fine too
        assert!(coefficients_from_t0_h(100.0, 1.0, 10.0, 1.5).is_some());
        assert!(coefficients_from_t0_h(100.0, 1.0, -10.0, 0.7).is_none());
    }

    #[test]
    fn test_long_period_limit_is_gain_division() {
        // With T0 -> inf the correction terms vanish and only 1/gain stays.
        let mut f = Restitution::new(1e9, 0.707, 4.0);
        f.set_sampling_rate(20.0).unwrap();
        let mut data = [8.0, 8.0, 8.0];
        f.apply(&mut data).unwrap();
        for &x in &data {
            assert!((x - 2.0).abs() < 1e-6, "got {x}");
        }
    }

    #[test]
    fn test_bandpass_bounds_drift() {
        let mut raw = Restitution::new(5.0, 0.707, 1.0);
        let mut stabilized = Restitution::new(5.0, 0.707, 1.0);
        stabilized.set_bandpass(4, 0.05, 8.0);
        raw.set_sampling_rate(20.0).unwrap();
        stabilized.set_sampling_rate(20.0).unwrap();

        let mut a = vec![1.0; 4000];
        let mut b = a.clone();
        raw.apply(&mut a).unwrap();
        stabilized.apply(&mut b).unwrap();

        // The double integrator diverges on a constant offset; the band
        // pass keeps the output bounded.
        assert!(a[3999].abs() > 1e3);
        assert!(b[3999].abs() < 10.0);
    }
}
