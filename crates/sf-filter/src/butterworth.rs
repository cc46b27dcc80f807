//! Butterworth IIR designs
//!
//! Lowpass, highpass, bandpass, bandstop and combined high+low cascades,
//! designed from `(order, corner frequencies)` by bilinear transform of the
//! analog prototype once the sampling rate is known. Each design lands in a
//! [`BiquadCascade`] that does the actual work.

use std::any::Any;
use std::f64::consts::PI;

use num_complex::Complex64;

use crate::{BiquadCascade, BiquadCoeffs, Filter, FilterError, FilterResult, ParamCode};

/// Normalized analog prototype poles (unit cutoff, left half-plane).
fn prototype_poles(order: usize) -> Vec<Complex64> {
    (0..order)
        .map(|k| {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            Complex64::from_polar(1.0, theta)
        })
        .collect()
}

/// Bilinear pre-warp of a corner frequency.
#[inline]
fn warp(freq: f64, fsamp: f64) -> f64 {
    (PI * freq / fsamp).tan()
}

/// Map an analog pole through `s = (z-1)/(z+1)`.
#[inline]
fn to_digital(s: Complex64) -> Complex64 {
    (Complex64::new(1.0, 0.0) + s) / (Complex64::new(1.0, 0.0) - s)
}

/// Denominator coefficients of a section holding `p` and its conjugate.
fn denominator_pair(p: Complex64) -> (f64, f64) {
    (-2.0 * p.re, p.norm_sqr())
}

/// Denominator coefficients of a section holding two real poles.
fn denominator_reals(r1: f64, r2: f64) -> (f64, f64) {
    (-(r1 + r2), r1 * r2)
}

fn check_corner(freq: f64, fsamp: f64) -> FilterResult<()> {
    let nyquist = 0.5 * fsamp;
    if freq <= 0.0 || freq >= nyquist {
        return Err(FilterError::FrequencyAboveNyquist {
            frequency: freq,
            nyquist,
        });
    }
    Ok(())
}

fn normalize(mut section: BiquadCoeffs, omega: f64) -> BiquadCoeffs {
    let mag = section.magnitude_at(omega);
    if mag > 0.0 {
        let scale = 1.0 / mag;
        section.b0 *= scale;
        section.b1 *= scale;
        section.b2 *= scale;
    }
    section
}

/// Lowpass design: corner `fmax`, unity gain at DC.
pub fn design_lowpass(order: usize, fmax: f64, fsamp: f64) -> FilterResult<Vec<BiquadCoeffs>> {
    check_corner(fmax, fsamp)?;
    let wc = warp(fmax, fsamp);
    let mut sections = Vec::with_capacity(order.div_ceil(2));

    for p in prototype_poles(order) {
        if p.im < -1e-12 {
            continue; // conjugate handled with its partner
        }
        let zp = to_digital(p * wc);
        let section = if p.im.abs() < 1e-12 {
            // Real pole: first-order section with a zero at z = -1.
            BiquadCoeffs::new(1.0, 1.0, 0.0, -zp.re, 0.0)
        } else {
            let (a1, a2) = denominator_pair(zp);
            BiquadCoeffs::new(1.0, 2.0, 1.0, a1, a2)
        };
        sections.push(normalize(section, 0.0));
    }
    Ok(sections)
}

/// Highpass design: corner `fmin`, unity gain at Nyquist.
pub fn design_highpass(order: usize, fmin: f64, fsamp: f64) -> FilterResult<Vec<BiquadCoeffs>> {
    check_corner(fmin, fsamp)?;
    let wc = warp(fmin, fsamp);
    let mut sections = Vec::with_capacity(order.div_ceil(2));

    for p in prototype_poles(order) {
        if p.im < -1e-12 {
            continue;
        }
        let zp = to_digital(wc / p);
        let section = if p.im.abs() < 1e-12 {
            BiquadCoeffs::new(1.0, -1.0, 0.0, -zp.re, 0.0)
        } else {
            let (a1, a2) = denominator_pair(zp);
            BiquadCoeffs::new(1.0, -2.0, 1.0, a1, a2)
        };
        sections.push(normalize(section, PI));
    }
    Ok(sections)
}

/// Bandpass design: corners `(fmin, fmax)`, unity gain at the geometric
/// center frequency.
pub fn design_bandpass(
    order: usize,
    fmin: f64,
    fmax: f64,
    fsamp: f64,
) -> FilterResult<Vec<BiquadCoeffs>> {
    check_corner(fmin, fsamp)?;
    check_corner(fmax, fsamp)?;
    if fmin >= fmax {
        return Err(FilterError::InvalidParameter(format!(
            "bandpass corners out of order: {fmin} >= {fmax}"
        )));
    }

    let wl = warp(fmin, fsamp);
    let wu = warp(fmax, fsamp);
    let w0sq = wl * wu;
    let bw = wu - wl;
    let omega0 = 2.0 * w0sq.sqrt().atan();

    let mut sections = Vec::with_capacity(order);
    for p in prototype_poles(order) {
        if p.im < -1e-12 {
            continue;
        }
        // Lowpass-to-bandpass: s_lp = (s^2 + w0^2) / (bw * s), solved for s.
        let bp = p * bw;
        let disc = (bp * bp - Complex64::new(4.0 * w0sq, 0.0)).sqrt();
        let s1 = (bp + disc) / 2.0;
        let s2 = (bp - disc) / 2.0;

        if p.im.abs() < 1e-12 {
            // Real prototype pole maps to one section.
            let section = if disc.im.abs() < 1e-12 && disc.re.abs() > 1e-12 {
                let (a1, a2) = denominator_reals(to_digital(s1).re, to_digital(s2).re);
                BiquadCoeffs::new(1.0, 0.0, -1.0, a1, a2)
            } else {
                let (a1, a2) = denominator_pair(to_digital(s1));
                BiquadCoeffs::new(1.0, 0.0, -1.0, a1, a2)
            };
            sections.push(normalize(section, omega0));
        } else {
            for s in [s1, s2] {
                let (a1, a2) = denominator_pair(to_digital(s));
                let section = BiquadCoeffs::new(1.0, 0.0, -1.0, a1, a2);
                sections.push(normalize(section, omega0));
            }
        }
    }
    Ok(sections)
}

/// Bandstop design: corners `(fmin, fmax)`, unity gain at DC.
pub fn design_bandstop(
    order: usize,
    fmin: f64,
    fmax: f64,
    fsamp: f64,
) -> FilterResult<Vec<BiquadCoeffs>> {
    check_corner(fmin, fsamp)?;
    check_corner(fmax, fsamp)?;
    if fmin >= fmax {
        return Err(FilterError::InvalidParameter(format!(
            "bandstop corners out of order: {fmin} >= {fmax}"
        )));
    }

    let wl = warp(fmin, fsamp);
    let wu = warp(fmax, fsamp);
    let w0sq = wl * wu;
    let bw = wu - wl;
    let omega0 = 2.0 * w0sq.sqrt().atan();
    let notch_b1 = -2.0 * omega0.cos();

    let mut sections = Vec::with_capacity(order);
    for p in prototype_poles(order) {
        if p.im < -1e-12 {
            continue;
        }
        // Lowpass-to-bandstop: s_lp = bw * s / (s^2 + w0^2), solved for s.
        let b_over_p = Complex64::new(bw, 0.0) / p;
        let disc = (b_over_p * b_over_p - Complex64::new(4.0 * w0sq, 0.0)).sqrt();
        let s1 = (b_over_p + disc) / 2.0;
        let s2 = (b_over_p - disc) / 2.0;

        if p.im.abs() < 1e-12 {
            let section = if disc.im.abs() < 1e-12 && disc.re.abs() > 1e-12 {
                let (a1, a2) = denominator_reals(to_digital(s1).re, to_digital(s2).re);
                BiquadCoeffs::new(1.0, notch_b1, 1.0, a1, a2)
            } else {
                let (a1, a2) = denominator_pair(to_digital(s1));
                BiquadCoeffs::new(1.0, notch_b1, 1.0, a1, a2)
            };
            sections.push(normalize(section, 0.0));
        } else {
            for s in [s1, s2] {
                let (a1, a2) = denominator_pair(to_digital(s));
                let section = BiquadCoeffs::new(1.0, notch_b1, 1.0, a1, a2);
                sections.push(normalize(section, 0.0));
            }
        }
    }
    Ok(sections)
}

/// Highpass followed by lowpass of the same order.
pub fn design_high_lowpass(
    order: usize,
    fmin: f64,
    fmax: f64,
    fsamp: f64,
) -> FilterResult<Vec<BiquadCoeffs>> {
    let mut sections = design_highpass(order, fmin, fsamp)?;
    sections.extend(design_lowpass(order, fmax, fsamp)?);
    Ok(sections)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Lowpass,
    Highpass,
    Bandpass,
    Bandstop,
    HighLowpass,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Lowpass => "BW_LP",
            Kind::Highpass => "BW_HP",
            Kind::Bandpass => "BW",
            Kind::Bandstop => "BW_BS",
            Kind::HighLowpass => "BW_HLP",
        }
    }

    fn param_count(self) -> usize {
        match self {
            Kind::Lowpass | Kind::Highpass => 2,
            _ => 3,
        }
    }
}

/// A Butterworth filter of any of the five supported kinds.
///
/// The cascade is designed lazily when the sampling rate arrives.
#[derive(Debug, Clone)]
pub struct Butterworth {
    kind: Kind,
    order: usize,
    fmin: f64,
    fmax: f64,
    rate: Option<f64>,
    locked: bool,
    cascade: BiquadCascade,
}

impl Butterworth {
    pub fn lowpass(order: usize, fmax: f64) -> Self {
        Self::with_kind(Kind::Lowpass, order, 0.0, fmax)
    }

    pub fn highpass(order: usize, fmin: f64) -> Self {
        Self::with_kind(Kind::Highpass, order, fmin, 0.0)
    }

    pub fn bandpass(order: usize, fmin: f64, fmax: f64) -> Self {
        Self::with_kind(Kind::Bandpass, order, fmin, fmax)
    }

    pub fn bandstop(order: usize, fmin: f64, fmax: f64) -> Self {
        Self::with_kind(Kind::Bandstop, order, fmin, fmax)
    }

    pub fn high_lowpass(order: usize, fmin: f64, fmax: f64) -> Self {
        Self::with_kind(Kind::HighLowpass, order, fmin, fmax)
    }

    fn with_kind(kind: Kind, order: usize, fmin: f64, fmax: f64) -> Self {
        Self {
            kind,
            order,
            fmin,
            fmax,
            rate: None,
            locked: false,
            cascade: BiquadCascade::new(),
        }
    }

    /// `(order, fmin, fmax)`; unused corners are zero.
    pub fn params(&self) -> (usize, f64, f64) {
        (self.order, self.fmin, self.fmax)
    }

    pub fn cascade(&self) -> &BiquadCascade {
        &self.cascade
    }

    fn design(&self, fsamp: f64) -> FilterResult<Vec<BiquadCoeffs>> {
        match self.kind {
            Kind::Lowpass => design_lowpass(self.order, self.fmax, fsamp),
            Kind::Highpass => design_highpass(self.order, self.fmin, fsamp),
            Kind::Bandpass => design_bandpass(self.order, self.fmin, self.fmax, fsamp),
            Kind::Bandstop => design_bandstop(self.order, self.fmin, self.fmax, fsamp),
            Kind::HighLowpass => design_high_lowpass(self.order, self.fmin, self.fmax, fsamp),
        }
    }
}

impl Filter for Butterworth {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if self.rate == Some(rate) {
            return Ok(());
        }
        if self.locked {
            return Err(FilterError::SamplingRateLocked);
        }
        if !(rate > 0.0) {
            return Err(FilterError::InvalidSamplingRate(rate));
        }
        self.cascade.set_coeffs(self.design(rate)?);
        self.rate = Some(rate);
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        if self.rate.is_none() {
            return Err(FilterError::SamplingRateNotSet);
        }
        self.locked = true;
        self.cascade.apply_in_place(data);
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        let expected = self.kind.param_count();
        if params.len() != expected {
            return ParamCode::WrongCount { expected };
        }
        if params[0] < 1.0 || params[0].fract() != 0.0 {
            return ParamCode::BadValue { index: 0 };
        }
        for (i, &p) in params[1..].iter().enumerate() {
            if p <= 0.0 {
                return ParamCode::BadValue { index: i + 1 };
            }
        }

        self.order = params[0] as usize;
        match self.kind {
            Kind::Lowpass => self.fmax = params[1],
            Kind::Highpass => self.fmin = params[1],
            _ => {
                self.fmin = params[1];
                self.fmax = params[2];
            }
        }
        if let Some(rate) = self.rate {
            if self.locked {
                return ParamCode::BadValue { index: 0 };
            }
            match self.design(rate) {
                Ok(coeffs) => self.cascade.set_coeffs(coeffs),
                Err(_) => return ParamCode::BadValue { index: 1 },
            }
        }
        ParamCode::Accepted(expected)
    }

    fn reset(&mut self) {
        self.cascade.reset_state();
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        let mut f = Self::with_kind(self.kind, self.order, self.fmin, self.fmax);
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

    fn settle(filter: &mut dyn Filter, value: f64, n: usize) -> f64 {
        let mut out = 0.0;
        for _ in 0..n {
            let mut block = [value];
            filter.apply(&mut block).unwrap();
            out = block[0];
        }
        out
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut f = Butterworth::lowpass(4, 5.0);
        f.set_sampling_rate(100.0).unwrap();
        let out = settle(&mut f, 1.0, 2000);
        assert!((out - 1.0).abs() < 1e-3, "dc gain was {out}");
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut f = Butterworth::highpass(4, 2.0);
        f.set_sampling_rate(100.0).unwrap();
        let out = settle(&mut f, 1.0, 2000);
        assert!(out.abs() < 1e-3, "dc leak was {out}");
    }

    #[test]
    fn test_bandpass_blocks_dc_and_nyquist() {
        let mut f = Butterworth::bandpass(4, 0.5, 5.0);
        f.set_sampling_rate(20.0).unwrap();
        let dc = settle(&mut f, 1.0, 4000);
        assert!(dc.abs() < 1e-2, "dc leak was {dc}");

        f.reset();
        // Nyquist tone
        let mut last = 0.0;
        for i in 0..4000 {
            let mut block = [if i % 2 == 0 { 1.0 } else { -1.0 }];
            f.apply(&mut block).unwrap();
            last = block[0];
        }
        assert!(last.abs() < 1e-2, "nyquist leak was {last}");
    }

    #[test]
    fn test_bandpass_passes_center() {
        let mut f = Butterworth::bandpass(4, 0.5, 5.0);
        f.set_sampling_rate(20.0).unwrap();
        // Center tone sqrt(0.5*5) ~ 1.58 Hz
        let fc = (0.5f64 * 5.0).sqrt();
        let mut peak: f64 = 0.0;
        for i in 0..4000 {
            let t = i as f64 / 20.0;
            let mut block = [(2.0 * PI * fc * t).sin()];
            f.apply(&mut block).unwrap();
            if i > 2000 {
                peak = peak.max(block[0].abs());
            }
        }
        assert!((peak - 1.0).abs() < 0.05, "center gain was {peak}");
    }

    #[test]
    fn test_rejects_corner_above_nyquist() {
        let mut f = Butterworth::lowpass(4, 15.0);
        assert!(matches!(
            f.set_sampling_rate(20.0),
            Err(FilterError::FrequencyAboveNyquist { .. })
        ));
    }

    #[test]
    fn test_apply_without_rate_fails() {
        let mut f = Butterworth::bandpass(4, 0.5, 5.0);
        let mut data = [0.0; 4];
        assert!(matches!(
            f.apply(&mut data),
            Err(FilterError::SamplingRateNotSet)
        ));
    }

    #[test]
    fn test_rate_locked_after_apply() {
        let mut f = Butterworth::bandpass(4, 0.5, 5.0);
        f.set_sampling_rate(20.0).unwrap();
        let mut data = [0.0; 4];
        f.apply(&mut data).unwrap();
        assert!(matches!(
            f.set_sampling_rate(40.0),
            Err(FilterError::SamplingRateLocked)
        ));
    }

    #[test]
    fn test_set_parameters_codes() {
        let mut f = Butterworth::bandpass(3, 0.7, 2.0);
        assert_eq!(
            f.set_parameters(&[4.0, 0.5, 5.0]),
            ParamCode::Accepted(3)
        );
        assert_eq!(f.params(), (4, 0.5, 5.0));
        assert_eq!(
            f.set_parameters(&[4.0, 0.5]),
            ParamCode::WrongCount { expected: 3 }
        );
        assert_eq!(
            f.set_parameters(&[0.0, 0.5, 5.0]),
            ParamCode::BadValue { index: 0 }
        );
    }

    #[test]
    fn test_odd_order_sections() {
        let sections = design_lowpass(5, 5.0, 100.0).unwrap();
        assert_eq!(sections.len(), 3);
        let sections = design_bandpass(3, 0.5, 5.0, 100.0).unwrap();
        assert_eq!(sections.len(), 3);
    }
}
