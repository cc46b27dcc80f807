//! Band pass and envelope filter
//!
//! A recursive band pass and envelope combination. The true envelope needs
//! the Hilbert transform, which a time-domain recursive filter cannot
//! compute. For a narrow-band signal, however, the Hilbert transform is
//! approximately the scaled time derivative, so a narrow band pass followed
//! by `sqrt(x^2 + (K dx/dt)^2)` comes very close in practice. A band width
//! of one octave and a filter order of four work well in most cases; only
//! the center frequency should normally be set.

use std::any::Any;
use std::f64::consts::PI;

use crate::{
    design_bandpass, BiquadCascade, Filter, FilterError, FilterResult, ParamCode,
};

#[derive(Debug, Clone)]
pub struct BandPassEnvelope {
    center_frequency: f64,
    bandwidth_octaves: f64,
    order: usize,
    rate: Option<f64>,
    bandpass: BiquadCascade,
    scale: f64,
    previous: f64,
    after_reset: bool,
}

impl BandPassEnvelope {
    pub fn new(center_frequency: f64) -> Self {
        Self::with_band(center_frequency, 1.0, 4)
    }

    pub fn with_band(center_frequency: f64, bandwidth_octaves: f64, order: usize) -> Self {
        Self {
            center_frequency,
            bandwidth_octaves,
            order,
            rate: None,
            bandpass: BiquadCascade::new(),
            scale: 0.0,
            previous: 0.0,
            after_reset: true,
        }
    }

    pub fn center_frequency(&self) -> f64 {
        self.center_frequency
    }

    fn corners(&self) -> (f64, f64) {
        let half = 0.5 * self.bandwidth_octaves;
        (
            self.center_frequency * 2f64.powf(-half),
            self.center_frequency * 2f64.powf(half),
        )
    }
}

impl Filter for BandPassEnvelope {
    fn name(&self) -> &'static str {
        "BPENV"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if !(rate > 0.0) {
            return Err(FilterError::InvalidSamplingRate(rate));
        }
        let (fmin, fmax) = self.corners();
        self.bandpass
            .set_coeffs(design_bandpass(self.order, fmin, fmax, rate)?);
        // Derivative scale for the approximate Hilbert transform.
        self.scale = rate / (2.0 * PI * self.center_frequency);
        self.rate = Some(rate);
        self.reset();
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        if self.rate.is_none() {
            return Err(FilterError::SamplingRateNotSet);
        }
        self.bandpass.apply_in_place(data);

        for x in data.iter_mut() {
            if self.after_reset {
                self.previous = *x;
                self.after_reset = false;
            }
            let hilbert = self.scale * (*x - self.previous);
            self.previous = *x;
            *x = (*x * *x + hilbert * hilbert).sqrt();
        }
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        match params.len() {
            1..=3 => {}
            _ => return ParamCode::WrongCount { expected: 1 },
        }
        if params[0] <= 0.0 {
            return ParamCode::BadValue { index: 0 };
        }
        self.center_frequency = params[0];
        if params.len() > 1 {
            if params[1] <= 0.0 {
                return ParamCode::BadValue { index: 1 };
            }
            self.bandwidth_octaves = params[1];
        }
        if params.len() > 2 {
            if params[2] < 1.0 || params[2].fract() != 0.0 {
                return ParamCode::BadValue { index: 2 };
            }
            self.order = params[2] as usize;
        }
        ParamCode::Accepted(params.len())
    }

    fn reset(&mut self) {
        self.bandpass.reset_state();
        self.previous = 0.0;
        self.after_reset = true;
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        let mut f =
            BandPassEnvelope::with_band(self.center_frequency, self.bandwidth_octaves, self.order);
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
    fn test_envelope_of_tone_is_flat() {
        let rate = 100.0;
        let f0 = 2.0;
        let mut f = BandPassEnvelope::new(f0);
        f.set_sampling_rate(rate).unwrap();

        let mut data: Vec<f64> = (0..4000)
            .map(|i| (2.0 * PI * f0 * i as f64 / rate).sin())
            .collect();
        f.apply(&mut data).unwrap();

        // After the transient the envelope of a unit tone at the center
        // frequency hovers near one.
        let tail = &data[3000..];
        let min = tail.iter().copied().fold(f64::MAX, f64::min);
        let max = tail.iter().copied().fold(f64::MIN, f64::max);
        assert!(min > 0.8, "envelope sagged to {min}");
        assert!(max < 1.2, "envelope peaked at {max}");
    }

    #[test]
    fn test_output_is_nonnegative() {
        let mut f = BandPassEnvelope::new(1.0);
        f.set_sampling_rate(20.0).unwrap();
        let mut data: Vec<f64> = (0..400).map(|i| ((i % 17) as f64) - 8.0).collect();
        f.apply(&mut data).unwrap();
        assert!(data.iter().all(|&x| x >= 0.0));
    }
}
