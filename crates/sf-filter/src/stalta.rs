//! STA/LTA trigger filters
//!
//! The classic detector keeps two recursively updated averages of the
//! squared signal with independent time constants and outputs their ratio.
//! The thresholded variant freezes the long-term average while an event is
//! on, leaking only a configurable bleed fraction into it.

use std::any::Any;

use crate::{Filter, FilterError, FilterResult, ParamCode};

fn window_samples(seconds: f64, rate: f64) -> f64 {
    (seconds * rate).max(1.0)
}

/// Classic STA/LTA of the squared signal.
#[derive(Debug, Clone)]
pub struct StaLta {
    len_sta: f64,
    len_lta: f64,
    rate: Option<f64>,
    num_sta: f64,
    num_lta: f64,
    init_length: f64,
    sample_count: f64,
    sta: f64,
    lta: f64,
}

impl StaLta {
    pub fn new(len_sta: f64, len_lta: f64) -> Self {
        Self {
            len_sta,
            len_lta,
            rate: None,
            num_sta: 1.0,
            num_lta: 1.0,
            init_length: 0.0,
            sample_count: 0.0,
            sta: 0.0,
            lta: 0.0,
        }
    }

    pub fn lengths(&self) -> (f64, f64) {
        (self.len_sta, self.len_lta)
    }

    #[inline]
    fn step(&mut self, x: f64) -> f64 {
        let v = x * x;
        self.sample_count += 1.0;

        if self.sample_count <= self.init_length {
            // Warm-up: growing-window averages, flat ratio output.
            let n = self.sample_count;
            self.sta += (v - self.sta) / n.min(self.num_sta);
            self.lta += (v - self.lta) / n;
            return 1.0;
        }

        self.sta += (v - self.sta) / self.num_sta;
        self.lta += (v - self.lta) / self.num_lta;

        if self.lta > 0.0 {
            self.sta / self.lta
        } else {
            1.0
        }
    }
}

impl Filter for StaLta {
    fn name(&self) -> &'static str {
        "STALTA"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if !(rate > 0.0) {
            return Err(FilterError::InvalidSamplingRate(rate));
        }
        self.num_sta = window_samples(self.len_sta, rate);
        self.num_lta = window_samples(self.len_lta, rate);
        self.init_length = self.num_lta;
        self.rate = Some(rate);
        self.reset();
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        if self.rate.is_none() {
            return Err(FilterError::SamplingRateNotSet);
        }
        for x in data.iter_mut() {
            *x = self.step(*x);
        }
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        if params.len() != 2 {
            return ParamCode::WrongCount { expected: 2 };
        }
        if params[0] <= 0.0 {
            return ParamCode::BadValue { index: 0 };
        }
        if params[1] <= params[0] {
            return ParamCode::BadValue { index: 1 };
        }
        self.len_sta = params[0];
        self.len_lta = params[1];
        if let Some(rate) = self.rate {
            self.num_sta = window_samples(self.len_sta, rate);
            self.num_lta = window_samples(self.len_lta, rate);
            self.init_length = self.num_lta;
        }
        ParamCode::Accepted(2)
    }

    fn reset(&mut self) {
        self.sample_count = 0.0;
        self.sta = 0.0;
        self.lta = 0.0;
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        let mut f = StaLta::new(self.len_sta, self.len_lta);
        if let Some(rate) = self.rate {
            let _ = f.set_sampling_rate(rate);
        }
        Box::new(f)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// STA/LTA with event-on/event-off thresholds.
///
/// While the ratio stays above `event_on` the long-term average only
/// receives `bleed` times its normal update, so a long event does not
/// deflate its own trigger ratio. Normal updating resumes once the ratio
/// falls below `event_off`.
#[derive(Debug, Clone)]
pub struct StaLta2 {
    inner: StaLta,
    event_on: f64,
    event_off: f64,
    bleed: f64,
    triggered: bool,
}

impl StaLta2 {
    pub fn new(len_sta: f64, len_lta: f64, event_on: f64, event_off: f64) -> Self {
        Self {
            inner: StaLta::new(len_sta, len_lta),
            event_on,
            event_off,
            bleed: 0.0,
            triggered: false,
        }
    }

    pub fn set_bleed(&mut self, bleed: f64) {
        self.bleed = bleed.clamp(0.0, 1.0);
    }

    pub fn thresholds(&self) -> (f64, f64) {
        (self.event_on, self.event_off)
    }
}

impl Filter for StaLta2 {
    fn name(&self) -> &'static str {
        "STALTA2"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        self.inner.set_sampling_rate(rate)
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        if self.inner.rate.is_none() {
            return Err(FilterError::SamplingRateNotSet);
        }
        for x in data.iter_mut() {
            let v = *x * *x;
            self.inner.sample_count += 1.0;

            if self.inner.sample_count <= self.inner.init_length {
                let n = self.inner.sample_count;
                self.inner.sta += (v - self.inner.sta) / n.min(self.inner.num_sta);
                self.inner.lta += (v - self.inner.lta) / n;
                *x = 1.0;
                continue;
            }

            self.inner.sta += (v - self.inner.sta) / self.inner.num_sta;
            let lta_update = (v - self.inner.lta) / self.inner.num_lta;
            if self.triggered {
                self.inner.lta += self.bleed * lta_update;
            } else {
                self.inner.lta += lta_update;
            }

            let ratio = if self.inner.lta > 0.0 {
                self.inner.sta / self.inner.lta
            } else {
                1.0
            };

            if self.triggered {
                if ratio < self.event_off {
                    self.triggered = false;
                }
            } else if ratio > self.event_on {
                self.triggered = true;
            }

            *x = ratio;
        }
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        match params.len() {
            4 | 5 => {}
            _ => return ParamCode::WrongCount { expected: 4 },
        }
        match self.inner.set_parameters(&params[..2]) {
            ParamCode::Accepted(_) => {}
            other => return other,
        }
        if params[2] <= params[3] {
            return ParamCode::BadValue { index: 2 };
        }
        self.event_on = params[2];
        self.event_off = params[3];
        if params.len() == 5 {
            if !(0.0..=1.0).contains(&params[4]) {
                return ParamCode::BadValue { index: 4 };
            }
            self.bleed = params[4];
        }
        ParamCode::Accepted(params.len())
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.triggered = false;
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        let mut f = StaLta2::new(
            self.inner.len_sta,
            self.inner.len_lta,
            self.event_on,
            self.event_off,
        );
        f.bleed = self.bleed;
        if let Some(rate) = self.inner.rate {
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
    fn test_constant_signal_converges_to_one() {
        let mut f = StaLta::new(1.0, 10.0);
        f.set_sampling_rate(20.0).unwrap();
        let mut data = vec![2.0; 600];
        f.apply(&mut data).unwrap();
        assert!((data[599] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_onset_raises_ratio() {
        let mut f = StaLta::new(0.5, 20.0);
        f.set_sampling_rate(20.0).unwrap();
        // Long quiet noise floor, then a strong onset
        let mut data = vec![0.1; 600];
        data.extend(vec![5.0; 40]);
        f.apply(&mut data).unwrap();
        let peak = data[600..].iter().copied().fold(f64::MIN, f64::max);
        assert!(peak > 10.0, "trigger ratio only reached {peak}");
    }

    #[test]
    fn test_stalta2_freezes_lta_during_event() {
        let mut plain = StaLta::new(0.5, 10.0);
        let mut gated = StaLta2::new(0.5, 10.0, 3.0, 1.0);
        plain.set_sampling_rate(20.0).unwrap();
        gated.set_sampling_rate(20.0).unwrap();

        let mut signal = vec![0.1; 400];
        signal.extend(vec![5.0; 400]);

        let mut a = signal.clone();
        let mut b = signal;
        plain.apply(&mut a).unwrap();
        gated.apply(&mut b).unwrap();

        // With the LTA frozen the gated ratio stays high much longer.
        assert!(b[780] > a[780]);
        assert!(b[780] > 3.0);
    }

    #[test]
    fn test_param_codes() {
        let mut f = StaLta::new(2.0, 50.0);
        assert_eq!(f.set_parameters(&[1.0]), ParamCode::WrongCount { expected: 2 });
        assert_eq!(f.set_parameters(&[60.0, 1.0]), ParamCode::BadValue { index: 1 });
        assert_eq!(f.set_parameters(&[1.0, 60.0]), ParamCode::Accepted(2));
        assert_eq!(f.lengths(), (1.0, 60.0));
    }
}
