//! Initial cosine taper
//!
//! Ramps the output from an offset up to unity with a cos^2 shape across the
//! configured span after every reset, then passes samples through untouched.
//! Used to suppress the switch-on transient of recursive filters further
//! down a chain.

use std::any::Any;

use crate::{Filter, FilterError, FilterResult, ParamCode};

#[derive(Debug, Clone)]
pub struct InitialTaper {
    time_span: f64,
    offset: f64,
    rate: Option<f64>,
    taper_length: usize,
    sample_index: usize,
}

impl InitialTaper {
    pub fn new(time_span: f64, offset: f64) -> Self {
        Self {
            time_span,
            offset,
            rate: None,
            taper_length: 0,
            sample_index: 0,
        }
    }

    pub fn time_span(&self) -> f64 {
        self.time_span
    }
}

impl Filter for InitialTaper {
    fn name(&self) -> &'static str {
        "ITAPER"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if !(rate > 0.0) {
            return Err(FilterError::InvalidSamplingRate(rate));
        }
        self.taper_length = (self.time_span * rate) as usize;
        self.rate = Some(rate);
        self.reset();
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        if self.rate.is_none() {
            return Err(FilterError::SamplingRateNotSet);
        }
        for x in data.iter_mut() {
            if self.sample_index >= self.taper_length {
                // Past the ramp, nothing left to do for this block.
                break;
            }
            let phase = self.sample_index as f64 / self.taper_length as f64;
            let scale = self.offset
                + (1.0 - self.offset) * 0.5 * (1.0 - (std::f64::consts::PI * phase).cos());
            *x *= scale;
            self.sample_index += 1;
        }
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        match params.len() {
            1 | 2 => {}
            _ => return ParamCode::WrongCount { expected: 1 },
        }
        if params[0] <= 0.0 {
            return ParamCode::BadValue { index: 0 };
        }
        self.time_span = params[0];
        if params.len() == 2 {
            if !(0.0..=1.0).contains(&params[1]) {
                return ParamCode::BadValue { index: 1 };
            }
            self.offset = params[1];
        }
        if let Some(rate) = self.rate {
            self.taper_length = (self.time_span * rate) as usize;
        }
        ParamCode::Accepted(params.len())
    }

    fn reset(&mut self) {
        self.sample_index = 0;
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        let mut f = InitialTaper::new(self.time_span, self.offset);
        if let Some(rate) = self.rate {
            let _ = f.set_sampling_rate(rate);
        }
        Box::new(f)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
