//! Sample-to-sample jump limiter
//!
//! Rejects samples whose step from the previous sample exceeds a threshold
//! by interpolating the midpoint and replaying it. Keeps a two-sample
//! history.

use std::any::Any;

use crate::{Filter, FilterError, FilterResult, ParamCode};

#[derive(Debug, Clone)]
pub struct CutOff {
    threshold: f64,
    samples: [f64; 2],
    outstanding: u8,
}

impl CutOff {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            samples: [0.0; 2],
            outstanding: 2,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Filter for CutOff {
    fn name(&self) -> &'static str {
        "CUTOFF"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if !(rate > 0.0) {
            return Err(FilterError::InvalidSamplingRate(rate));
        }
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        if self.threshold <= 0.0 {
            return Err(FilterError::InvalidParameter(
                "cutoff threshold not initialized".into(),
            ));
        }

        for x in data.iter_mut() {
            if self.outstanding == 2 {
                self.samples = [*x, *x];
                self.outstanding -= 1;
                continue;
            } else if self.outstanding == 1 {
                self.samples[1] = *x;
                self.outstanding -= 1;
            }

            let s = *x;

            if (self.samples[0] - self.samples[1]).abs() > self.threshold {
                *x = (self.samples[0] + *x) / 2.0;
                self.samples[1] = *x;
            } else {
                *x = self.samples[1];
            }

            self.samples[0] = self.samples[1];
            self.samples[1] = s;
        }
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        if params.len() != 1 {
            return ParamCode::WrongCount { expected: 1 };
        }
        if params[0] <= 0.0 {
            return ParamCode::BadValue { index: 0 };
        }
        self.threshold = params[0];
        ParamCode::Accepted(1)
    }

    fn reset(&mut self) {
        self.samples = [0.0; 2];
        self.outstanding = 2;
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        Box::new(CutOff::new(self.threshold))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
