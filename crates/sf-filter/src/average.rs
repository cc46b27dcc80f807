//! Sliding-window mean and running-mean highpass

use std::any::Any;

use crate::{Filter, FilterError, FilterResult, ParamCode};

/// Sliding-window mean over the prior `time_span` seconds.
///
/// The first sample primes the whole window so the output starts at the
/// input value instead of ramping from zero.
#[derive(Debug, Clone)]
pub struct Average {
    time_span: f64,
    rate: Option<f64>,
    buffer: Vec<f64>,
    index: usize,
    first_sample: bool,
    last_sum: f64,
    oo_count: f64,
}

impl Average {
    pub fn new(time_span: f64) -> Self {
        Self {
            time_span,
            rate: None,
            buffer: Vec::new(),
            index: 0,
            first_sample: true,
            last_sum: 0.0,
            oo_count: 0.0,
        }
    }

    pub fn time_span(&self) -> f64 {
        self.time_span
    }
}

impl Filter for Average {
    fn name(&self) -> &'static str {
        "AVG"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if self.rate == Some(rate) {
            return Ok(());
        }
        if !(rate > 0.0) {
            return Err(FilterError::InvalidSamplingRate(rate));
        }
        let count = ((rate * self.time_span) as usize).max(1);
        self.buffer = vec![0.0; count];
        self.oo_count = 1.0 / count as f64;
        self.rate = Some(rate);
        self.reset();
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        if self.rate.is_none() {
            return Err(FilterError::SamplingRateNotSet);
        }
        if self.first_sample && !data.is_empty() {
            self.buffer.fill(data[0]);
            self.last_sum = data[0] * self.buffer.len() as f64;
            self.first_sample = false;
        }

        for x in data.iter_mut() {
            let last_value = *x;
            let first_value = self.buffer[self.index];
            self.buffer[self.index] = last_value;

            self.index += 1;
            if self.index >= self.buffer.len() {
                self.index = 0;
            }

            self.last_sum = self.last_sum + last_value - first_value;
            *x = self.last_sum * self.oo_count;
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
        self.time_span = params[0];
        ParamCode::Accepted(1)
    }

    fn reset(&mut self) {
        self.first_sample = true;
        self.last_sum = 0.0;
        self.index = 0;
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        let mut f = Average::new(self.time_span);
        if let Some(rate) = self.rate {
            let _ = f.set_sampling_rate(rate);
        }
        Box::new(f)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Running-mean highpass: `y = x - mean(x)`.
///
/// The mean grows cumulatively until `time_span` seconds have been seen,
/// then decays recursively with that time constant.
#[derive(Debug, Clone)]
pub struct RunningMeanHighpass {
    time_span: f64,
    rate: Option<f64>,
    window: f64,
    seen: f64,
    mean: f64,
}

impl RunningMeanHighpass {
    pub fn new(time_span: f64) -> Self {
        Self {
            time_span,
            rate: None,
            window: 0.0,
            seen: 0.0,
            mean: 0.0,
        }
    }
}

impl Filter for RunningMeanHighpass {
    fn name(&self) -> &'static str {
        "RMHP"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if !(rate > 0.0) {
            return Err(FilterError::InvalidSamplingRate(rate));
        }
        self.window = (rate * self.time_span).max(1.0);
        self.rate = Some(rate);
        self.reset();
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        if self.rate.is_none() {
            return Err(FilterError::SamplingRateNotSet);
        }
        for x in data.iter_mut() {
            if self.seen < self.window {
                self.seen += 1.0;
            }
            self.mean += (*x - self.mean) / self.seen;
            *x -= self.mean;
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
        self.time_span = params[0];
        if let Some(rate) = self.rate {
            self.window = (rate * self.time_span).max(1.0);
        }
        ParamCode::Accepted(1)
    }

    fn reset(&mut self) {
        self.seen = 0.0;
        self.mean = 0.0;
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        let mut f = RunningMeanHighpass::new(self.time_span);
        if let Some(rate) = self.rate {
            let _ = f.set_sampling_rate(rate);
        }
        Box::new(f)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
