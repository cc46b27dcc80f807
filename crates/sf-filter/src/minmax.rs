//! Windowed minimum / maximum
//!
//! Each output sample holds the extremum of all samples within the prior
//! time window. The scan is restarted only when the current extremum drops
//! out of the window.

use std::any::Any;

use crate::{Filter, FilterError, FilterResult, ParamCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Min,
    Max,
}

#[derive(Debug, Clone)]
pub struct MinMax {
    kind: Extremum,
    time_span: f64,
    rate: Option<f64>,
    buffer: Vec<f64>,
    index: usize,
    first_sample: bool,
}

/// Windowed minimum over the prior `time_span` seconds.
pub fn min_filter(time_span: f64) -> MinMax {
    MinMax::new(Extremum::Min, time_span)
}

/// Windowed maximum over the prior `time_span` seconds.
pub fn max_filter(time_span: f64) -> MinMax {
    MinMax::new(Extremum::Max, time_span)
}

impl MinMax {
    fn new(kind: Extremum, time_span: f64) -> Self {
        Self {
            kind,
            time_span,
            rate: None,
            buffer: Vec::new(),
            index: 0,
            first_sample: true,
        }
    }

    pub fn time_span(&self) -> f64 {
        self.time_span
    }

    fn extremum(&self) -> f64 {
        match self.kind {
            Extremum::Min => self.buffer.iter().copied().fold(f64::INFINITY, f64::min),
            Extremum::Max => self
                .buffer
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

impl Filter for MinMax {
    fn name(&self) -> &'static str {
        match self.kind {
            Extremum::Min => "MIN",
            Extremum::Max => "MAX",
        }
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
            self.first_sample = false;
        }

        for x in data.iter_mut() {
            self.buffer[self.index] = *x;
            self.index += 1;
            if self.index >= self.buffer.len() {
                self.index = 0;
            }
            *x = self.extremum();
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
        self.index = 0;
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        let mut f = MinMax::new(self.kind, self.time_span);
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
    fn test_max_holds_peak() {
        let mut f = max_filter(0.5);
        f.set_sampling_rate(10.0).unwrap();
        let mut data = vec![0.0, 1.0, 5.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        f.apply(&mut data).unwrap();
        // Peak is held for the window length (5 samples)
        assert_eq!(data[2], 5.0);
        assert_eq!(data[6], 5.0);
        assert!(data[7] < 5.0);
    }

    #[test]
    fn test_min_mirrors_max() {
        let mut f = min_filter(0.5);
        f.set_sampling_rate(10.0).unwrap();
        let mut data = vec![0.0, -1.0, -5.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        f.apply(&mut data).unwrap();
        assert_eq!(data[2], -5.0);
        assert_eq!(data[6], -5.0);
        assert!(data[7] > -5.0);
    }

    #[test]
    fn test_names() {
        assert_eq!(min_filter(1.0).name(), "MIN");
        assert_eq!(max_filter(1.0).name(), "MAX");
    }
}
