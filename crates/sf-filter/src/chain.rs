//! Filter chains
//!
//! An ordered sequence of filters applied back to back. Sampling rate,
//! start time and stream id propagate to every element.

use std::any::Any;

use sf_core::{StreamId, Time};

use crate::{Filter, FilterResult, ParamCode};

#[derive(Debug, Default)]
pub struct ChainFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl Clone for ChainFilter {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.iter().map(|f| f.clone_fresh()).collect(),
        }
    }
}

impl ChainFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter; the chain takes ownership.
    pub fn add(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Remove and return the filter at `pos`.
    pub fn take(&mut self, pos: usize) -> Option<Box<dyn Filter>> {
        if pos < self.filters.len() {
            Some(self.filters.remove(pos))
        } else {
            None
        }
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn filters(&self) -> &[Box<dyn Filter>] {
        &self.filters
    }
}

impl Filter for ChainFilter {
    fn name(&self) -> &'static str {
        "CHAIN"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        for f in &mut self.filters {
            f.set_sampling_rate(rate)?;
        }
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        for f in &mut self.filters {
            f.apply(data)?;
        }
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        if params.is_empty() {
            ParamCode::Accepted(0)
        } else {
            // Elements are configured individually, not through the chain.
            ParamCode::WrongCount { expected: 0 }
        }
    }

    fn reset(&mut self) {
        for f in &mut self.filters {
            f.reset();
        }
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }

    fn set_start_time(&mut self, time: Time) {
        for f in &mut self.filters {
            f.set_start_time(time);
        }
    }

    fn set_stream_id(&mut self, id: &StreamId) {
        for f in &mut self.filters {
            f.set_stream_id(id);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Identity filter, useful as a placeholder in expressions.
#[derive(Debug, Clone, Default)]
pub struct SelfFilter;

impl Filter for SelfFilter {
    fn name(&self) -> &'static str {
        "SELF"
    }

    fn set_sampling_rate(&mut self, _rate: f64) -> FilterResult<()> {
        Ok(())
    }

    fn apply(&mut self, _data: &mut [f64]) -> FilterResult<()> {
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        if params.is_empty() {
            ParamCode::Accepted(0)
        } else {
            ParamCode::WrongCount { expected: 0 }
        }
    }

    fn reset(&mut self) {}

    fn clone_fresh(&self) -> Box<dyn Filter> {
        Box::new(SelfFilter)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{max_filter, Average};

    #[test]
    fn test_chain_applies_in_order() {
        let mut chain = ChainFilter::new();
        chain.add(Box::new(Average::new(0.5)));
        chain.add(Box::new(max_filter(0.5)));
        chain.set_sampling_rate(10.0).unwrap();

        let mut data = [2.0; 20];
        chain.apply(&mut data).unwrap();
        // Constant input survives mean + max untouched
        for &x in &data {
            assert!((x - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_chain_propagates_rate_errors() {
        let mut chain = ChainFilter::new();
        chain.add(Box::new(crate::Butterworth::lowpass(4, 100.0)));
        // Corner above Nyquist must surface from the chain
        assert!(chain.set_sampling_rate(20.0).is_err());
    }

    #[test]
    fn test_take_returns_ownership() {
        let mut chain = ChainFilter::new();
        chain.add(Box::new(SelfFilter));
        chain.add(Box::new(Average::new(1.0)));
        let taken = chain.take(0).unwrap();
        assert_eq!(taken.name(), "SELF");
        assert_eq!(chain.filter_count(), 1);
        assert!(chain.take(5).is_none());
    }
}
