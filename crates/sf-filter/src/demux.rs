//! Per-stream filter instantiation
//!
//! Wraps a filter template and clones it for every distinct stream id on
//! first sight, then dispatches samples to the clone owned by the current
//! stream. The very first stream reuses the template itself.

use std::any::Any;
use std::collections::HashMap;

use sf_core::{StreamId, Time};

use crate::{Filter, FilterError, FilterResult, ParamCode};

#[derive(Debug)]
pub struct DemuxFilter {
    template: Box<dyn Filter>,
    streams: HashMap<StreamId, Box<dyn Filter>>,
    current: Option<StreamId>,
}

impl DemuxFilter {
    pub fn new(template: Box<dyn Filter>) -> Self {
        Self {
            template,
            streams: HashMap::new(),
            current: None,
        }
    }

    /// Replace the template and drop all per-stream clones.
    pub fn set_template(&mut self, template: Box<dyn Filter>) {
        self.template = template;
        self.streams.clear();
        self.current = None;
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }
}

impl Filter for DemuxFilter {
    fn name(&self) -> &'static str {
        "DEMUX"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        match &self.current {
            Some(id) => self
                .streams
                .get_mut(id)
                .expect("current stream always has a slot")
                .set_sampling_rate(rate),
            None => self.template.set_sampling_rate(rate),
        }
    }

    fn set_stream_id(&mut self, id: &StreamId) {
        if !self.streams.contains_key(id) {
            let filter = self.template.clone_fresh();
            log::debug!("demux: new filter instance for {id}");
            self.streams.insert(id.clone(), filter);
        }
        self.current = Some(id.clone());
    }

    fn set_start_time(&mut self, time: Time) {
        if let Some(id) = &self.current {
            if let Some(f) = self.streams.get_mut(id) {
                f.set_start_time(time);
            }
        }
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        let id = self.current.as_ref().ok_or_else(|| {
            FilterError::InvalidParameter("demux: no stream id announced before apply".into())
        })?;
        self.streams
            .get_mut(id)
            .expect("current stream always has a slot")
            .apply(data)
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        let code = self.template.set_parameters(params);
        if code.is_accepted() {
            self.streams.clear();
            self.current = None;
        }
        code
    }

    fn reset(&mut self) {
        self.streams.clear();
        self.current = None;
        self.template.reset();
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        Box::new(DemuxFilter::new(self.template.clone_fresh()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Average;

    #[test]
    fn test_streams_keep_independent_state() {
        let mut demux = DemuxFilter::new(Box::new(Average::new(1.0)));
        let a = StreamId::new("XX", "AAA", "", "BHZ");
        let b = StreamId::new("XX", "BBB", "", "BHZ");

        demux.set_stream_id(&a);
        demux.set_sampling_rate(10.0).unwrap();
        let mut data_a = [10.0; 5];
        demux.apply(&mut data_a).unwrap();

        demux.set_stream_id(&b);
        demux.set_sampling_rate(10.0).unwrap();
        let mut data_b = [-10.0; 5];
        demux.apply(&mut data_b).unwrap();

        // Stream B never saw stream A's samples
        assert!((data_b[0] + 10.0).abs() < 1e-12);
        assert_eq!(demux.stream_count(), 2);

        // Returning to A continues its window, not B's
        demux.set_stream_id(&a);
        let mut more_a = [10.0; 1];
        demux.apply(&mut more_a).unwrap();
        assert!((more_a[0] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_apply_requires_stream() {
        let mut demux = DemuxFilter::new(Box::new(Average::new(1.0)));
        let mut data = [0.0];
        assert!(demux.apply(&mut data).is_err());
    }
}
