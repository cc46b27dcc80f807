//! Record-level filtering
//!
//! Adapters that consume whole records and emit derived records: applying a
//! sample filter to a stream, and demultiplexing one filter template across
//! many streams by cloning it per stream id on first sight.

use std::collections::HashMap;
use std::sync::Arc;

use sf_core::{Record, StreamId, TimeSpan};
use sf_filter::Filter;

use crate::IoResult;

/// A stateful record-to-record transformation.
pub trait RecordFilter: Send {
    /// Feed one record; may emit a derived record.
    fn feed(&mut self, record: &Arc<Record>) -> IoResult<Option<Record>>;

    /// Emit whatever is still buffered.
    fn flush(&mut self) -> Option<Record>;

    /// Configuration clone with fresh state.
    fn clone_fresh(&self) -> Box<dyn RecordFilter>;
}

/// Applies an in-place sample filter to the records of one stream.
///
/// Output records carry float64 samples. The filter state is flushed on
/// time-window gaps and whenever the sampling rate changes.
pub struct FilterRecordFilter {
    template: Box<dyn Filter>,
    active: Option<Box<dyn Filter>>,
    last_end: Option<(f64, sf_core::Time)>,
}

impl FilterRecordFilter {
    pub fn new(template: Box<dyn Filter>) -> Self {
        Self {
            template,
            active: None,
            last_end: None,
        }
    }

    fn continuous(&self, record: &Record) -> bool {
        match self.last_end {
            Some((rate, end)) => {
                rate == record.sampling_rate()
                    && (record.start_time() - end).abs()
                        <= TimeSpan::from_seconds(0.5 / record.sampling_rate())
            }
            None => false,
        }
    }
}

impl RecordFilter for FilterRecordFilter {
    fn feed(&mut self, record: &Arc<Record>) -> IoResult<Option<Record>> {
        if !self.continuous(record) {
            if self.active.is_some() {
                log::debug!(
                    "{}: discontinuity at {}, restarting filter",
                    record.stream_id(),
                    record.start_time()
                );
            }
            let mut fresh = self.template.clone_fresh();
            fresh
                .set_sampling_rate(record.sampling_rate())
                .map_err(|e| crate::IoError::SourceUnavailable(e.to_string()))?;
            self.active = Some(fresh);
        }

        let filter = self.active.as_mut().expect("installed above");
        filter.set_stream_id(record.stream_id());
        filter.set_start_time(record.start_time());

        let mut samples = record.data().to_f64_vec();
        filter
            .apply(&mut samples)
            .map_err(|e| crate::IoError::SourceUnavailable(e.to_string()))?;

        self.last_end = Some((record.sampling_rate(), record.end_time()));

        let mut out = Record::new(
            record.stream_id().clone(),
            record.start_time(),
            record.sampling_rate(),
            samples,
        )?;
        if let Some(q) = record.timing_quality() {
            out = out.with_timing_quality(q)?;
        }
        Ok(Some(out))
    }

    fn flush(&mut self) -> Option<Record> {
        None
    }

    fn clone_fresh(&self) -> Box<dyn RecordFilter> {
        Box::new(FilterRecordFilter::new(self.template.clone_fresh()))
    }
}

/// Clones a record-filter template per distinct stream id and dispatches.
pub struct RecordDemux {
    template: Box<dyn RecordFilter>,
    streams: HashMap<StreamId, Box<dyn RecordFilter>>,
}

impl RecordDemux {
    pub fn new(template: Box<dyn RecordFilter>) -> Self {
        Self {
            template,
            streams: HashMap::new(),
        }
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn reset(&mut self) {
        self.streams.clear();
    }
}

impl RecordFilter for RecordDemux {
    fn feed(&mut self, record: &Arc<Record>) -> IoResult<Option<Record>> {
        let slot = self
            .streams
            .entry(record.stream_id().clone())
            .or_insert_with(|| self.template.clone_fresh());
        slot.feed(record)
    }

    fn flush(&mut self) -> Option<Record> {
        while !self.streams.is_empty() {
            let key = self.streams.keys().next().expect("non-empty").clone();
            let mut slot = self.streams.remove(&key).expect("present");
            if let Some(rec) = slot.flush() {
                self.streams.insert(key, slot);
                return Some(rec);
            }
        }
        None
    }

    fn clone_fresh(&self) -> Box<dyn RecordFilter> {
        Box::new(RecordDemux::new(self.template.clone_fresh()))
    }
}
