//! Record sequences
//!
//! Ordered per-stream collections of shared records. Two bounded flavors
//! exist: [`RingBuffer`] evicts from the front by record count or total
//! duration, [`TimeWindowBuffer`] evicts everything before a monotonically
//! advancing horizon. Both enforce strict time order on feed.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::{Record, Sample, Time, TimeSpan, TimeWindow};

/// Ordered list of records for one stream.
///
/// Records must arrive in time order. A new record overlapping the previous
/// one by more than half a sample period is rejected unless overlap
/// tolerance has been enabled.
#[derive(Debug, Default, Clone)]
pub struct RecordSequence {
    records: VecDeque<Arc<Record>>,
    tolerate_overlaps: bool,
}

impl RecordSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept records that overlap the tail of the sequence.
    pub fn set_tolerate_overlaps(&mut self, tolerate: bool) {
        self.tolerate_overlaps = tolerate;
    }

    /// Append a record, enforcing time order. Returns false on rejection.
    pub fn feed(&mut self, rec: Arc<Record>) -> bool {
        if let Some(last) = self.records.back() {
            let jitter = TimeSpan::from_seconds(0.5 / rec.sampling_rate());
            if rec.start_time() + jitter < last.end_time() && !self.tolerate_overlaps {
                log::debug!(
                    "{}: rejecting out-of-order record at {}",
                    rec.stream_id(),
                    rec.start_time()
                );
                return false;
            }
        }
        self.records.push_back(rec);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn front(&self) -> Option<&Arc<Record>> {
        self.records.front()
    }

    pub fn back(&self) -> Option<&Arc<Record>> {
        self.records.back()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Record>> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.records.iter()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn pop_front(&mut self) -> Option<Arc<Record>> {
        self.records.pop_front()
    }

    /// The merged time window of all contained records.
    pub fn time_window(&self) -> TimeWindow {
        match (self.records.front(), self.records.back()) {
            (Some(first), Some(last)) => TimeWindow::new(first.start_time(), last.end_time()),
            _ => TimeWindow::default(),
        }
    }

    /// Total number of buffered samples.
    pub fn sample_count(&self) -> usize {
        self.records.iter().map(|r| r.sample_count()).sum()
    }

    /// Builds one record spanning the longest gap-free run of records,
    /// converting samples to `T`.
    ///
    /// Records count as contiguous when the start of the next lies within
    /// half a sample period of the end of the previous and the sampling
    /// rates match.
    pub fn contiguous_record<T: Sample>(&self) -> Option<Record> {
        if self.records.is_empty() {
            return None;
        }

        // Locate the longest contiguous run by sample count.
        let mut best: Option<(usize, usize, usize)> = None; // (start, end, samples)
        let mut run_start = 0;
        let mut run_samples = self.records[0].sample_count();

        for i in 1..self.records.len() {
            let prev = &self.records[i - 1];
            let cur = &self.records[i];
            let jitter = TimeSpan::from_seconds(0.5 / prev.sampling_rate());
            let contiguous = cur.sampling_rate() == prev.sampling_rate()
                && (cur.start_time() - prev.end_time()).abs() <= jitter;

            if contiguous {
                run_samples += cur.sample_count();
            } else {
                if best.map_or(true, |(_, _, n)| run_samples > n) {
                    best = Some((run_start, i, run_samples));
                }
                run_start = i;
                run_samples = cur.sample_count();
            }
        }
        if best.map_or(true, |(_, _, n)| run_samples > n) {
            best = Some((run_start, self.records.len(), run_samples));
        }

        let (start, end, total) = best?;
        let first = &self.records[start];
        let mut samples: Vec<T> = Vec::with_capacity(total);
        for rec in self.records.iter().skip(start).take(end - start) {
            samples.extend(rec.data().convert::<T>());
        }

        let mut rec = Record::new(
            first.stream_id().clone(),
            first.start_time(),
            first.sampling_rate(),
            T::wrap(samples),
        )
        .ok()?;
        if let Some(q) = first.timing_quality() {
            rec = rec.with_timing_quality(q).ok()?;
        }
        Some(rec)
    }
}

/// A record sequence bounded by record count and/or buffered duration.
///
/// A bound of zero means unbounded.
#[derive(Debug, Default, Clone)]
pub struct RingBuffer {
    seq: RecordSequence,
    max_records: usize,
    max_span: Option<TimeSpan>,
}

impl RingBuffer {
    /// Bound by record count; `0` keeps everything.
    pub fn new(max_records: usize) -> Self {
        Self {
            seq: RecordSequence::new(),
            max_records,
            max_span: None,
        }
    }

    /// Bound by total buffered duration measured from the back.
    pub fn with_span(max_span: TimeSpan) -> Self {
        Self {
            seq: RecordSequence::new(),
            max_records: 0,
            max_span: Some(max_span),
        }
    }

    pub fn feed(&mut self, rec: Arc<Record>) -> bool {
        if !self.seq.feed(rec) {
            return false;
        }
        if self.max_records > 0 {
            while self.seq.len() > self.max_records {
                self.seq.pop_front();
            }
        }
        if let Some(span) = self.max_span {
            let horizon = self.seq.time_window().end() - span;
            while self
                .seq
                .front()
                .is_some_and(|front| front.end_time() <= horizon)
            {
                self.seq.pop_front();
            }
        }
        true
    }

    pub fn sequence(&self) -> &RecordSequence {
        &self.seq
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn front(&self) -> Option<&Arc<Record>> {
        self.seq.front()
    }

    pub fn back(&self) -> Option<&Arc<Record>> {
        self.seq.back()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Record>> {
        self.seq.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.seq.iter()
    }

    pub fn time_window(&self) -> TimeWindow {
        self.seq.time_window()
    }

    pub fn contiguous_record<T: Sample>(&self) -> Option<Record> {
        self.seq.contiguous_record::<T>()
    }

    pub fn clear(&mut self) {
        self.seq.clear();
    }
}

/// A record sequence that discards everything before an advancing horizon.
#[derive(Debug, Default, Clone)]
pub struct TimeWindowBuffer {
    seq: RecordSequence,
    horizon: Option<Time>,
}

impl TimeWindowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the eviction horizon forward and drop records that end at or
    /// before it. Moving backwards is a no-op.
    pub fn advance(&mut self, horizon: Time) {
        if self.horizon.is_some_and(|h| horizon <= h) {
            return;
        }
        self.horizon = Some(horizon);
        while self
            .seq
            .front()
            .is_some_and(|front| front.end_time() <= horizon)
        {
            self.seq.pop_front();
        }
    }

    pub fn feed(&mut self, rec: Arc<Record>) -> bool {
        if let Some(h) = self.horizon {
            if rec.end_time() <= h {
                return false;
            }
        }
        self.seq.feed(rec)
    }

    pub fn sequence(&self) -> &RecordSequence {
        &self.seq
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn time_window(&self) -> TimeWindow {
        self.seq.time_window()
    }

    pub fn contiguous_record<T: Sample>(&self) -> Option<Record> {
        self.seq.contiguous_record::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StreamId;

    fn rec(start_sec: f64, n: usize, rate: f64) -> Arc<Record> {
        let samples: Vec<f64> = (0..n).map(|i| i as f64).collect();
        Record::new(
            StreamId::new("XX", "ABCD", "", "BHZ"),
            Time::from_epoch_micros((start_sec * 1e6) as i64),
            rate,
            samples,
        )
        .unwrap()
        .into_shared()
    }

    #[test]
    fn test_feed_ordering() {
        let mut seq = RecordSequence::new();
        assert!(seq.feed(rec(0.0, 20, 20.0)));
        assert!(seq.feed(rec(1.0, 20, 20.0)));
        // Overlapping by half a record
        assert!(!seq.feed(rec(1.5, 20, 20.0)));
        assert_eq!(seq.len(), 2);

        seq.set_tolerate_overlaps(true);
        assert!(seq.feed(rec(1.5, 20, 20.0)));
    }

    #[test]
    fn test_ring_buffer_count_eviction() {
        let mut buf = RingBuffer::new(2);
        buf.feed(rec(0.0, 20, 20.0));
        buf.feed(rec(1.0, 20, 20.0));
        buf.feed(rec(2.0, 20, 20.0));
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.front().unwrap().start_time().epoch_seconds(), 1.0);
    }

    #[test]
    fn test_ring_buffer_span_eviction() {
        let mut buf = RingBuffer::with_span(TimeSpan::from_seconds(2.0));
        buf.feed(rec(0.0, 20, 20.0));
        buf.feed(rec(1.0, 20, 20.0));
        buf.feed(rec(2.0, 20, 20.0));
        buf.feed(rec(3.0, 20, 20.0));
        // Only the last two seconds survive
        assert!(buf.time_window().length().seconds() <= 2.0 + 1e-9);
    }

    #[test]
    fn test_contiguous_record_spans_gap_free_run() {
        let mut seq = RecordSequence::new();
        seq.feed(rec(0.0, 20, 20.0));
        seq.feed(rec(1.0, 20, 20.0));
        // 10 s gap, then a single record
        seq.feed(rec(12.0, 20, 20.0));

        let crec = seq.contiguous_record::<f64>().unwrap();
        assert_eq!(crec.sample_count(), 40);
        assert_eq!(crec.start_time().epoch_seconds(), 0.0);
    }

    #[test]
    fn test_contiguous_record_converts_type() {
        let mut seq = RecordSequence::new();
        seq.feed(rec(0.0, 10, 20.0));
        let crec = seq.contiguous_record::<i32>().unwrap();
        assert_eq!(crec.sample_type(), crate::SampleType::Int32);
        assert_eq!(crec.data().get(9), 9.0);
    }

    #[test]
    fn test_time_window_buffer_horizon() {
        let mut buf = TimeWindowBuffer::new();
        buf.feed(rec(0.0, 20, 20.0));
        buf.feed(rec(1.0, 20, 20.0));
        buf.advance(Time::from_epoch_micros(1_000_000));
        assert_eq!(buf.len(), 1);
        // Records fully before the horizon are refused
        assert!(!buf.feed(rec(0.0, 10, 20.0)));
    }
}
