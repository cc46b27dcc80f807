//! Waveform processor state machine
//!
//! Consumes records for one stream and hands contiguous, filtered,
//! gain-corrected sample chunks to the layer above. The machine enforces
//! stream identity, strict time order, gap and saturation gates; once it
//! reaches `Finished` or a `Terminated` cause, further feeds are ignored.

use sf_core::{Record, StreamId, Time, TimeSpan};
use sf_filter::Filter;

use crate::{Status, StreamMeta, TerminationCause};

/// What to do when a gap larger than the configured maximum appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// Flush the filter state and continue after the gap.
    #[default]
    FlushFilter,
    /// Give up on the stream.
    Terminate,
}

#[derive(Debug, Clone)]
pub struct WaveformConfig {
    /// Largest tolerated gap in seconds before the gap policy applies.
    pub maximum_gap: f64,
    pub gap_policy: GapPolicy,
    /// Raw-count magnitude from which a trace counts as clipped.
    pub saturation_threshold: Option<f64>,
    /// Filtered-trace magnitude from which a sample counts as an outlier.
    pub outlier_threshold: Option<f64>,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            maximum_gap: 0.1,
            gap_policy: GapPolicy::default(),
            saturation_threshold: None,
            outlier_threshold: None,
        }
    }
}

/// A contiguous chunk of processed samples handed to the derived layer.
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    pub start_time: Time,
    pub sampling_rate: f64,
    pub samples: Vec<f64>,
    /// True when filter state was flushed before this chunk.
    pub after_gap: bool,
}

#[derive(Debug, Default)]
pub struct WaveformProcessor {
    meta: StreamMeta,
    config: WaveformConfig,
    filter: Option<Box<dyn Filter>>,
    status: StatusCell,
    expected_stream: Option<StreamId>,
    sampling_rate: Option<f64>,
    last_end: Option<Time>,
}

/// Status plus the sticky-once-terminal rule.
#[derive(Debug)]
struct StatusCell(Status);

impl Default for StatusCell {
    fn default() -> Self {
        Self(Status::WaitingForData)
    }
}

impl WaveformProcessor {
    pub fn new(config: WaveformConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn set_stream_meta(&mut self, meta: StreamMeta) {
        self.meta = meta;
    }

    pub fn stream_meta(&self) -> &StreamMeta {
        &self.meta
    }

    /// Pre-filter chain; the filter sees raw counts, gain is removed from
    /// the output afterwards.
    pub fn set_filter(&mut self, filter: Box<dyn Filter>) {
        self.filter = Some(filter);
    }

    /// Pin the accepted stream id. Without it, the first record decides.
    pub fn set_expected_stream(&mut self, id: StreamId) {
        self.expected_stream = Some(id);
    }

    pub fn status(&self) -> Status {
        self.status.0
    }

    pub fn sampling_rate(&self) -> Option<f64> {
        self.sampling_rate
    }

    /// The stream this processor is bound to, once known.
    pub fn stream_id(&self) -> Option<&StreamId> {
        self.expected_stream.as_ref()
    }

    pub fn terminate(&mut self, cause: TerminationCause) {
        if self.status.0.is_active() {
            log::debug!(
                "{}: terminated: {cause:?}",
                self.expected_stream
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            );
            self.status.0 = Status::Terminated(cause);
        }
    }

    pub fn finish(&mut self) {
        if self.status.0.is_active() {
            self.status.0 = Status::Finished;
        }
    }

    /// Closing is idempotent and releases filter state and references.
    pub fn close(&mut self) {
        self.filter = None;
        self.last_end = None;
        if self.status.0.is_active() {
            self.status.0 = Status::Terminated(TerminationCause::Unspecified);
        }
    }

    pub fn reset(&mut self) {
        if let Some(f) = self.filter.as_mut() {
            f.reset();
        }
        self.status = StatusCell::default();
        self.sampling_rate = None;
        self.last_end = None;
    }

    /// Feed one record through the gates. Returns the processed chunk, or
    /// `None` when the record was dropped or the processor stopped.
    pub fn feed(&mut self, record: &Record) -> Option<ProcessedChunk> {
        if !self.status.0.is_active() {
            return None;
        }

        // Gate 1: stream identity
        match &self.expected_stream {
            Some(id) if id != record.stream_id() => return None,
            Some(_) => {}
            None => self.expected_stream = Some(record.stream_id().clone()),
        }

        // Gate 2: constant sampling rate
        let rate = record.sampling_rate();
        match self.sampling_rate {
            None => {
                self.sampling_rate = Some(rate);
                if let Some(f) = self.filter.as_mut() {
                    f.set_stream_id(record.stream_id());
                    if let Err(e) = f.set_sampling_rate(rate) {
                        log::error!("{}: filter setup failed: {e}", record.stream_id());
                        self.terminate(TerminationCause::ProcessorError);
                        return None;
                    }
                }
            }
            Some(expected) if (expected - rate).abs() > 1e-6 => {
                self.terminate(TerminationCause::BadTimeReference);
                return None;
            }
            Some(_) => {}
        }

        let period = TimeSpan::from_seconds(1.0 / rate);
        let mut start_time = record.start_time();
        let mut samples = record.data().to_f64_vec();
        let mut after_gap = false;

        // Gate 3: time order, overlaps and gaps
        if let Some(last_end) = self.last_end {
            let dt = start_time - last_end;
            if dt.is_negative() {
                if dt.abs() <= period {
                    // Sub-sample overlap: trim the duplicated sample
                    let trim = 1.min(samples.len());
                    samples.drain(..trim);
                    start_time = start_time + period;
                    if samples.is_empty() {
                        return None;
                    }
                } else {
                    self.terminate(TerminationCause::BadTimeReference);
                    return None;
                }
            } else if dt.seconds() > self.config.maximum_gap {
                match self.config.gap_policy {
                    GapPolicy::FlushFilter => {
                        log::debug!(
                            "{}: gap of {:.3} s, flushing filter state",
                            record.stream_id(),
                            dt.seconds()
                        );
                        if let Some(f) = self.filter.as_mut() {
                            f.reset();
                        }
                        after_gap = true;
                    }
                    GapPolicy::Terminate => {
                        self.terminate(TerminationCause::IncompleteData);
                        return None;
                    }
                }
            }
        }

        // Gate 4: saturation on raw counts
        if let Some(threshold) = self.config.saturation_threshold {
            if samples.iter().any(|x| x.abs() >= threshold) {
                self.terminate(TerminationCause::DataClipped);
                return None;
            }
        }

        // Filter raw counts
        if let Some(f) = self.filter.as_mut() {
            f.set_start_time(start_time);
            if let Err(e) = f.apply(&mut samples) {
                log::error!("{}: filter failed: {e}", record.stream_id());
                self.terminate(TerminationCause::ProcessorError);
                return None;
            }
        }

        // Gain after filtering
        self.meta.remove_gain(&mut samples);

        // Gate 5: outliers on the corrected trace
        if let Some(threshold) = self.config.outlier_threshold {
            if samples.iter().any(|x| x.abs() >= threshold) {
                self.terminate(TerminationCause::DataOutlier);
                return None;
            }
        }

        self.status.0 = Status::InProgress;
        self.last_end = Some(start_time + TimeSpan::from_samples(samples.len(), rate));

        Some(ProcessedChunk {
            start_time,
            sampling_rate: rate,
            samples,
            after_gap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(start_sec: f64, samples: Vec<f64>) -> Record {
        Record::new(
            StreamId::new("XX", "STA", "", "BHZ"),
            Time::from_epoch_micros((start_sec * 1e6) as i64),
            20.0,
            samples,
        )
        .unwrap()
    }

    #[test]
    fn test_linear_feed() {
        let mut wp = WaveformProcessor::new(WaveformConfig::default());
        assert_eq!(wp.status(), Status::WaitingForData);

        let chunk = wp.feed(&record(0.0, vec![1.0; 20])).expect("chunk");
        assert_eq!(chunk.samples.len(), 20);
        assert_eq!(wp.status(), Status::InProgress);

        let chunk = wp.feed(&record(1.0, vec![2.0; 20])).expect("chunk");
        assert!(!chunk.after_gap);
    }

    #[test]
    fn test_foreign_stream_dropped() {
        let mut wp = WaveformProcessor::new(WaveformConfig::default());
        wp.set_expected_stream(StreamId::new("GE", "MORC", "", "BHZ"));
        assert!(wp.feed(&record(0.0, vec![1.0; 20])).is_none());
        assert_eq!(wp.status(), Status::WaitingForData);
    }

    #[test]
    fn test_big_overlap_terminates() {
        let mut wp = WaveformProcessor::new(WaveformConfig::default());
        wp.feed(&record(0.0, vec![1.0; 20])).unwrap();
        assert!(wp.feed(&record(0.5, vec![1.0; 20])).is_none());
        assert_eq!(
            wp.status(),
            Status::Terminated(TerminationCause::BadTimeReference)
        );
    }

    #[test]
    fn test_gap_flushes_filter() {
        let mut wp = WaveformProcessor::new(WaveformConfig::default());
        wp.set_filter(Box::new(sf_filter::Average::new(1.0)));
        wp.feed(&record(0.0, vec![100.0; 20])).unwrap();
        let chunk = wp.feed(&record(10.0, vec![2.0; 20])).expect("chunk");
        assert!(chunk.after_gap);
        // Flushed window primes on the new level
        assert!((chunk.samples[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_gap_terminate_policy() {
        let config = WaveformConfig {
            gap_policy: GapPolicy::Terminate,
            ..Default::default()
        };
        let mut wp = WaveformProcessor::new(config);
        wp.feed(&record(0.0, vec![1.0; 20])).unwrap();
        assert!(wp.feed(&record(10.0, vec![1.0; 20])).is_none());
        assert_eq!(
            wp.status(),
            Status::Terminated(TerminationCause::IncompleteData)
        );
    }

    #[test]
    fn test_saturation() {
        let config = WaveformConfig {
            saturation_threshold: Some(1000.0),
            ..Default::default()
        };
        let mut wp = WaveformProcessor::new(config);
        let mut samples = vec![1.0; 20];
        samples[7] = 1001.0;
        assert!(wp.feed(&record(0.0, samples)).is_none());
        assert_eq!(wp.status(), Status::Terminated(TerminationCause::DataClipped));

        // Terminal state is sticky
        assert!(wp.feed(&record(1.0, vec![1.0; 20])).is_none());
    }

    #[test]
    fn test_gain_after_filter() {
        let mut wp = WaveformProcessor::new(WaveformConfig::default());
        wp.set_stream_meta(StreamMeta::with_gain(10.0, "m/s"));
        let chunk = wp.feed(&record(0.0, vec![20.0; 20])).expect("chunk");
        assert!((chunk.samples[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_close_idempotent() {
        let mut wp = WaveformProcessor::new(WaveformConfig::default());
        wp.feed(&record(0.0, vec![1.0; 20])).unwrap();
        wp.close();
        wp.close();
        assert!(!wp.status().is_active());
        assert!(wp.feed(&record(1.0, vec![1.0; 20])).is_none());
    }
}
