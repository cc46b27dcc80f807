//! Buffered time-window processor
//!
//! Collects the processed chunks of a [`WaveformProcessor`] into one
//! contiguous buffer spanning the requested analysis window plus a safety
//! margin (60 s by default) for filter warm-up. Completion fires once the
//! buffer covers the analysis window; data arriving long after the window
//! end with the buffer still short terminates with `IncompleteData`.

use sf_core::{Record, Time, TimeSpan, TimeWindow};

use crate::{Status, TerminationCause, WaveformConfig, WaveformProcessor};

const DEFAULT_MARGIN_SECONDS: f64 = 60.0;

#[derive(Debug)]
pub struct TimeWindowProcessor {
    base: WaveformProcessor,
    time_window: TimeWindow,
    margin: TimeSpan,
    /// Data arriving this much past the window end without completion
    /// counts as missed.
    inactivity_timeout: TimeSpan,
    data: Vec<f64>,
    data_start: Option<Time>,
    completed: bool,
}

impl TimeWindowProcessor {
    pub fn new(config: WaveformConfig) -> Self {
        Self {
            base: WaveformProcessor::new(config),
            time_window: TimeWindow::default(),
            margin: TimeSpan::from_seconds(DEFAULT_MARGIN_SECONDS),
            inactivity_timeout: TimeSpan::from_seconds(60.0),
            data: Vec::new(),
            data_start: None,
            completed: false,
        }
    }

    pub fn base(&self) -> &WaveformProcessor {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut WaveformProcessor {
        &mut self.base
    }

    pub fn status(&self) -> Status {
        self.base.status()
    }

    /// The analysis window the derived processor asked for.
    pub fn set_time_window(&mut self, tw: TimeWindow) {
        self.time_window = tw;
        self.data.clear();
        self.data_start = None;
        self.completed = false;
    }

    pub fn time_window(&self) -> TimeWindow {
        self.time_window
    }

    /// Safety margin added on both sides of the analysis window.
    pub fn set_margin(&mut self, margin: TimeSpan) {
        self.margin = margin;
    }

    pub fn margin(&self) -> TimeSpan {
        self.margin
    }

    pub fn set_inactivity_timeout(&mut self, timeout: TimeSpan) {
        self.inactivity_timeout = timeout;
    }

    /// Analysis window widened by the margin.
    pub fn safety_time_window(&self) -> TimeWindow {
        TimeWindow::new(
            self.time_window.start() - self.margin,
            self.time_window.end() + self.margin,
        )
    }

    /// True once the buffer covers the whole analysis window.
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// The buffered contiguous samples.
    pub fn continuous_data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_start_time(&self) -> Option<Time> {
        self.data_start
    }

    /// Buffer index of a point in time, clamped into the buffer.
    pub fn index_of(&self, t: Time) -> usize {
        let (Some(start), Some(rate)) = (self.data_start, self.base.sampling_rate()) else {
            return 0;
        };
        let idx = ((t - start).seconds() * rate).round();
        idx.clamp(0.0, self.data.len().saturating_sub(1) as f64) as usize
    }

    pub fn time_at(&self, index: usize) -> Option<Time> {
        let (Some(start), Some(rate)) = (self.data_start, self.base.sampling_rate()) else {
            return None;
        };
        Some(start + TimeSpan::from_seconds(index as f64 / rate))
    }

    pub fn reset(&mut self) {
        self.base.reset();
        self.data.clear();
        self.data_start = None;
        self.completed = false;
    }

    pub fn close(&mut self) {
        self.base.close();
        self.data.clear();
        self.data_start = None;
    }

    /// Feed a record; true when this record completed the analysis window.
    pub fn feed(&mut self, record: &Record) -> bool {
        if self.completed || !self.status().is_active() {
            return false;
        }
        if !self.time_window.is_set() {
            return false;
        }

        let Some(chunk) = self.base.feed(record) else {
            return false;
        };
        let rate = chunk.sampling_rate;
        let safety = self.safety_time_window();

        if chunk.after_gap {
            // The buffer must stay contiguous; data before the gap cannot
            // be used together with what follows.
            self.data.clear();
            self.data_start = None;
        }

        let chunk_end =
            chunk.start_time + TimeSpan::from_samples(chunk.samples.len(), rate);
        if chunk_end <= safety.start() {
            return false;
        }

        // Clip the chunk to the safety window front
        let mut samples = chunk.samples;
        let mut start_time = chunk.start_time;
        if start_time < safety.start() {
            let skip = ((safety.start() - start_time).seconds() * rate).floor() as usize;
            let skip = skip.min(samples.len());
            samples.drain(..skip);
            start_time = start_time + TimeSpan::from_samples(skip, rate);
        }

        match self.data_start {
            None => {
                self.data_start = Some(start_time);
                self.data = samples;
            }
            Some(_) => {
                self.data.extend(samples);
            }
        }

        let data_end = match self.data_start {
            Some(start) => start + TimeSpan::from_samples(self.data.len(), rate),
            None => return false,
        };

        // Completion: buffer covers the analysis window
        if self
            .data_start
            .is_some_and(|s| s <= self.time_window.start())
            && data_end >= self.time_window.end()
        {
            self.completed = true;
            return true;
        }

        // Data far past the window end with the buffer still short
        if record.start_time() > self.time_window.end() + self.inactivity_timeout {
            self.base.terminate(TerminationCause::IncompleteData);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::StreamId;

    fn record(start_sec: f64, seconds: f64) -> Record {
        let n = (seconds * 20.0) as usize;
        Record::new(
            StreamId::new("XX", "STA", "", "BHZ"),
            Time::from_epoch_micros((start_sec * 1e6) as i64),
            20.0,
            vec![1.0; n],
        )
        .unwrap()
    }

    fn processor(window_start: f64, window_len: f64, margin: f64) -> TimeWindowProcessor {
        let mut twp = TimeWindowProcessor::new(WaveformConfig::default());
        twp.set_margin(TimeSpan::from_seconds(margin));
        twp.set_time_window(TimeWindow::from_start_and_length(
            Time::from_epoch_micros((window_start * 1e6) as i64),
            TimeSpan::from_seconds(window_len),
        ));
        twp
    }

    #[test]
    fn test_completion_fires_once_covered() {
        let mut twp = processor(10.0, 5.0, 2.0);
        assert!(!twp.feed(&record(8.0, 4.0)));
        assert!(!twp.is_complete());
        // This record crosses the window end at t=15
        assert!(twp.feed(&record(12.0, 4.0)));
        assert!(twp.is_complete());
        assert!(twp.continuous_data().len() >= 7 * 20);
    }

    #[test]
    fn test_data_before_safety_window_is_clipped() {
        let mut twp = processor(100.0, 5.0, 2.0);
        twp.feed(&record(90.0, 20.0));
        let start = twp.data_start_time().unwrap();
        assert!(start >= Time::from_epoch_micros(97_900_000));
    }

    #[test]
    fn test_index_of_window_bounds() {
        let mut twp = processor(10.0, 5.0, 2.0);
        twp.feed(&record(8.0, 10.0));
        let w = twp.time_window();
        let i0 = twp.index_of(w.start());
        let i1 = twp.index_of(w.end());
        assert_eq!(i1 - i0, 100); // 5 s at 20 Hz
        assert_eq!(twp.time_at(i0).unwrap(), w.start());
    }

    #[test]
    fn test_late_data_terminates_incomplete() {
        let mut twp = processor(10.0, 5.0, 2.0);
        twp.set_inactivity_timeout(TimeSpan::from_seconds(30.0));
        // Buffer never covers the window start; data arrives way past end
        twp.feed(&record(12.0, 2.0));
        twp.feed(&record(80.0, 2.0));
        assert_eq!(
            twp.status(),
            Status::Terminated(TerminationCause::IncompleteData)
        );
    }
}
