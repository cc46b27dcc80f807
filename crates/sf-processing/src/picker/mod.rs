//! Phase pickers
//!
//! A picker extends the time-window processor with an onset estimation
//! hook invoked once the analysis window around the trigger is complete.
//! Implementations return the pick as a sample index with uncertainties in
//! samples; the processor converts to absolute time and seconds.

mod bk;

pub use bk::*;

use sf_core::{Record, StreamId, Time, TimeSpan, TimeWindow};
use sf_filter::parse_filter;
use sf_model::Polarity;

use crate::{
    ConfigError, ConfigResult, Status, TerminationCause, TimeWindowProcessor, WaveformConfig,
};

/// Raw pick estimate in buffer coordinates.
#[derive(Debug, Clone, Copy)]
pub struct PickEstimate {
    pub index: usize,
    /// Samples towards earlier times.
    pub lower_uncertainty: f64,
    /// Samples towards later times.
    pub upper_uncertainty: f64,
    pub snr: f64,
    pub polarity: Option<Polarity>,
}

/// The final pick in absolute time.
#[derive(Debug, Clone)]
pub struct PickResult {
    pub stream_id: StreamId,
    pub time: Time,
    /// Seconds towards earlier times, >= 0.
    pub lower_uncertainty: f64,
    /// Seconds towards later times, >= 0.
    pub upper_uncertainty: f64,
    pub snr: f64,
    pub polarity: Option<Polarity>,
    pub filter_id: String,
    pub method_id: String,
}

/// Onset estimation strategy.
pub trait PickAlgorithm: Send {
    fn method_id(&self) -> &'static str;

    /// Estimate a pick between `signal_start` and `signal_end` (buffer
    /// indices); everything before `signal_start` is noise context.
    fn calculate_pick(
        &self,
        data: &[f64],
        signal_start: usize,
        signal_end: usize,
        sampling_rate: f64,
    ) -> Option<PickEstimate>;
}

/// Picker configuration, seconds relative to the trigger.
#[derive(Debug, Clone)]
pub struct PickerConfig {
    /// Mandatory filter expression applied ahead of the detector.
    pub filter: String,
    pub noise_begin: f64,
    pub signal_begin: f64,
    pub signal_end: f64,
    pub min_snr: f64,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            filter: String::new(),
            noise_begin: -40.0,
            signal_begin: -10.0,
            signal_end: 10.0,
            min_snr: 3.0,
        }
    }
}

pub struct Picker {
    processor: TimeWindowProcessor,
    config: PickerConfig,
    algorithm: Box<dyn PickAlgorithm>,
    trigger: Option<Time>,
    result: Option<PickResult>,
}

impl Picker {
    pub fn new(algorithm: Box<dyn PickAlgorithm>, config: PickerConfig) -> ConfigResult<Self> {
        if config.filter.is_empty() {
            return Err(ConfigError::MissingParameter("filter".into()));
        }
        if config.noise_begin > config.signal_begin || config.signal_begin >= config.signal_end {
            return Err(ConfigError::BadParameter {
                name: "signalBegin".into(),
                message: "windows must satisfy noiseBegin <= signalBegin < signalEnd".into(),
            });
        }
        let filter = parse_filter(&config.filter)?;

        let mut processor = TimeWindowProcessor::new(WaveformConfig::default());
        processor.base_mut().set_filter(filter);
        Ok(Self {
            processor,
            config,
            algorithm,
            trigger: None,
            result: None,
        })
    }

    pub fn processor(&self) -> &TimeWindowProcessor {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut TimeWindowProcessor {
        &mut self.processor
    }

    pub fn status(&self) -> Status {
        self.processor.status()
    }

    pub fn result(&self) -> Option<&PickResult> {
        self.result.as_ref()
    }

    /// Anchor the analysis window around the trigger time.
    pub fn set_trigger(&mut self, trigger: Time) {
        self.trigger = Some(trigger);
        self.processor.set_time_window(TimeWindow::new(
            trigger + TimeSpan::from_seconds(self.config.noise_begin),
            trigger + TimeSpan::from_seconds(self.config.signal_end),
        ));
    }

    /// Feed one record; returns the pick when this record completed the
    /// analysis.
    pub fn feed(&mut self, record: &Record) -> Option<&PickResult> {
        self.trigger?;
        if !self.processor.feed(record) {
            return None;
        }
        self.compute();
        self.result.as_ref()
    }

    fn compute(&mut self) {
        let trigger = self.trigger.expect("checked in feed");
        let Some(rate) = self.processor.base().sampling_rate() else {
            self.processor
                .base_mut()
                .terminate(TerminationCause::ProcessorError);
            return;
        };

        let signal_start = self
            .processor
            .index_of(trigger + TimeSpan::from_seconds(self.config.signal_begin));
        let signal_end = self
            .processor
            .index_of(trigger + TimeSpan::from_seconds(self.config.signal_end));
        let data = self.processor.continuous_data();

        let Some(estimate) = self
            .algorithm
            .calculate_pick(data, signal_start, signal_end, rate)
        else {
            self.processor
                .base_mut()
                .terminate(TerminationCause::Unspecified);
            return;
        };

        if estimate.snr < self.config.min_snr {
            log::debug!(
                "pick rejected: snr {:.2} below {:.2}",
                estimate.snr,
                self.config.min_snr
            );
            self.processor.base_mut().terminate(TerminationCause::LowSnr);
            return;
        }

        let time = self
            .processor
            .time_at(estimate.index)
            .expect("index from completed buffer");
        let stream_id = self
            .processor
            .base()
            .stream_id()
            .cloned()
            .unwrap_or_default();
        self.result = Some(PickResult {
            stream_id,
            time,
            lower_uncertainty: (estimate.lower_uncertainty / rate).max(0.0),
            upper_uncertainty: (estimate.upper_uncertainty / rate).max(0.0),
            snr: estimate.snr,
            polarity: estimate.polarity,
            filter_id: self.config.filter.clone(),
            method_id: self.algorithm.method_id().to_string(),
        });
        self.processor.base_mut().finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAlgorithm;

    impl PickAlgorithm for FixedAlgorithm {
        fn method_id(&self) -> &'static str {
            "FIXED"
        }

        fn calculate_pick(
            &self,
            _data: &[f64],
            signal_start: usize,
            _signal_end: usize,
            _rate: f64,
        ) -> Option<PickEstimate> {
            Some(PickEstimate {
                index: signal_start + 5,
                lower_uncertainty: 2.0,
                upper_uncertainty: 1.0,
                snr: 10.0,
                polarity: Some(Polarity::Positive),
            })
        }
    }

    fn feed_noise_and_signal(picker: &mut Picker) -> Option<PickResult> {
        let id = StreamId::new("XX", "STA", "", "BHZ");
        let mut result = None;
        for chunk in 0..30 {
            let start = Time::from_epoch_micros(chunk * 1_000_000);
            let rec = Record::new(id.clone(), start, 20.0, vec![0.5; 20]).unwrap();
            if let Some(r) = picker.feed(&rec) {
                result = Some(r.clone());
            }
        }
        result
    }

    fn config() -> PickerConfig {
        PickerConfig {
            filter: "SELF".into(),
            noise_begin: -5.0,
            signal_begin: -2.0,
            signal_end: 5.0,
            min_snr: 3.0,
        }
    }

    #[test]
    fn test_missing_filter_is_config_error() {
        let bad = PickerConfig {
            filter: String::new(),
            ..config()
        };
        assert!(matches!(
            Picker::new(Box::new(FixedAlgorithm), bad),
            Err(ConfigError::MissingParameter(_))
        ));
    }

    #[test]
    fn test_unknown_filter_is_config_error() {
        let bad = PickerConfig {
            filter: "NOSUCH(1)".into(),
            ..config()
        };
        assert!(matches!(
            Picker::new(Box::new(FixedAlgorithm), bad),
            Err(ConfigError::UnknownFilter(_))
        ));
    }

    #[test]
    fn test_pick_emitted_with_converted_uncertainties() {
        let mut picker = Picker::new(Box::new(FixedAlgorithm), config()).unwrap();
        picker.set_trigger(Time::from_epoch_micros(10_000_000));
        let result = feed_noise_and_signal(&mut picker).expect("pick");
        assert_eq!(picker.status(), Status::Finished);
        // 2 samples at 20 Hz
        assert!((result.lower_uncertainty - 0.1).abs() < 1e-9);
        assert!((result.upper_uncertainty - 0.05).abs() < 1e-9);
        assert_eq!(result.method_id, "FIXED");
        // Pick time within the fed data range
        assert!(result.time >= Time::from_epoch_micros(5_000_000));
        assert!(result.time <= Time::from_epoch_micros(15_000_000));
    }

    struct WeakAlgorithm;

    impl PickAlgorithm for WeakAlgorithm {
        fn method_id(&self) -> &'static str {
            "WEAK"
        }

        fn calculate_pick(
            &self,
            _data: &[f64],
            signal_start: usize,
            _signal_end: usize,
            _rate: f64,
        ) -> Option<PickEstimate> {
            Some(PickEstimate {
                index: signal_start,
                lower_uncertainty: 0.0,
                upper_uncertainty: 0.0,
                snr: 1.0,
                polarity: None,
            })
        }
    }

    #[test]
    fn test_low_snr_terminates() {
        let mut picker = Picker::new(Box::new(WeakAlgorithm), config()).unwrap();
        picker.set_trigger(Time::from_epoch_micros(10_000_000));
        assert!(feed_noise_and_signal(&mut picker).is_none());
        assert_eq!(
            picker.status(),
            Status::Terminated(TerminationCause::LowSnr)
        );
    }
}
