//! Amplitude processors
//!
//! Measure a period-aware peak amplitude on a response-corrected,
//! band-limited trace once the analysis window around the trigger is
//! complete. Concrete types declare their expected input unit, the
//! response simulation, an optional pre-filter expression and the
//! measurement rule.

mod ml;
mod two_horizontal;

pub use ml::*;
pub use two_horizontal::*;

use sf_core::{Record, StreamId, Time, TimeSpan, TimeWindow};
use sf_filter::{parse_filter, ChainFilter, GroundMotion, SimulationFilter};
use sf_model::RealQuantity;

use crate::{
    ConfigError, ConfigResult, Status, StreamMeta, TerminationCause, TimeWindowProcessor,
    WaveformConfig,
};

/// Response simulation applied after the pre-filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseSimulation {
    #[default]
    None,
    WoodAnderson,
    FiveSecond,
}

/// How the amplitude is read off the corrected trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasurementRule {
    /// Largest absolute deviation from the noise offset.
    #[default]
    AbsMax,
    /// Half of the maximum peak-to-trough swing.
    HalfPeakToPeak,
    /// Peak of the running integral of the de-offset trace.
    IntegratedEnvelope,
}

#[derive(Debug, Clone)]
pub struct AmplitudeConfig {
    pub amplitude_type: String,
    /// Unit of the measured value as published.
    pub unit: String,
    /// Pre-filter expression, applied before the response simulation.
    pub pre_filter: Option<String>,
    pub response: ResponseSimulation,
    pub measurement: MeasurementRule,
    /// Window bounds in seconds relative to the trigger.
    pub noise_begin: f64,
    pub noise_end: f64,
    pub signal_begin: f64,
    pub signal_end: f64,
    pub min_snr: f64,
    /// Final scale applied to the measured value (e.g. the MLv vertical
    /// correction).
    pub scale: f64,
}

impl Default for AmplitudeConfig {
    fn default() -> Self {
        Self {
            amplitude_type: String::new(),
            unit: String::new(),
            pre_filter: None,
            response: ResponseSimulation::None,
            measurement: MeasurementRule::default(),
            noise_begin: -35.0,
            noise_end: -5.0,
            signal_begin: -5.0,
            signal_end: 30.0,
            min_snr: 3.0,
            scale: 1.0,
        }
    }
}

/// A finished measurement.
#[derive(Debug, Clone)]
pub struct AmplitudeResult {
    pub amplitude_type: String,
    pub stream_id: StreamId,
    /// Time of the measured extremum.
    pub time: Time,
    pub value: RealQuantity,
    pub period: Option<f64>,
    pub snr: f64,
    pub unit: String,
}

pub struct AmplitudeProcessor {
    processor: TimeWindowProcessor,
    config: AmplitudeConfig,
    trigger: Option<Time>,
    result: Option<AmplitudeResult>,
}

fn ground_motion_of(unit: &str) -> ConfigResult<GroundMotion> {
    match crate::unit_conversion(unit).map(|uc| uc.to_unit) {
        Some("m") => Ok(GroundMotion::Displacement),
        Some("m/s") => Ok(GroundMotion::Velocity),
        Some("m/s**2") => Ok(GroundMotion::Acceleration),
        _ => Err(ConfigError::BadParameter {
            name: "gainUnit".into(),
            message: format!("unsupported input unit '{unit}'"),
        }),
    }
}

impl AmplitudeProcessor {
    pub fn new(config: AmplitudeConfig, meta: StreamMeta) -> ConfigResult<Self> {
        if config.noise_begin >= config.noise_end || config.signal_begin >= config.signal_end {
            return Err(ConfigError::BadParameter {
                name: "signalBegin".into(),
                message: "noise and signal windows must be non-empty".into(),
            });
        }

        let mut chain = ChainFilter::new();
        if let Some(expr) = &config.pre_filter {
            chain.add(parse_filter(expr)?);
        }
        let missing_gain = !meta.has_gain();
        match config.response {
            ResponseSimulation::None => {}
            ResponseSimulation::WoodAnderson => {
                let motion = ground_motion_of(&meta.gain_unit).unwrap_or(GroundMotion::Velocity);
                chain.add(Box::new(SimulationFilter::wood_anderson(motion)));
            }
            ResponseSimulation::FiveSecond => {
                let motion = ground_motion_of(&meta.gain_unit).unwrap_or(GroundMotion::Velocity);
                chain.add(Box::new(SimulationFilter::seismometer_5sec(motion)));
            }
        }

        let mut processor = TimeWindowProcessor::new(WaveformConfig::default());
        processor.base_mut().set_stream_meta(meta);
        if chain.filter_count() > 0 {
            processor.base_mut().set_filter(Box::new(chain));
        }
        if missing_gain {
            processor
                .base_mut()
                .terminate(TerminationCause::MissingGain);
        }

        Ok(Self {
            processor,
            config,
            trigger: None,
            result: None,
        })
    }

    pub fn amplitude_type(&self) -> &str {
        &self.config.amplitude_type
    }

    pub fn config(&self) -> &AmplitudeConfig {
        &self.config
    }

    pub fn status(&self) -> Status {
        self.processor.status()
    }

    pub fn result(&self) -> Option<&AmplitudeResult> {
        self.result.as_ref()
    }

    pub fn processor_mut(&mut self) -> &mut TimeWindowProcessor {
        &mut self.processor
    }

    pub fn set_trigger(&mut self, trigger: Time) {
        self.trigger = Some(trigger);
        self.processor.set_time_window(TimeWindow::new(
            trigger + TimeSpan::from_seconds(self.config.noise_begin),
            trigger + TimeSpan::from_seconds(self.config.signal_end),
        ));
    }

    pub fn close(&mut self) {
        self.processor.close();
    }

    /// Feed one record; returns the measurement when this record completed
    /// the analysis window.
    pub fn feed(&mut self, record: &Record) -> Option<&AmplitudeResult> {
        self.trigger?;
        if !self.processor.feed(record) {
            return None;
        }
        self.compute_amplitude();
        self.result.as_ref()
    }

    fn window_indices(&self, begin: f64, end: f64) -> (usize, usize) {
        let trigger = self.trigger.expect("set before feed");
        let i0 = self
            .processor
            .index_of(trigger + TimeSpan::from_seconds(begin));
        let i1 = self
            .processor
            .index_of(trigger + TimeSpan::from_seconds(end));
        (i0, i1.max(i0 + 1))
    }

    fn compute_amplitude(&mut self) {
        let Some(rate) = self.processor.base().sampling_rate() else {
            self.processor
                .base_mut()
                .terminate(TerminationCause::ProcessorError);
            return;
        };

        let (n0, n1) = self.window_indices(self.config.noise_begin, self.config.noise_end);
        let (s0, s1) = self.window_indices(self.config.signal_begin, self.config.signal_end);
        let data = self.processor.continuous_data();

        let noise = &data[n0..n1.min(data.len())];
        let offset = noise.iter().sum::<f64>() / noise.len().max(1) as f64;
        let noise_amp = noise
            .iter()
            .map(|x| (x - offset).abs())
            .fold(0.0f64, f64::max);

        let signal = &data[s0..s1.min(data.len())];
        let Some(measure) = measure(signal, offset, rate, self.config.measurement) else {
            self.processor
                .base_mut()
                .terminate(TerminationCause::Unspecified);
            return;
        };

        let snr = if noise_amp > 0.0 {
            measure.value / noise_amp
        } else {
            measure.value
        };
        if snr < self.config.min_snr {
            log::debug!(
                "{}: amplitude snr {snr:.2} below {:.2}",
                self.config.amplitude_type,
                self.config.min_snr
            );
            self.processor.base_mut().terminate(TerminationCause::LowSnr);
            return;
        }

        let index = s0 + measure.index;
        let stream_id = self
            .processor
            .base()
            .stream_id()
            .cloned()
            .unwrap_or_default();
        self.result = Some(AmplitudeResult {
            amplitude_type: self.config.amplitude_type.clone(),
            stream_id,
            time: self
                .processor
                .time_at(index)
                .expect("index from completed buffer"),
            value: RealQuantity::new(measure.value * self.config.scale),
            period: measure.period,
            snr,
            unit: self.config.unit.clone(),
        });
        self.processor.base_mut().finish();
    }
}

struct Measure {
    value: f64,
    index: usize,
    period: Option<f64>,
}

fn measure(signal: &[f64], offset: f64, rate: f64, rule: MeasurementRule) -> Option<Measure> {
    if signal.is_empty() {
        return None;
    }
    match rule {
        MeasurementRule::AbsMax => {
            let (index, value) = signal
                .iter()
                .map(|x| (x - offset).abs())
                .enumerate()
                .fold((0, 0.0), |acc, (i, v)| if v > acc.1 { (i, v) } else { acc });
            Some(Measure {
                value,
                index,
                period: period_from_crossings(signal, offset, index, rate),
            })
        }
        MeasurementRule::HalfPeakToPeak => {
            let mut imax = 0;
            let mut imin = 0;
            for (i, x) in signal.iter().enumerate() {
                if *x > signal[imax] {
                    imax = i;
                }
                if *x < signal[imin] {
                    imin = i;
                }
            }
            let value = (signal[imax] - signal[imin]) / 2.0;
            let index = if (signal[imax] - offset).abs() >= (signal[imin] - offset).abs() {
                imax
            } else {
                imin
            };
            let period = Some(2.0 * (imax as f64 - imin as f64).abs() / rate);
            Some(Measure {
                value,
                index,
                period,
            })
        }
        MeasurementRule::IntegratedEnvelope => {
            let mut sum = 0.0;
            let mut best = 0.0;
            let mut index = 0;
            for (i, x) in signal.iter().enumerate() {
                sum += (x - offset) / rate;
                if sum.abs() > best {
                    best = sum.abs();
                    index = i;
                }
            }
            Some(Measure {
                value: best,
                index,
                period: None,
            })
        }
    }
}

/// Twice the distance between the zero crossings around the peak.
fn period_from_crossings(signal: &[f64], offset: f64, peak: usize, rate: f64) -> Option<f64> {
    let sign = (signal[peak] - offset).signum();
    let mut left = peak;
    while left > 0 && (signal[left] - offset).signum() == sign {
        left -= 1;
    }
    let mut right = peak;
    while right + 1 < signal.len() && (signal[right] - offset).signum() == sign {
        right += 1;
    }
    if left == 0 || right + 1 == signal.len() {
        return None;
    }
    Some(2.0 * (right - left) as f64 / rate)
}
