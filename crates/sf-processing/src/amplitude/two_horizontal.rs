//! Two-horizontal amplitude proxies
//!
//! Hold one sub-processor per horizontal component, direct records to the
//! matching one, and combine the two finished measurements. The combined
//! reference time is taken from the component whose value was selected;
//! for the averaging combiners that is the larger one.

use std::str::FromStr;

use sf_core::{Record, Time};
use sf_model::RealQuantity;

use crate::{AmplitudeProcessor, AmplitudeResult, ConfigError, Status, TerminationCause};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combiner {
    #[default]
    Max,
    Min,
    Average,
    GeometricMean,
}

impl FromStr for Combiner {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Combiner::Max),
            "min" => Ok(Combiner::Min),
            "average" => Ok(Combiner::Average),
            "geometricMean" => Ok(Combiner::GeometricMean),
            other => Err(ConfigError::BadParameter {
                name: "combiner".into(),
                message: format!("unknown combiner '{other}'"),
            }),
        }
    }
}

pub struct TwoHorizontalAmplitude {
    amplitude_type: String,
    east: AmplitudeProcessor,
    north: AmplitudeProcessor,
    combiner: Combiner,
    results: [Option<AmplitudeResult>; 2],
    combined: Option<AmplitudeResult>,
}

impl TwoHorizontalAmplitude {
    /// `east` and `north` are ready-built component processors of the same
    /// amplitude family.
    pub fn new(
        amplitude_type: impl Into<String>,
        east: AmplitudeProcessor,
        north: AmplitudeProcessor,
        combiner: Combiner,
    ) -> Self {
        Self {
            amplitude_type: amplitude_type.into(),
            east,
            north,
            combiner,
            results: [None, None],
            combined: None,
        }
    }

    pub fn set_trigger(&mut self, trigger: Time) {
        self.east.set_trigger(trigger);
        self.north.set_trigger(trigger);
    }

    pub fn combiner(&self) -> Combiner {
        self.combiner
    }

    pub fn result(&self) -> Option<&AmplitudeResult> {
        self.combined.as_ref()
    }

    /// Worst status across the components, `Finished` once combined.
    pub fn status(&self) -> Status {
        if self.combined.is_some() {
            return Status::Finished;
        }
        for processor in [&self.east, &self.north] {
            if let Status::Terminated(cause) = processor.status() {
                return Status::Terminated(cause);
            }
        }
        if self.results.iter().any(Option::is_some) {
            Status::InProgress
        } else {
            Status::WaitingForData
        }
    }

    pub fn close(&mut self) {
        self.east.close();
        self.north.close();
    }

    /// Routes the record by component letter; emits once both components
    /// have completed.
    pub fn feed(&mut self, record: &Record) -> Option<&AmplitudeResult> {
        if self.combined.is_some() {
            return self.combined.as_ref();
        }

        match record.stream_id().component() {
            Some('E') | Some('2') => {
                if let Some(result) = self.east.feed(record) {
                    self.results[0] = Some(result.clone());
                }
            }
            Some('N') | Some('3') => {
                if let Some(result) = self.north.feed(record) {
                    self.results[1] = Some(result.clone());
                }
            }
            _ => return None,
        }

        if let [Some(east), Some(north)] = &self.results {
            self.combined = Some(combine(
                &self.amplitude_type,
                east,
                north,
                self.combiner,
            ));
        }
        self.combined.as_ref()
    }

    /// Termination cause when a component gave up, e.g. on low SNR.
    pub fn termination_cause(&self) -> Option<TerminationCause> {
        match self.status() {
            Status::Terminated(cause) => Some(cause),
            _ => None,
        }
    }
}

fn combine(
    amplitude_type: &str,
    east: &AmplitudeResult,
    north: &AmplitudeResult,
    combiner: Combiner,
) -> AmplitudeResult {
    let (value, selected) = match combiner {
        Combiner::Max => {
            if east.value.value >= north.value.value {
                (east.value.value, east)
            } else {
                (north.value.value, north)
            }
        }
        Combiner::Min => {
            if east.value.value <= north.value.value {
                (east.value.value, east)
            } else {
                (north.value.value, north)
            }
        }
        Combiner::Average => {
            let v = 0.5 * (east.value.value + north.value.value);
            let sel = if east.value.value >= north.value.value {
                east
            } else {
                north
            };
            (v, sel)
        }
        Combiner::GeometricMean => {
            let v = (east.value.value * north.value.value).sqrt();
            let sel = if east.value.value >= north.value.value {
                east
            } else {
                north
            };
            (v, sel)
        }
    };

    AmplitudeResult {
        amplitude_type: amplitude_type.to_string(),
        stream_id: selected.stream_id.clone(),
        time: selected.time,
        value: RealQuantity::new(value),
        period: selected.period,
        snr: east.snr.min(north.snr),
        unit: selected.unit.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AmplitudeConfig, MeasurementRule, StreamMeta};
    use sf_core::StreamId;

    fn component(unit_gain: f64) -> AmplitudeProcessor {
        let config = AmplitudeConfig {
            amplitude_type: "ML".into(),
            unit: "mm".into(),
            measurement: MeasurementRule::AbsMax,
            noise_begin: -10.0,
            noise_end: -1.0,
            signal_begin: -1.0,
            signal_end: 10.0,
            min_snr: 1.5,
            ..Default::default()
        };
        AmplitudeProcessor::new(config, StreamMeta::with_gain(unit_gain, "m/s")).unwrap()
    }

    fn feed_component(proxy: &mut TwoHorizontalAmplitude, component_code: char, peak: f64) {
        let id = StreamId::new("XX", "STA", "", format!("BH{component_code}"));
        for chunk in 0..40 {
            let start = Time::from_epoch_micros(chunk * 1_000_000);
            let value = if chunk >= 20 && chunk < 23 { peak } else { 0.1 };
            let rec = Record::new(id.clone(), start, 20.0, vec![value; 20]).unwrap();
            proxy.feed(&rec);
        }
    }

    fn run(combiner: Combiner, east_peak: f64, north_peak: f64) -> AmplitudeResult {
        let mut proxy =
            TwoHorizontalAmplitude::new("ML-2h", component(1.0), component(1.0), combiner);
        proxy.set_trigger(Time::from_epoch_micros(20_000_000));
        feed_component(&mut proxy, 'E', east_peak);
        feed_component(&mut proxy, 'N', north_peak);
        proxy.result().expect("combined amplitude").clone()
    }

    #[test]
    fn test_max_takes_larger_and_its_time() {
        let result = run(Combiner::Max, 3.0, 4.0);
        assert!((result.value.value - 4.0).abs() < 0.2);
        assert_eq!(result.stream_id.channel(), "BHN");
    }

    #[test]
    fn test_min_takes_smaller() {
        let result = run(Combiner::Min, 3.0, 4.0);
        assert!((result.value.value - 3.0).abs() < 0.2);
        assert_eq!(result.stream_id.channel(), "BHE");
    }

    #[test]
    fn test_average_and_geometric_mean() {
        let avg = run(Combiner::Average, 3.0, 4.0);
        assert!((avg.value.value - 3.5).abs() < 0.2);

        let geo = run(Combiner::GeometricMean, 3.0, 4.0);
        assert!((geo.value.value - (3.0f64 * 4.0).sqrt()).abs() < 0.2);
    }

    #[test]
    fn test_combiner_parsing() {
        assert_eq!("max".parse::<Combiner>().unwrap(), Combiner::Max);
        assert_eq!(
            "geometricMean".parse::<Combiner>().unwrap(),
            Combiner::GeometricMean
        );
        assert!("median".parse::<Combiner>().is_err());
    }
}
