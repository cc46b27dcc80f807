//! Magnitude processors
//!
//! Pure functions of `(amplitude, unit, period, snr, distance, depth)`
//! producing a station magnitude or a typed rejection. Inputs are accepted
//! via SI-aware unit conversion; distance and depth are validated against
//! the calibration domain. Calibration is either a parametric formula or a
//! non-parametric distance-correction table with an explicit extrapolation
//! policy.

mod local;
mod standard;
mod table;

pub use local::*;
pub use standard::*;
pub use table::*;

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::{convert_unit, MagnitudeStatus};

/// Everything a magnitude computation may look at.
#[derive(Debug, Clone)]
pub struct MagnitudeInput {
    pub amplitude: f64,
    pub unit: String,
    /// Seconds; 0 when the amplitude carries no period.
    pub period: f64,
    pub snr: f64,
    /// Epicentral distance in degrees.
    pub delta_deg: f64,
    pub depth_km: f64,
}

impl MagnitudeInput {
    pub fn new(amplitude: f64, unit: impl Into<String>, delta_deg: f64, depth_km: f64) -> Self {
        Self {
            amplitude,
            unit: unit.into(),
            period: 0.0,
            snr: 0.0,
            delta_deg,
            depth_km,
        }
    }

    pub fn with_period(mut self, period: f64) -> Self {
        self.period = period;
        self
    }
}

/// A station magnitude estimator for one magnitude type.
pub trait MagnitudeProcessor: Send + Sync {
    fn magnitude_type(&self) -> &'static str;

    /// The amplitude type consumed; usually the same name.
    fn amplitude_type(&self) -> &'static str {
        self.magnitude_type()
    }

    fn compute(&self, input: &MagnitudeInput) -> Result<f64, MagnitudeStatus>;
}

/// Convert an incoming amplitude into the unit a calibration expects.
pub fn accept_amplitude(
    amplitude: f64,
    from_unit: &str,
    expected_unit: &str,
) -> Result<f64, MagnitudeStatus> {
    if amplitude <= 0.0 {
        return Err(MagnitudeStatus::AmplitudeOutOfRange);
    }
    convert_unit(amplitude, from_unit, expected_unit)
        .ok_or(MagnitudeStatus::InvalidAmplitudeUnit)
}

type MagnitudeConstructor = fn() -> Box<dyn MagnitudeProcessor>;

static REGISTRY: OnceLock<RwLock<HashMap<String, MagnitudeConstructor>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, MagnitudeConstructor>> {
    REGISTRY.get_or_init(|| {
        let mut table: HashMap<String, MagnitudeConstructor> = HashMap::new();
        table.insert("Ms_20".into(), || Box::new(Ms20::default()));
        table.insert("Ms(BB)".into(), || Box::new(MsBb::default()));
        table.insert("mb".into(), || Box::new(MbMagnitude::default()));
        table.insert("Mjma".into(), || Box::new(Mjma::default()));
        table.insert("Mwp".into(), || Box::new(Mwp::default()));
        RwLock::new(table)
    })
}

/// Register a magnitude constructor under its type name.
pub fn register_magnitude(name: &str, ctor: MagnitudeConstructor) {
    registry().write().insert(name.to_string(), ctor);
}

/// Instantiate a magnitude processor by type name.
pub fn create_magnitude(name: &str) -> Option<Box<dyn MagnitudeProcessor>> {
    registry().read().get(name).map(|ctor| ctor())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_amplitude() {
        // 1 m expressed in nm
        assert_eq!(accept_amplitude(1.0, "m", "nm").unwrap(), 1e9);
        assert_eq!(
            accept_amplitude(-1.0, "m", "nm"),
            Err(MagnitudeStatus::AmplitudeOutOfRange)
        );
        assert_eq!(
            accept_amplitude(1.0, "m/s", "nm"),
            Err(MagnitudeStatus::InvalidAmplitudeUnit)
        );
    }

    #[test]
    fn test_registry_round_trip() {
        let ms20 = create_magnitude("Ms_20").expect("registered");
        assert_eq!(ms20.magnitude_type(), "Ms_20");
        assert!(create_magnitude("Mnope").is_none());
    }
}
