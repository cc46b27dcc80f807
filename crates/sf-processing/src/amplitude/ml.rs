//! Local magnitude amplitude family
//!
//! All variants measure on a simulated Wood-Anderson trace and publish in
//! millimeters of Wood-Anderson displacement. `MLv` carries the empirical
//! factor of two for measuring on the vertical component, where normally
//! both horizontals are measured and averaged.

use crate::{
    AmplitudeConfig, AmplitudeProcessor, ConfigResult, MeasurementRule, ResponseSimulation,
    StreamMeta,
};

fn ml_config(amplitude_type: &str) -> AmplitudeConfig {
    AmplitudeConfig {
        amplitude_type: amplitude_type.into(),
        unit: "mm".into(),
        response: ResponseSimulation::WoodAnderson,
        measurement: MeasurementRule::HalfPeakToPeak,
        noise_begin: -30.0,
        noise_end: -5.0,
        signal_begin: -5.0,
        signal_end: 150.0,
        min_snr: 3.0,
        ..Default::default()
    }
}

/// Horizontal-component ML amplitude.
pub fn ml_amplitude(meta: StreamMeta) -> ConfigResult<AmplitudeProcessor> {
    AmplitudeProcessor::new(ml_config("ML"), meta)
}

/// Vertical-component ML amplitude with the empirical x2 correction.
pub fn mlv_amplitude(meta: StreamMeta) -> ConfigResult<AmplitudeProcessor> {
    let mut config = ml_config("MLv");
    config.scale = 2.0;
    AmplitudeProcessor::new(config, meta)
}

/// MLh-style absolute-maximum variant.
pub fn mlh_amplitude(meta: StreamMeta) -> ConfigResult<AmplitudeProcessor> {
    let mut config = ml_config("MLh");
    config.measurement = MeasurementRule::AbsMax;
    AmplitudeProcessor::new(config, meta)
}

/// mb_Lg-style amplitude: band-limited guided-wave energy on a
/// Wood-Anderson trace.
pub fn mb_lg_amplitude(meta: StreamMeta) -> ConfigResult<AmplitudeProcessor> {
    let mut config = ml_config("mb_Lg");
    config.pre_filter = Some("BW(3,0.5,3)".into());
    config.measurement = MeasurementRule::AbsMax;
    AmplitudeProcessor::new(config, meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_metadata() {
        let meta = || StreamMeta::with_gain(6.0e8, "m/s");
        let ml = ml_amplitude(meta()).unwrap();
        assert_eq!(ml.amplitude_type(), "ML");
        assert_eq!(ml.config().unit, "mm");

        let mlv = mlv_amplitude(meta()).unwrap();
        assert_eq!(mlv.config().scale, 2.0);

        let mlh = mlh_amplitude(meta()).unwrap();
        assert_eq!(mlh.config().measurement, MeasurementRule::AbsMax);

        let mblg = mb_lg_amplitude(meta()).unwrap();
        assert!(mblg.config().pre_filter.is_some());
    }
}
