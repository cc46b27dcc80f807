//! Configurable local magnitude
//!
//! The MLc-style estimator: distance mode selects hypocentral or
//! epicentral kilometers, calibration is either the parametric form
//! `M = log10(A) + c1*log10(r) + c2*r + c3 + c0` or a non-parametric
//! `-log10(A0)` table, and the validity range clamps distance and depth.

use crate::magnitude::{accept_amplitude, LogA0Table, MagnitudeInput, MagnitudeProcessor};
use crate::{deg2km, hypocentral_km, MagnitudeStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMode {
    #[default]
    Hypocentral,
    Epicentral,
}

/// Parametric coefficients; `c0` is the station correction slot.
#[derive(Debug, Clone, Copy)]
pub struct ParametricCoefficients {
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub c4: f64,
    pub c5: f64,
}

impl Default for ParametricCoefficients {
    fn default() -> Self {
        // Hutton & Boore (1987) flavored defaults
        Self {
            c0: 0.0,
            c1: 1.11,
            c2: 0.00189,
            c3: -2.09,
            c4: 0.0,
            c5: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Calibration {
    Parametric(ParametricCoefficients),
    NonParametric(LogA0Table),
}

#[derive(Debug, Clone)]
pub struct LocalMagnitude {
    pub distance_mode: DistanceMode,
    pub calibration: Calibration,
    /// Expected amplitude unit; millimeters of Wood-Anderson displacement.
    pub expected_unit: &'static str,
    pub min_distance_km: f64,
    pub max_distance_km: f64,
    pub max_depth_km: f64,
}

impl Default for LocalMagnitude {
    fn default() -> Self {
        Self {
            distance_mode: DistanceMode::default(),
            calibration: Calibration::Parametric(ParametricCoefficients::default()),
            expected_unit: "mm",
            min_distance_km: 0.0,
            max_distance_km: 8.0 * crate::KM_PER_DEG,
            max_depth_km: 80.0,
        }
    }
}

impl MagnitudeProcessor for LocalMagnitude {
    fn magnitude_type(&self) -> &'static str {
        "MLc"
    }

    fn amplitude_type(&self) -> &'static str {
        "ML"
    }

    fn compute(&self, input: &MagnitudeInput) -> Result<f64, MagnitudeStatus> {
        let amplitude = accept_amplitude(input.amplitude, &input.unit, self.expected_unit)?;

        let depth = input.depth_km.max(0.0);
        if depth > self.max_depth_km {
            return Err(MagnitudeStatus::DepthOutOfRange);
        }

        let r = match self.distance_mode {
            DistanceMode::Hypocentral => hypocentral_km(input.delta_deg, depth),
            DistanceMode::Epicentral => deg2km(input.delta_deg),
        };
        if r < self.min_distance_km || r > self.max_distance_km {
            return Err(MagnitudeStatus::DistanceOutOfRange);
        }

        match &self.calibration {
            Calibration::Parametric(c) => {
                Ok(amplitude.log10() + c.c1 * r.log10() + c.c2 * r + c.c3 + c.c0)
            }
            Calibration::NonParametric(table) => {
                let log_a0 = table
                    .value_at(r)
                    .ok_or(MagnitudeStatus::DistanceOutOfRange)?;
                Ok(amplitude.log10() - log_a0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magnitude::Extrapolation;

    #[test]
    fn test_parametric_formula() {
        let ml = LocalMagnitude {
            distance_mode: DistanceMode::Epicentral,
            ..Default::default()
        };
        let input = MagnitudeInput::new(1.0, "mm", 1.0, 0.0);
        let r = deg2km(1.0);
        let c = ParametricCoefficients::default();
        let expected = 0.0 + c.c1 * r.log10() + c.c2 * r + c.c3;
        assert!((ml.compute(&input).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_hypocentral_vs_epicentral() {
        let hypo = LocalMagnitude::default();
        let epi = LocalMagnitude {
            distance_mode: DistanceMode::Epicentral,
            ..Default::default()
        };
        // With a deep source the hypocentral distance is larger, so the
        // distance correction raises the magnitude.
        let input = MagnitudeInput::new(1.0, "mm", 0.3, 60.0);
        assert!(hypo.compute(&input).unwrap() > epi.compute(&input).unwrap());
    }

    #[test]
    fn test_nonparametric_table() {
        let table =
            LogA0Table::parse("0:-1.3,60:-2.8,400:-4.5", Extrapolation::Reject).unwrap();
        let ml = LocalMagnitude {
            calibration: Calibration::NonParametric(table),
            distance_mode: DistanceMode::Epicentral,
            max_distance_km: 1000.0,
            ..Default::default()
        };
        // At 60 km, M = log10(A) + 2.8
        let input = MagnitudeInput::new(10.0, "mm", 60.0 / crate::KM_PER_DEG, 0.0);
        assert!((ml.compute(&input).unwrap() - 3.8).abs() < 1e-6);

        // Outside the table under the reject policy
        let far = MagnitudeInput::new(10.0, "mm", 800.0 / crate::KM_PER_DEG, 0.0);
        assert_eq!(ml.compute(&far), Err(MagnitudeStatus::DistanceOutOfRange));
    }

    #[test]
    fn test_range_clamps() {
        let ml = LocalMagnitude::default();
        let deep = MagnitudeInput::new(1.0, "mm", 1.0, 200.0);
        assert_eq!(ml.compute(&deep), Err(MagnitudeStatus::DepthOutOfRange));

        let far = MagnitudeInput::new(1.0, "mm", 30.0, 10.0);
        assert_eq!(ml.compute(&far), Err(MagnitudeStatus::DistanceOutOfRange));
    }

    #[test]
    fn test_station_correction_adds_linearly() {
        let mut corrected = LocalMagnitude::default();
        if let Calibration::Parametric(c) = &mut corrected.calibration {
            c.c0 = 0.25;
        }
        let plain = LocalMagnitude::default();
        let input = MagnitudeInput::new(1.0, "mm", 1.0, 10.0);
        let dm = corrected.compute(&input).unwrap() - plain.compute(&input).unwrap();
        assert!((dm - 0.25).abs() < 1e-12);
    }
}
