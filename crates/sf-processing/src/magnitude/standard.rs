//! Teleseismic and regional magnitude calibrations
//!
//! The classic catalogue: 20-second surface wave Ms, broadband Ms, short
//! period body wave mb, the JMA regional magnitude and Mwp from integrated
//! P displacement.

use crate::magnitude::{accept_amplitude, MagnitudeInput, MagnitudeProcessor};
use crate::{deg2km, MagnitudeStatus};

/// 20-second surface-wave magnitude (Prague formula, IASPEI).
#[derive(Debug, Clone)]
pub struct Ms20 {
    pub minimum_period: f64,
    pub maximum_period: f64,
    pub minimum_distance_deg: f64,
    pub maximum_distance_deg: f64,
    pub maximum_depth_km: f64,
}

impl Default for Ms20 {
    fn default() -> Self {
        Self {
            minimum_period: 18.0,
            maximum_period: 22.0,
            minimum_distance_deg: 20.0,
            maximum_distance_deg: 160.0,
            maximum_depth_km: 100.0,
        }
    }
}

impl MagnitudeProcessor for Ms20 {
    fn magnitude_type(&self) -> &'static str {
        "Ms_20"
    }

    fn compute(&self, input: &MagnitudeInput) -> Result<f64, MagnitudeStatus> {
        let amplitude = accept_amplitude(input.amplitude, &input.unit, "nm")?;
        if input.delta_deg < self.minimum_distance_deg
            || input.delta_deg > self.maximum_distance_deg
        {
            return Err(MagnitudeStatus::DistanceOutOfRange);
        }
        if input.depth_km.max(0.0) > self.maximum_depth_km {
            return Err(MagnitudeStatus::DepthOutOfRange);
        }
        if input.period < self.minimum_period || input.period > self.maximum_period {
            return Err(MagnitudeStatus::PeriodOutOfRange);
        }

        // Amplitude in nm
        Ok((amplitude / input.period).log10() + 1.66 * input.delta_deg.log10() + 0.3)
    }
}

/// Broadband surface-wave magnitude on velocity amplitudes.
#[derive(Debug, Clone)]
pub struct MsBb {
    pub minimum_distance_deg: f64,
    pub maximum_distance_deg: f64,
    pub maximum_depth_km: f64,
}

impl Default for MsBb {
    fn default() -> Self {
        Self {
            minimum_distance_deg: 2.0,
            maximum_distance_deg: 160.0,
            maximum_depth_km: 100.0,
        }
    }
}

impl MagnitudeProcessor for MsBb {
    fn magnitude_type(&self) -> &'static str {
        "Ms(BB)"
    }

    fn compute(&self, input: &MagnitudeInput) -> Result<f64, MagnitudeStatus> {
        let amplitude = accept_amplitude(input.amplitude, &input.unit, "m/s")?;
        if input.delta_deg < self.minimum_distance_deg
            || input.delta_deg > self.maximum_distance_deg
        {
            return Err(MagnitudeStatus::DistanceOutOfRange);
        }
        if input.depth_km.max(0.0) > self.maximum_depth_km {
            return Err(MagnitudeStatus::DepthOutOfRange);
        }

        // Convert m/s to micrometers/s and take out the angular frequency
        let a = amplitude * 1e6 / (2.0 * std::f64::consts::PI);
        Ok(a.log10() + 1.66 * input.delta_deg.log10() + 3.3)
    }
}

/// Short-period body-wave magnitude with an abridged Gutenberg-Richter
/// attenuation term.
#[derive(Debug, Clone)]
pub struct MbMagnitude {
    pub minimum_distance_deg: f64,
    pub maximum_distance_deg: f64,
    pub maximum_depth_km: f64,
    pub minimum_period: f64,
    pub maximum_period: f64,
}

impl Default for MbMagnitude {
    fn default() -> Self {
        Self {
            minimum_distance_deg: 5.0,
            maximum_distance_deg: 105.0,
            maximum_depth_km: 700.0,
            minimum_period: 0.4,
            // Periods above 3 s are outside the IASPEI short-period band
            maximum_period: 3.0,
        }
    }
}

/// Q(delta) attenuation samples for shallow sources, 5..=105 degrees.
const MB_Q_DISTANCE: [f64; 11] = [
    5.0, 15.0, 25.0, 35.0, 45.0, 55.0, 65.0, 75.0, 85.0, 95.0, 105.0,
];
const MB_Q_VALUE: [f64; 11] = [
    6.6, 6.0, 6.4, 6.5, 6.7, 6.8, 6.8, 6.9, 7.0, 7.1, 7.3,
];

fn mb_q(delta: f64, depth_km: f64) -> f64 {
    let mut q = MB_Q_VALUE[MB_Q_VALUE.len() - 1];
    for i in 1..MB_Q_DISTANCE.len() {
        if delta <= MB_Q_DISTANCE[i] {
            let f = (delta - MB_Q_DISTANCE[i - 1]) / (MB_Q_DISTANCE[i] - MB_Q_DISTANCE[i - 1]);
            q = MB_Q_VALUE[i - 1] + f * (MB_Q_VALUE[i] - MB_Q_VALUE[i - 1]);
            break;
        }
    }
    // Deep sources radiate from below the low-velocity zone; a mild depth
    // term keeps the estimate from drifting.
    q - 0.01 * (depth_km / 100.0)
}

impl MagnitudeProcessor for MbMagnitude {
    fn magnitude_type(&self) -> &'static str {
        "mb"
    }

    fn compute(&self, input: &MagnitudeInput) -> Result<f64, MagnitudeStatus> {
        // Calibration expects micrometers
        let amplitude = accept_amplitude(input.amplitude, &input.unit, "um")?;
        if input.delta_deg < self.minimum_distance_deg
            || input.delta_deg > self.maximum_distance_deg
        {
            return Err(MagnitudeStatus::DistanceOutOfRange);
        }
        if input.depth_km.max(0.0) > self.maximum_depth_km {
            return Err(MagnitudeStatus::DepthOutOfRange);
        }
        if input.period < self.minimum_period || input.period > self.maximum_period {
            return Err(MagnitudeStatus::PeriodOutOfRange);
        }

        Ok((amplitude / input.period).log10() + mb_q(input.delta_deg, input.depth_km))
    }
}

/// JMA regional magnitude after Katsumata, with the GFZ station constant.
#[derive(Debug, Clone)]
pub struct Mjma {
    pub minimum_distance_deg: f64,
    pub maximum_distance_deg: f64,
    pub maximum_depth_km: f64,
}

impl Default for Mjma {
    fn default() -> Self {
        Self {
            minimum_distance_deg: 0.3,
            maximum_distance_deg: 20.0,
            maximum_depth_km: 80.0,
        }
    }
}

impl MagnitudeProcessor for Mjma {
    fn magnitude_type(&self) -> &'static str {
        "Mjma"
    }

    fn compute(&self, input: &MagnitudeInput) -> Result<f64, MagnitudeStatus> {
        if input.delta_deg < self.minimum_distance_deg
            || input.delta_deg > self.maximum_distance_deg
        {
            return Err(MagnitudeStatus::DistanceOutOfRange);
        }
        let depth = input.depth_km.max(0.0);
        if depth > self.maximum_depth_km {
            return Err(MagnitudeStatus::DepthOutOfRange);
        }
        let amplitude = accept_amplitude(input.amplitude, &input.unit, "um")?;

        let (a1, a2, a3) = (1.73, 0.0, -0.83);
        let r = deg2km(input.delta_deg);
        Ok(amplitude.log10() + a1 * r.log10() + a2 * r + a3 + 0.44)
    }
}

/// Mwp after Tsuboi (1999) with an optional linear fit correction.
#[derive(Debug, Clone)]
pub struct Mwp {
    pub offset: f64,
    pub slope: f64,
    /// P-wave velocity along the ray path, m/s.
    pub alpha: f64,
    /// Mass density along the ray path, kg/m^3.
    pub rho: f64,
    /// Radiation pattern factor.
    pub fp: f64,
    pub minimum_distance_deg: f64,
    pub maximum_distance_deg: f64,
}

impl Default for Mwp {
    fn default() -> Self {
        Self {
            offset: 0.0,
            slope: 1.0,
            alpha: 7900.0,
            rho: 3400.0,
            fp: 0.52,
            minimum_distance_deg: 5.0,
            maximum_distance_deg: 105.0,
        }
    }
}

impl MagnitudeProcessor for Mwp {
    fn magnitude_type(&self) -> &'static str {
        "Mwp"
    }

    fn compute(&self, input: &MagnitudeInput) -> Result<f64, MagnitudeStatus> {
        // Peak of the integrated displacement, in m*s
        let amplitude = accept_amplitude(input.amplitude, &input.unit, "m*s")?;
        if input.delta_deg < self.minimum_distance_deg
            || input.delta_deg > self.maximum_distance_deg
        {
            return Err(MagnitudeStatus::DistanceOutOfRange);
        }

        let r = deg2km(input.delta_deg) * 1000.0;
        let moment = 4.0 * std::f64::consts::PI * self.rho * self.alpha.powi(3) * r * amplitude
            / self.fp;
        let mw = (moment.log10() - 9.1) / 1.5;
        Ok(mw * self.slope + self.offset)
    }
}
