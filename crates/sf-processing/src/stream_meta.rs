//! Stream metadata
//!
//! Calibration information for one channel as read from the inventory:
//! overall gain, gain unit, orientation and the validity epoch. The filter
//! chain always sees raw counts; gain is applied to the data afterwards.

use serde::{Deserialize, Serialize};

use sf_core::TimeWindow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMeta {
    pub code: String,
    /// Count-to-physical scale factor.
    pub gain: f64,
    pub gain_unit: String,
    pub gain_frequency: Option<f64>,
    /// Clockwise from north, degrees.
    pub azimuth: f64,
    /// Degrees down from horizontal; -90 is up.
    pub dip: f64,
    /// Validity span of this calibration.
    pub epoch: TimeWindow,
}

impl Default for StreamMeta {
    fn default() -> Self {
        Self {
            code: String::new(),
            gain: 0.0,
            gain_unit: String::new(),
            gain_frequency: None,
            azimuth: 0.0,
            dip: 0.0,
            epoch: TimeWindow::default(),
        }
    }
}

impl StreamMeta {
    pub fn with_gain(gain: f64, gain_unit: impl Into<String>) -> Self {
        Self {
            gain,
            gain_unit: gain_unit.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn has_gain(&self) -> bool {
        self.gain != 0.0
    }

    /// Counts to physical units.
    pub fn remove_gain(&self, data: &mut [f64]) {
        if !self.has_gain() {
            return;
        }
        let scale = 1.0 / self.gain;
        for x in data.iter_mut() {
            *x *= scale;
        }
    }

    /// Physical units back to counts.
    pub fn apply_gain(&self, data: &mut [f64]) {
        if !self.has_gain() {
            return;
        }
        for x in data.iter_mut() {
            *x *= self.gain;
        }
    }
}
