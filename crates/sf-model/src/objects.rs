//! Pick, amplitude, magnitude and origin objects
//!
//! Thin value carriers with quantities expressed as value plus optional
//! asymmetric uncertainties. `create` constructors assign a public id and
//! register the object; plain `new` constructors build unregistered
//! instances for tests and transient use.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sf_core::{StreamId, Time};

use crate::{generate_public_id, PublicObject, PublicObjectRegistry};

/// A scalar with optional asymmetric uncertainties (both >= 0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RealQuantity {
    pub value: f64,
    pub lower_uncertainty: Option<f64>,
    pub upper_uncertainty: Option<f64>,
}

impl RealQuantity {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            lower_uncertainty: None,
            upper_uncertainty: None,
        }
    }

    pub fn with_uncertainties(value: f64, lower: f64, upper: f64) -> Self {
        Self {
            value,
            lower_uncertainty: Some(lower),
            upper_uncertainty: Some(upper),
        }
    }
}

/// A time with optional asymmetric uncertainties in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeQuantity {
    pub value: Time,
    pub lower_uncertainty: Option<f64>,
    pub upper_uncertainty: Option<f64>,
}

impl TimeQuantity {
    pub fn new(value: Time) -> Self {
        Self {
            value,
            lower_uncertainty: None,
            upper_uncertainty: None,
        }
    }

    pub fn with_uncertainties(value: Time, lower: f64, upper: f64) -> Self {
        Self {
            value,
            lower_uncertainty: Some(lower),
            upper_uncertainty: Some(upper),
        }
    }
}

/// First-motion polarity of a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    Positive,
    Negative,
    Undecidable,
}

/// A phase pick.
#[derive(Debug, Clone)]
pub struct Pick {
    public_id: String,
    pub stream_id: StreamId,
    pub time: TimeQuantity,
    pub phase_hint: Option<String>,
    pub filter_id: String,
    pub method_id: String,
    pub polarity: Option<Polarity>,
    pub snr: Option<f64>,
}

impl Pick {
    pub fn new(stream_id: StreamId, time: TimeQuantity) -> Self {
        Self {
            public_id: generate_public_id("Pick"),
            stream_id,
            time,
            phase_hint: None,
            filter_id: String::new(),
            method_id: String::new(),
            polarity: None,
            snr: None,
        }
    }

    /// Build and register in the global registry.
    pub fn create(stream_id: StreamId, time: TimeQuantity) -> Arc<Self> {
        let pick = Arc::new(Self::new(stream_id, time));
        let shared: Arc<dyn PublicObject> = pick.clone();
        PublicObjectRegistry::global().register(&shared);
        pick
    }
}

impl PublicObject for Pick {
    fn public_id(&self) -> &str {
        &self.public_id
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A measured waveform amplitude.
#[derive(Debug, Clone)]
pub struct Amplitude {
    public_id: String,
    pub amplitude_type: String,
    pub stream_id: StreamId,
    pub value: RealQuantity,
    pub reference_time: Time,
    pub period: Option<f64>,
    pub snr: Option<f64>,
    pub unit: String,
    pub pick_id: Option<String>,
}

impl Amplitude {
    pub fn new(
        amplitude_type: impl Into<String>,
        stream_id: StreamId,
        value: RealQuantity,
        reference_time: Time,
    ) -> Self {
        Self {
            public_id: generate_public_id("Amplitude"),
            amplitude_type: amplitude_type.into(),
            stream_id,
            value,
            reference_time,
            period: None,
            snr: None,
            unit: String::new(),
            pick_id: None,
        }
    }

    pub fn create(
        amplitude_type: impl Into<String>,
        stream_id: StreamId,
        value: RealQuantity,
        reference_time: Time,
    ) -> Arc<Self> {
        let amp = Arc::new(Self::new(amplitude_type, stream_id, value, reference_time));
        let shared: Arc<dyn PublicObject> = amp.clone();
        PublicObjectRegistry::global().register(&shared);
        amp
    }
}

impl PublicObject for Amplitude {
    fn public_id(&self) -> &str {
        &self.public_id
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A magnitude computed at one station.
#[derive(Debug, Clone)]
pub struct StationMagnitude {
    public_id: String,
    pub magnitude_type: String,
    pub stream_id: StreamId,
    pub magnitude: RealQuantity,
    pub amplitude_id: Option<String>,
    /// Whether the inputs were clamped into the calibration domain.
    pub clamped: bool,
}

impl StationMagnitude {
    pub fn new(
        magnitude_type: impl Into<String>,
        stream_id: StreamId,
        magnitude: RealQuantity,
    ) -> Self {
        Self {
            public_id: generate_public_id("StationMagnitude"),
            magnitude_type: magnitude_type.into(),
            stream_id,
            magnitude,
            amplitude_id: None,
            clamped: false,
        }
    }

    pub fn create(
        magnitude_type: impl Into<String>,
        stream_id: StreamId,
        magnitude: RealQuantity,
    ) -> Arc<Self> {
        let mag = Arc::new(Self::new(magnitude_type, stream_id, magnitude));
        let shared: Arc<dyn PublicObject> = mag.clone();
        PublicObjectRegistry::global().register(&shared);
        mag
    }
}

impl PublicObject for StationMagnitude {
    fn public_id(&self) -> &str {
        &self.public_id
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A hypocenter estimate, as consumed by the magnitude processors.
#[derive(Debug, Clone)]
pub struct Origin {
    public_id: String,
    pub time: Time,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,
}

impl Origin {
    pub fn new(time: Time, latitude: f64, longitude: f64, depth_km: f64) -> Self {
        Self {
            public_id: generate_public_id("Origin"),
            time,
            latitude,
            longitude,
            depth_km,
        }
    }

    pub fn create(time: Time, latitude: f64, longitude: f64, depth_km: f64) -> Arc<Self> {
        let origin = Arc::new(Self::new(time, latitude, longitude, depth_km));
        let shared: Arc<dyn PublicObject> = origin.clone();
        PublicObjectRegistry::global().register(&shared);
        origin
    }
}

impl PublicObject for Origin {
    fn public_id(&self) -> &str {
        &self.public_id
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
