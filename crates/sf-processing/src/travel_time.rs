//! Travel-time service boundary
//!
//! Travel times come from external libraries; the processing layer only
//! consumes this interface. Implementations are installed by the hosting
//! application.

use thiserror::Error;

/// One predicted phase arrival relative to the origin time.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelTime {
    /// Non-empty phase code, e.g. `P`, `pP`, `S`.
    pub phase: String,
    /// Seconds after the origin time.
    pub time: f64,
    /// Partial derivative with respect to depth, s/km.
    pub dtdh: f64,
    /// Partial derivative with respect to distance, s/deg.
    pub dtdd: f64,
    /// Take-off angle at the source, degrees.
    pub takeoff: f64,
    /// Azimuth from the source towards the receiver, degrees.
    pub azimuth: f64,
}

#[derive(Error, Debug)]
pub enum TravelTimeError {
    #[error("no phases for distance {delta_deg} deg, depth {depth_km} km")]
    OutOfRange { delta_deg: f64, depth_km: f64 },

    #[error("travel time service failed: {0}")]
    Backend(String),
}

/// Computes predicted arrivals for a source/receiver pair.
pub trait TravelTimeService: Send + Sync {
    /// All phases, fastest first.
    fn compute(
        &self,
        source_lat: f64,
        source_lon: f64,
        depth_km: f64,
        receiver_lat: f64,
        receiver_lon: f64,
    ) -> Result<Vec<TravelTime>, TravelTimeError>;

    /// Convenience: just the first arrival.
    fn first_arrival(
        &self,
        source_lat: f64,
        source_lon: f64,
        depth_km: f64,
        receiver_lat: f64,
        receiver_lon: f64,
    ) -> Result<TravelTime, TravelTimeError> {
        self.compute(source_lat, source_lon, depth_km, receiver_lat, receiver_lon)?
            .into_iter()
            .next()
            .ok_or(TravelTimeError::OutOfRange {
                delta_deg: 0.0,
                depth_km,
            })
    }
}
