//! Calibration locales
//!
//! Region-dependent calibration profile selection: each profile carries
//! predicates over the epicenter polygon, the distance and depth ranges
//! and a back-azimuth band. Profiles are evaluated in configuration order
//! and the first match wins; overlaps are resolved by that order alone.

use crate::PolyRegion;

/// A candidate calibration profile.
#[derive(Debug, Clone)]
pub struct LocaleProfile<T> {
    pub name: String,
    /// Epicenter must fall inside, when present.
    pub region: Option<PolyRegion>,
    /// Degrees, inclusive.
    pub min_distance_deg: Option<f64>,
    pub max_distance_deg: Option<f64>,
    /// Kilometers, inclusive.
    pub min_depth_km: Option<f64>,
    pub max_depth_km: Option<f64>,
    /// Degrees, may wrap through north (`min > max`).
    pub backazimuth_band: Option<(f64, f64)>,
    /// The calibration payload handed to the magnitude processor.
    pub payload: T,
}

impl<T> LocaleProfile<T> {
    pub fn new(name: impl Into<String>, payload: T) -> Self {
        Self {
            name: name.into(),
            region: None,
            min_distance_deg: None,
            max_distance_deg: None,
            min_depth_km: None,
            max_depth_km: None,
            backazimuth_band: None,
            payload,
        }
    }

    fn matches(
        &self,
        epicenter: (f64, f64),
        delta_deg: f64,
        depth_km: f64,
        backazimuth_deg: f64,
    ) -> bool {
        if let Some(region) = &self.region {
            if !region.contains(epicenter.0, epicenter.1) {
                return false;
            }
        }
        if self.min_distance_deg.is_some_and(|d| delta_deg < d) {
            return false;
        }
        if self.max_distance_deg.is_some_and(|d| delta_deg > d) {
            return false;
        }
        if self.min_depth_km.is_some_and(|d| depth_km < d) {
            return false;
        }
        if self.max_depth_km.is_some_and(|d| depth_km > d) {
            return false;
        }
        if let Some((min, max)) = self.backazimuth_band {
            let baz = backazimuth_deg.rem_euclid(360.0);
            let inside = if min <= max {
                (min..=max).contains(&baz)
            } else {
                baz >= min || baz <= max
            };
            if !inside {
                return false;
            }
        }
        true
    }
}

/// First matching profile, in configuration order.
pub fn select_profile<'a, T>(
    profiles: &'a [LocaleProfile<T>],
    epicenter: (f64, f64),
    delta_deg: f64,
    depth_km: f64,
    backazimuth_deg: f64,
) -> Option<&'a LocaleProfile<T>> {
    profiles
        .iter()
        .find(|p| p.matches(epicenter, delta_deg, depth_km, backazimuth_deg))
}
