//! Geographic helpers
//!
//! Spherical distance and azimuth on the reference sphere used by the
//! magnitude calibrations.

/// Kilometers per degree of great-circle arc.
pub const KM_PER_DEG: f64 = 111.195079734632;

#[inline]
pub fn deg2km(deg: f64) -> f64 {
    deg * KM_PER_DEG
}

#[inline]
pub fn km2deg(km: f64) -> f64 {
    km / KM_PER_DEG
}

/// Great-circle distance in degrees plus forward azimuth and back azimuth,
/// all from `(lat1, lon1)` towards `(lat2, lon2)`.
pub fn delta_azi(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> (f64, f64, f64) {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let cos_delta = phi1.sin() * phi2.sin() + phi1.cos() * phi2.cos() * dlon.cos();
    let delta = cos_delta.clamp(-1.0, 1.0).acos().to_degrees();

    let azi = {
        let y = dlon.sin() * phi2.cos();
        let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlon.cos();
        (y.atan2(x).to_degrees() + 360.0) % 360.0
    };
    let baz = {
        let y = (-dlon).sin() * phi1.cos();
        let x = phi2.cos() * phi1.sin() - phi2.sin() * phi1.cos() * dlon.cos();
        (y.atan2(x).to_degrees() + 360.0) % 360.0
    };
    (delta, azi, baz)
}

/// Hypocentral distance in kilometers from epicentral distance and depth.
pub fn hypocentral_km(delta_deg: f64, depth_km: f64) -> f64 {
    let r = deg2km(delta_deg);
    (r * r + depth_km * depth_km).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_degree_north() {
        let (delta, azi, baz) = delta_azi(0.0, 0.0, 1.0, 0.0);
        assert!((delta - 1.0).abs() < 1e-9);
        assert!(azi.abs() < 1e-6);
        assert!((baz - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_deg_km_round_trip() {
        assert!((km2deg(deg2km(3.7)) - 3.7).abs() < 1e-12);
        assert!((deg2km(1.0) - 111.195079734632).abs() < 1e-9);
    }

    #[test]
    fn test_hypocentral_reduces_to_epicentral() {
        assert!((hypocentral_km(2.0, 0.0) - deg2km(2.0)).abs() < 1e-9);
        assert!(hypocentral_km(0.0, 10.0) == 10.0);
    }
}
