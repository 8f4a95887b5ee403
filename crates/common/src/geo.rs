//! Geographic point validation and distance helpers.

use crate::{AppError, AppResult};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic point in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Latitude in degrees, [-90, 90].
    pub lat: f64,
    /// Longitude in degrees, [-180, 180].
    pub lng: f64,
}

impl GeoPoint {
    /// Create a point, validating coordinate ranges.
    pub fn new(lat: f64, lng: f64) -> AppResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::Validation(format!(
                "latitude must be between -90 and 90, got {lat}"
            )));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::Validation(format!(
                "longitude must be between -180 and 180, got {lng}"
            )));
        }
        Ok(Self { lat, lng })
    }

    /// Great-circle distance to another point in meters (haversine).
    #[must_use]
    pub fn distance_m(&self, other: &Self) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }
}

/// Validate a search radius in meters.
pub fn validate_radius(radius_m: f64) -> AppResult<f64> {
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(AppError::Validation(format!(
            "radius must be greater than 0, got {radius_m}"
        )));
    }
    Ok(radius_m)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_point() {
        let p = GeoPoint::new(40.7128, -74.0060).unwrap();
        assert_eq!(p.lat, 40.7128);
    }

    #[test]
    fn test_boundary_coordinates_accepted() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_out_of_range_latitude() {
        let err = GeoPoint::new(90.1, 0.0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_out_of_range_longitude() {
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_radius_validation() {
        assert!(validate_radius(500.0).is_ok());
        assert!(validate_radius(0.0).is_err());
        assert!(validate_radius(-1.0).is_err());
        assert!(validate_radius(f64::INFINITY).is_err());
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = GeoPoint::new(51.5074, -0.1278).unwrap();
        assert!(p.distance_m(&p) < 1e-6);
    }

    #[test]
    fn test_distance_known_pair() {
        // London to Paris, roughly 343 km
        let london = GeoPoint::new(51.5074, -0.1278).unwrap();
        let paris = GeoPoint::new(48.8566, 2.3522).unwrap();
        let d = london.distance_m(&paris);
        assert!((330_000.0..360_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_distance_symmetry() {
        let a = GeoPoint::new(35.6762, 139.6503).unwrap();
        let b = GeoPoint::new(37.5665, 126.9780).unwrap();
        assert!((a.distance_m(&b) - b.distance_m(&a)).abs() < 1e-6);
    }
}
