//! Great-circle distance
//!
//! Uses the spherical law of cosines. It is evaluated once per tracked object per
//! subscriber on every refresh, so it stays allocation-free.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the globe, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    /// Longitude, -180..=180
    pub longitude: f64,
    /// Latitude, -90..=90
    pub latitude: f64,
}

impl Coordinates {
    /// Create coordinates from longitude and latitude in degrees
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Whether both components are finite and inside geographic ranges
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }

    /// Azimuth (phi) and colatitude (theta) in radians
    #[inline]
    fn spherical(&self) -> (f64, f64) {
        (
            self.longitude.to_radians(),
            (90.0 - self.latitude).to_radians(),
        )
    }
}

/// Central angle between two points, in radians
#[inline]
fn central_angle(a: &Coordinates, b: &Coordinates) -> f64 {
    let (phi1, theta1) = a.spherical();
    let (phi2, theta2) = b.spherical();

    let cos_angle =
        theta1.sin() * theta2.sin() * (phi1 - phi2).cos() + theta1.cos() * theta2.cos();

    // Rounding can push the dot product just outside acos' domain
    cos_angle.clamp(-1.0, 1.0).acos()
}

/// Distance in kilometres between two points along the surface
#[inline]
pub fn orthodromic_distance(a: &Coordinates, b: &Coordinates) -> f64 {
    central_angle(a, b) * EARTH_RADIUS_KM
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    const TOLERANCE: f64 = 0.001; // 1 metre

    fn assert_distance(a: Coordinates, b: Coordinates, expected: f64, tolerance: f64) {
        let distance = orthodromic_distance(&a, &b);
        assert!(
            (distance - expected).abs() < tolerance,
            "distance {a:?} -> {b:?} = {distance}, expected {expected}"
        );
    }

    #[test]
    fn test_identical_points() {
        for c in [
            Coordinates::new(0.0, 0.0),
            Coordinates::new(37.62043, 55.754052),
            Coordinates::new(-179.9, -89.9),
            Coordinates::new(180.0, 90.0),
        ] {
            let distance = orthodromic_distance(&c, &c);
            assert!(!distance.is_nan());
            assert!(distance.abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_poles_are_antipodal() {
        let half_circumference = EARTH_RADIUS_KM * PI;
        assert_distance(
            Coordinates::new(0.0, 90.0),
            Coordinates::new(0.0, -90.0),
            half_circumference,
            TOLERANCE,
        );
        // Longitude has no effect at the poles
        assert_distance(
            Coordinates::new(78.0, 90.0),
            Coordinates::new(32.0, -90.0),
            half_circumference,
            TOLERANCE,
        );
    }

    #[test]
    fn test_antipodal_on_equator() {
        assert_distance(
            Coordinates::new(0.0, 0.0),
            Coordinates::new(180.0, 0.0),
            EARTH_RADIUS_KM * PI,
            TOLERANCE,
        );
    }

    #[test]
    fn test_degrees_along_equator() {
        let one_degree = EARTH_RADIUS_KM * PI / 180.0;
        assert_distance(
            Coordinates::new(0.0, 0.0),
            Coordinates::new(1.0, 0.0),
            one_degree,
            TOLERANCE,
        );
        // Across the antimeridian
        assert_distance(
            Coordinates::new(-179.0, 0.0),
            Coordinates::new(179.0, 0.0),
            2.0 * one_degree,
            TOLERANCE,
        );
    }

    #[test]
    fn test_over_the_pole() {
        assert_distance(
            Coordinates::new(-90.0, 89.0),
            Coordinates::new(90.0, 89.0),
            EARTH_RADIUS_KM * PI / 90.0,
            TOLERANCE,
        );
    }

    #[test]
    fn test_moscow_to_saint_petersburg() {
        assert_distance(
            Coordinates::new(37.620430, 55.754052),
            Coordinates::new(30.315365, 59.938960),
            634.4,
            1.0,
        );
    }

    #[test]
    fn test_quarter_meridian() {
        assert_distance(
            Coordinates::new(0.0, 0.0),
            Coordinates::new(0.0, 90.0),
            EARTH_RADIUS_KM * PI / 2.0,
            TOLERANCE,
        );
    }

    #[test]
    fn test_symmetry() {
        let points = [
            Coordinates::new(0.0, 0.0),
            Coordinates::new(13.4, 52.52),
            Coordinates::new(2.35, 48.86),
            Coordinates::new(-122.42, 37.77),
            Coordinates::new(151.21, -33.87),
            Coordinates::new(180.0, -90.0),
        ];

        for a in &points {
            for b in &points {
                let forward = orthodromic_distance(a, b);
                let backward = orthodromic_distance(b, a);
                assert!((forward - backward).abs() < 1e-9, "{a:?} <-> {b:?}");
            }
        }
    }

    #[test]
    fn test_coordinates_validity() {
        assert!(Coordinates::new(180.0, -90.0).is_valid());
        assert!(!Coordinates::new(180.1, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, 91.0).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }
}
