//! Spherical geometry
//!
//! Everything here treats the Earth as a sphere of radius [`EARTH_RADIUS_KM`].
//! Coordinates are in degrees, distances in kilometres.

pub mod distance;

pub use distance::{orthodromic_distance, Coordinates, EARTH_RADIUS_KM};
