//! Subscriber spatial filter

use crate::error::ProtocolError;
use crate::geo::{orthodromic_distance, Coordinates};
use crate::snapshot::TrackedObject;

/// A circle on the globe: center plus radius in kilometres
///
/// Fixed for the lifetime of a subscriber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubscriberFilter {
    /// Circle center
    pub center: Coordinates,
    /// Radius in kilometres, non-negative
    pub radius: f64,
}

impl SubscriberFilter {
    /// Create a validated filter
    ///
    /// Rejects out-of-range coordinates and negative or non-finite radii.
    pub fn new(center: Coordinates, radius: f64) -> Result<Self, ProtocolError> {
        if !center.is_valid() {
            return Err(ProtocolError::InvalidFilter(format!(
                "center out of range: longitude {}, latitude {}",
                center.longitude, center.latitude
            )));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(ProtocolError::InvalidFilter(format!(
                "radius must be a non-negative number, got {}",
                radius
            )));
        }

        Ok(Self { center, radius })
    }

    /// Whether a point lies inside the circle (boundary included)
    #[inline]
    pub fn contains(&self, point: &Coordinates) -> bool {
        orthodromic_distance(&self.center, point) <= self.radius
    }

    /// Whether a tracked object lies inside the circle
    #[inline]
    pub fn matches(&self, object: &TrackedObject) -> bool {
        self.contains(&object.position)
    }
}
