//! Tracked object type

use crate::geo::Coordinates;

/// A single object reported by the feed
///
/// Immutable once decoded. For the OpenSky feed the identifier is the ICAO 24-bit
/// transponder address and the label is the call sign.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    /// Stable identifier
    pub id: String,
    /// Display label
    pub label: String,
    /// Origin tag (country of registration for aircraft)
    pub origin: String,
    /// Last known position
    pub position: Coordinates,
}

impl TrackedObject {
    /// Create a new tracked object
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        origin: impl Into<String>,
        position: Coordinates,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            origin: origin.into(),
            position,
        }
    }

    /// Create an object with only an id and a position
    pub fn at(id: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self::new(id, "", "", Coordinates::new(longitude, latitude))
    }
}
