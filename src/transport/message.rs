//! Wire messages
//!
//! JSON text frames in both directions.
//!
//! Client → server, first message:
//! `{"longitude": 37.62, "latitude": 55.75, "radius": 100}`
//!
//! Client → server, later:
//! `{"action": "unsubscribe"}`
//!
//! Server → client, after each refresh:
//! `{"numberOfObjectsInRadius": 12}`

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::geo::Coordinates;
use crate::registry::SubscriberFilter;

/// Circle requested by a client, radius in kilometres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterMessage {
    pub longitude: f64,
    pub latitude: f64,
    pub radius: f64,
}

impl TryFrom<FilterMessage> for SubscriberFilter {
    type Error = ProtocolError;

    fn try_from(msg: FilterMessage) -> Result<Self, Self::Error> {
        SubscriberFilter::new(Coordinates::new(msg.longitude, msg.latitude), msg.radius)
    }
}

impl From<SubscriberFilter> for FilterMessage {
    fn from(filter: SubscriberFilter) -> Self {
        Self {
            longitude: filter.center.longitude,
            latitude: filter.center.latitude,
            radius: filter.radius,
        }
    }
}

/// Control actions a client may send after subscribing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAction {
    /// End the subscription; the server closes the connection
    Unsubscribe,
}

/// Any message a client may send
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    Filter(FilterMessage),
    Command { action: ClientAction },
}

impl ClientMessage {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

/// Result pushed to a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub number_of_objects_in_radius: usize,
}

impl ServerMessage {
    /// Create a result message
    pub fn new(count: usize) -> Self {
        Self {
            number_of_objects_in_radius: count,
        }
    }

    /// Encode as a JSON text frame
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        let msg = ClientMessage::parse(r#"{"longitude": 37.62, "latitude": 55.75, "radius": 100}"#)
            .unwrap();

        assert_eq!(
            msg,
            ClientMessage::Filter(FilterMessage {
                longitude: 37.62,
                latitude: 55.75,
                radius: 100.0,
            })
        );
    }

    #[test]
    fn test_parse_unsubscribe() {
        let msg = ClientMessage::parse(r#"{"action": "unsubscribe"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Command {
                action: ClientAction::Unsubscribe
            }
        );
    }

    #[test]
    fn test_parse_rejects_incomplete_filter() {
        let result = ClientMessage::parse(r#"{"longitude": 1.0, "latitude": 2.0}"#);
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ClientMessage::parse("hello").is_err());
        assert!(ClientMessage::parse(r#"{"action": "dance"}"#).is_err());
        assert!(
            ClientMessage::parse(r#"{"longitude": "east", "latitude": 0, "radius": 1}"#).is_err()
        );
    }

    #[test]
    fn test_filter_conversion_validates() {
        let ok = FilterMessage {
            longitude: 0.0,
            latitude: 0.0,
            radius: 1000.0,
        };
        assert!(SubscriberFilter::try_from(ok).is_ok());

        let bad = FilterMessage {
            longitude: 0.0,
            latitude: 0.0,
            radius: -5.0,
        };
        assert!(matches!(
            SubscriberFilter::try_from(bad),
            Err(ProtocolError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_server_message_json() {
        let json = ServerMessage::new(12).to_json().unwrap();
        assert_eq!(json, r#"{"numberOfObjectsInRadius":12}"#);

        let parsed: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.number_of_objects_in_radius, 12);
    }
}
