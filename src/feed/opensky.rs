//! OpenSky Network feed
//!
//! Polls the `states/all` endpoint and decodes each state vector into a
//! [`TrackedObject`]. Aircraft without a reported position are skipped.
//!
//! Response layout (see the OpenSky REST API docs):
//!
//! ```text
//! { "time": 1700000000,
//!   "states": [ [icao24, callsign, origin_country, time_position, last_contact,
//!                longitude, latitude, ...], ... ] }
//! ```

use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

use super::Feed;
use crate::error::FeedError;
use crate::geo::Coordinates;
use crate::snapshot::TrackedObject;

/// Default endpoint for all current state vectors
pub const ALL_STATES_URL: &str = "https://opensky-network.org/api/states/all";

// Field positions inside a state vector
const ICAO24_INDEX: usize = 0;
const CALLSIGN_INDEX: usize = 1;
const ORIGIN_COUNTRY_INDEX: usize = 2;
const LONGITUDE_INDEX: usize = 5;
const LATITUDE_INDEX: usize = 6;

const MIN_STATE_LEN: usize = LATITUDE_INDEX + 1;

/// OpenSky feed configuration
#[derive(Debug, Clone)]
pub struct OpenSkyConfig {
    /// Endpoint URL
    pub url: String,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for OpenSkyConfig {
    fn default() -> Self {
        Self {
            url: ALL_STATES_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl OpenSkyConfig {
    /// Set the endpoint URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Feed backed by the OpenSky REST API
#[derive(Debug, Clone)]
pub struct OpenSkyFeed {
    config: OpenSkyConfig,
    client: reqwest::Client,
}

impl OpenSkyFeed {
    /// Create a feed for the default endpoint
    pub fn new() -> Result<Self, FeedError> {
        Self::with_config(OpenSkyConfig::default())
    }

    /// Create a feed with custom configuration
    pub fn with_config(config: OpenSkyConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FeedError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Endpoint this feed polls
    pub fn url(&self) -> &str {
        &self.config.url
    }

    async fn get(&self) -> Result<Bytes, FeedError> {
        let response = self.client.get(&self.config.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?)
    }
}

impl Feed for OpenSkyFeed {
    async fn fetch_all(&self) -> Result<Vec<TrackedObject>, FeedError> {
        let body = self.get().await?;
        let objects = decode_states(&body)?;

        tracing::debug!(
            url = %self.config.url,
            bytes = body.len(),
            objects = objects.len(),
            "OpenSky states decoded"
        );

        Ok(objects)
    }
}

#[derive(Debug, Deserialize)]
struct StatesResponse {
    #[serde(default)]
    states: Option<Vec<Vec<Value>>>,
}

/// Decode an OpenSky `states/all` body
///
/// Only a body that is not a JSON object of the expected shape is an error.
/// Individual state vectors that are too short or lack a position are skipped.
pub fn decode_states(body: &[u8]) -> Result<Vec<TrackedObject>, FeedError> {
    let response: StatesResponse = serde_json::from_slice(body)?;
    let states = response.states.unwrap_or_default();

    let mut objects = Vec::with_capacity(states.len());
    let mut skipped = 0usize;

    for state in &states {
        match decode_state(state) {
            Some(object) => objects.push(object),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(
            decoded = objects.len(),
            skipped = skipped,
            "Skipped state vectors without position"
        );
    }

    Ok(objects)
}

fn decode_state(state: &[Value]) -> Option<TrackedObject> {
    if state.len() < MIN_STATE_LEN {
        tracing::trace!(len = state.len(), "State vector too short");
        return None;
    }

    let longitude = state[LONGITUDE_INDEX].as_f64()?;
    let latitude = state[LATITUDE_INDEX].as_f64()?;

    let text = |index: usize| state[index].as_str().unwrap_or_default().trim().to_string();

    Some(TrackedObject::new(
        text(ICAO24_INDEX),
        text(CALLSIGN_INDEX),
        text(ORIGIN_COUNTRY_INDEX),
        Coordinates::new(longitude, latitude),
    ))
}
