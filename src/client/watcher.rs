//! Count watcher
//!
//! Connects to a locator server, sends a filter and yields results.
//!
//! # Example
//! ```no_run
//! use locator_rs::client::{Watcher, WatcherConfig};
//!
//! # async fn example() -> Result<(), locator_rs::error::ProtocolError> {
//! let config = WatcherConfig::new("ws://localhost:8080/", 37.62, 55.75, 100.0);
//! let mut watcher = Watcher::connect(&config).await?;
//!
//! while let Some(count) = watcher.next_count().await {
//!     println!("{}", count?);
//! }
//! # Ok(())
//! # }
//! ```

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::ProtocolError;
use crate::transport::{ClientAction, ClientMessage, FilterMessage, ServerMessage};

/// Watcher configuration
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Server URL, e.g. `ws://localhost:8080/`
    pub url: String,

    /// Circle to watch
    pub filter: FilterMessage,
}

impl WatcherConfig {
    /// Create a config for a circle given in degrees and kilometres
    pub fn new(url: impl Into<String>, longitude: f64, latitude: f64, radius: f64) -> Self {
        Self {
            url: url.into(),
            filter: FilterMessage {
                longitude,
                latitude,
                radius,
            },
        }
    }
}

/// A subscription to a locator server
pub struct Watcher {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Watcher {
    /// Connect and send the filter
    pub async fn connect(config: &WatcherConfig) -> Result<Self, ProtocolError> {
        let (mut ws, _response) = tokio_tungstenite::connect_async(config.url.as_str()).await?;

        let filter = serde_json::to_string(&ClientMessage::Filter(config.filter))?;
        ws.send(Message::Text(filter)).await?;

        tracing::debug!(url = %config.url, filter = ?config.filter, "Subscribed");

        Ok(Self { ws })
    }

    /// Wait for the next count
    ///
    /// Returns `None` once the server closes the connection.
    pub async fn next_count(&mut self) -> Option<Result<usize, ProtocolError>> {
        loop {
            let frame = match self.ws.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e.into())),
            };

            let parsed = match frame {
                Message::Text(text) => serde_json::from_str::<ServerMessage>(&text),
                Message::Binary(data) => serde_json::from_slice::<ServerMessage>(&data),
                Message::Close(_) => return None,
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            return Some(
                parsed
                    .map(|msg| msg.number_of_objects_in_radius)
                    .map_err(ProtocolError::from),
            );
        }
    }

    /// Ask the server to end the subscription and close
    pub async fn unsubscribe(mut self) -> Result<(), ProtocolError> {
        let command = serde_json::to_string(&ClientMessage::Command {
            action: ClientAction::Unsubscribe,
        })?;
        self.ws.send(Message::Text(command)).await?;

        // Drain until the server closes
        while let Some(frame) = self.ws.next().await {
            if frame.is_err() {
                break;
            }
        }
        Ok(())
    }
}
