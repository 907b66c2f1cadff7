//! Error types
//!
//! Failures are grouped by blast radius: a [`FeedError`] costs one refresh cycle,
//! a [`ProtocolError`] costs one subscriber session, and only [`Error::Bind`]
//! stops the server.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Result alias for server-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// The listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// I/O error outside of a single session
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot fetch failed
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// Subscriber protocol failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Failure to obtain a snapshot from the feed
///
/// Never fatal: the engine logs it, keeps the previous snapshot and retries on the
/// next tick.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Request could not be sent or the body could not be read
    #[error("feed request failed: {0}")]
    Http(String),

    /// The feed answered with a non-success status
    #[error("feed returned HTTP {status}")]
    Status { status: u16 },

    /// The body is not a decodable snapshot
    #[error("feed payload could not be decoded: {0}")]
    Decode(String),

    /// The fetch did not finish within the configured timeout
    #[error("feed request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        FeedError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Decode(e.to_string())
    }
}

/// Failure on one subscriber's connection
///
/// Terminates only that subscriber's session.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The underlying transport failed
    #[error("transport error: {0}")]
    Transport(String),

    /// A frame could not be parsed as a client message
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The filter parsed but is out of range
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The first message was not a filter
    #[error("expected a filter as the first message")]
    MissingFilter,

    /// The peer did not send a filter in time
    #[error("no filter received within {0:?}")]
    FilterTimeout(Duration),

    /// The peer closed the connection
    #[error("connection closed by peer")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for ProtocolError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => ProtocolError::Closed,
            other => ProtocolError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Malformed(e.to_string())
    }
}
