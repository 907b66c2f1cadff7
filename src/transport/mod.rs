//! Subscriber transports
//!
//! A transport is one subscriber's bidirectional message connection. The session
//! reads the filter from it, then pushes results while watching for the peer to
//! leave.

pub mod message;
pub mod websocket;

use std::future::Future;

use crate::error::ProtocolError;

pub use message::{ClientAction, ClientMessage, FilterMessage, ServerMessage};
pub use websocket::WebSocketTransport;

/// One subscriber's connection
///
/// `recv` must be cancel-safe: the session races it against result delivery and
/// drops it whenever a result arrives first.
pub trait Transport: Send {
    /// Next client message; `None` once the peer has closed the connection
    fn recv(&mut self) -> impl Future<Output = Option<Result<ClientMessage, ProtocolError>>> + Send;

    /// Push one result to the client
    fn send(
        &mut self,
        msg: &ServerMessage,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Close the connection, ignoring errors
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
