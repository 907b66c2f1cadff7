//! WebSocket transport
//!
//! JSON text frames over tokio-tungstenite. Ping/pong is answered by tungstenite
//! itself; binary frames are accepted if they hold JSON.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use super::message::{ClientMessage, ServerMessage};
use super::Transport;
use crate::error::ProtocolError;

/// Server side of a subscriber's WebSocket connection
pub struct WebSocketTransport<S> {
    ws: WebSocketStream<S>,
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Perform the server handshake on an accepted stream
    pub async fn accept(stream: S) -> Result<Self, ProtocolError> {
        let ws = tokio_tungstenite::accept_async(stream).await?;
        Ok(Self { ws })
    }

    /// Wrap an already upgraded stream
    pub fn from_stream(ws: WebSocketStream<S>) -> Self {
        Self { ws }
    }
}

impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Option<Result<ClientMessage, ProtocolError>> {
        loop {
            let frame = match self.ws.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e.into())),
            };

            match frame {
                Message::Text(text) => return Some(ClientMessage::parse(&text)),
                Message::Binary(data) => {
                    return Some(serde_json::from_slice(&data).map_err(ProtocolError::from))
                }
                Message::Close(_) => return None,
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn send(&mut self, msg: &ServerMessage) -> Result<(), ProtocolError> {
        let text = msg.to_json()?;
        self.ws.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            tracing::trace!(error = %e, "WebSocket close failed");
        }
    }
}
