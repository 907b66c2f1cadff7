//! Subscriber session
//!
//! One task per connection. The session reads the client's filter, registers it,
//! then forwards results from its delivery slot to the transport until either
//! side ends the conversation. Deregistration always happens before the
//! transport is closed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use super::state::SessionState;
use crate::error::ProtocolError;
use crate::registry::{Delivery, SubscriberFilter, SubscriberHandle, SubscriberRegistry};
use crate::snapshot::SnapshotStore;
use crate::transport::{ClientAction, ClientMessage, ServerMessage, Transport};

/// Default time allowed for the client to send its filter
pub const DEFAULT_FILTER_TIMEOUT: Duration = Duration::from_secs(10);

/// What woke the delivery loop
enum Step {
    Deliver(Option<Delivery>),
    Inbound(Option<Result<ClientMessage, ProtocolError>>),
}

/// Why a registered session ended normally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Peer closed the transport
    PeerClosed,
    /// Peer sent an unsubscribe
    Unsubscribed,
    /// Server removed the subscriber (shutdown)
    ServerClosed,
}

/// Per-connection subscriber session
pub struct SubscriberSession<T: Transport> {
    state: SessionState,
    transport: T,
    registry: Arc<SubscriberRegistry>,
    store: Arc<SnapshotStore>,
    filter_timeout: Duration,
}

impl<T: Transport> SubscriberSession<T> {
    /// Create a session over an open transport
    pub fn new(
        id: u64,
        peer_addr: SocketAddr,
        transport: T,
        registry: Arc<SubscriberRegistry>,
        store: Arc<SnapshotStore>,
    ) -> Self {
        Self {
            state: SessionState::new(id, peer_addr),
            transport,
            registry,
            store,
            filter_timeout: DEFAULT_FILTER_TIMEOUT,
        }
    }

    /// Set how long to wait for the filter
    pub fn filter_timeout(mut self, timeout: Duration) -> Self {
        self.filter_timeout = timeout;
        self
    }

    /// Session state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Run the session to completion
    ///
    /// Returns how the session ended; errors only end this session.
    pub async fn run(mut self) -> Result<EndReason, ProtocolError> {
        let result = self.serve().await;

        self.state.close();
        self.transport.close().await;
        self.state.finish();

        tracing::debug!(
            session_id = self.state.id,
            peer = %self.state.peer_addr,
            subscriber_id = ?self.state.subscriber_id,
            results_sent = self.state.results_sent,
            duration_ms = self.state.duration().as_millis() as u64,
            outcome = ?result,
            "Session finished"
        );

        result
    }

    async fn serve(&mut self) -> Result<EndReason, ProtocolError> {
        let filter = self.receive_filter().await?;

        let mut handle = self.registry.add(filter);
        self.state.on_registered(handle.id(), filter);

        self.push_current_state(&handle, &filter);

        let result = self.forward(&mut handle).await;

        // Deregister before the transport is torn down
        handle.deregister();
        result
    }

    async fn receive_filter(&mut self) -> Result<SubscriberFilter, ProtocolError> {
        let received = tokio::time::timeout(self.filter_timeout, self.transport.recv())
            .await
            .map_err(|_| ProtocolError::FilterTimeout(self.filter_timeout))?;

        match received {
            None => Err(ProtocolError::Closed),
            Some(Err(e)) => Err(e),
            Some(Ok(ClientMessage::Filter(msg))) => SubscriberFilter::try_from(msg),
            Some(Ok(ClientMessage::Command { .. })) => Err(ProtocolError::MissingFilter),
        }
    }

    /// Offer the count for the installed snapshot, if there is one
    ///
    /// Goes through the slot rather than straight to the transport, so a refresh
    /// racing with registration cannot make results go back in time.
    fn push_current_state(&self, handle: &SubscriberHandle, filter: &SubscriberFilter) {
        if let Some(measurement) = self.store.measure(|o| filter.matches(o)) {
            handle.offer(Delivery {
                generation: measurement.generation,
                count: measurement.count,
            });
        }
    }

    async fn forward(&mut self, handle: &mut SubscriberHandle) -> Result<EndReason, ProtocolError> {
        loop {
            let step = tokio::select! {
                delivery = handle.recv() => Step::Deliver(delivery),
                inbound = self.transport.recv() => Step::Inbound(inbound),
            };

            match step {
                Step::Deliver(Some(delivery)) => {
                    self.transport
                        .send(&ServerMessage::new(delivery.count))
                        .await?;
                    self.state.on_result_sent();
                }
                Step::Deliver(None) => return Ok(EndReason::ServerClosed),
                Step::Inbound(None) | Step::Inbound(Some(Err(ProtocolError::Closed))) => {
                    return Ok(EndReason::PeerClosed)
                }
                Step::Inbound(Some(Err(e))) => return Err(e),
                Step::Inbound(Some(Ok(ClientMessage::Command {
                    action: ClientAction::Unsubscribe,
                }))) => return Ok(EndReason::Unsubscribed),
                Step::Inbound(Some(Ok(ClientMessage::Filter(_)))) => {
                    tracing::warn!(
                        session_id = self.state.id,
                        subscriber_id = %handle.id(),
                        "Filter update not supported, ignoring"
                    );
                }
            }
        }
    }
}
