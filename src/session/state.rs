//! Session state machine
//!
//! Tracks a subscriber session from connection to teardown.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::registry::{SubscriberFilter, SubscriberId};

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Transport open, waiting for the filter
    Connecting,
    /// Filter accepted and registered; forwarding results
    Registered,
    /// Deregistered, transport being closed
    Closing,
    /// Session finished
    Closed,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Connection id assigned by the listener
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Time the filter was registered
    pub registered_at: Option<Instant>,

    /// Registry identity (once registered)
    pub subscriber_id: Option<SubscriberId>,

    /// Filter (once registered)
    pub filter: Option<SubscriberFilter>,

    /// Results written to the transport
    pub results_sent: u64,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Connecting,
            connected_at: Instant::now(),
            registered_at: None,
            subscriber_id: None,
            filter: None,
            results_sent: 0,
        }
    }

    /// Record a successful registration
    pub fn on_registered(&mut self, subscriber_id: SubscriberId, filter: SubscriberFilter) {
        if self.phase == SessionPhase::Connecting {
            self.phase = SessionPhase::Registered;
            self.registered_at = Some(Instant::now());
            self.subscriber_id = Some(subscriber_id);
            self.filter = Some(filter);
        }
    }

    /// Count a result written to the transport
    pub fn on_result_sent(&mut self) {
        self.results_sent += 1;
    }

    /// Start closing the session
    pub fn close(&mut self) {
        if self.phase != SessionPhase::Closed {
            self.phase = SessionPhase::Closing;
        }
    }

    /// Mark the session as finished
    pub fn finish(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Check if session is registered
    pub fn is_registered(&self) -> bool {
        self.phase == SessionPhase::Registered
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
