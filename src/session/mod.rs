//! Subscriber sessions
//!
//! Each connection runs one [`SubscriberSession`]:
//!
//! ```text
//!   Connecting ──filter──► Registered ──(peer closed | unsubscribe | error | server close)──► Closing ──► Closed
//!                              │
//!                              └─ forwards slot deliveries to the transport
//! ```
//!
//! The session only ever touches its own delivery slot and its own transport.

pub mod state;
pub mod subscriber;

pub use state::{SessionPhase, SessionState};
pub use subscriber::{EndReason, SubscriberSession, DEFAULT_FILTER_TIMEOUT};
