//! Broadcast engine
//!
//! Drives the refresh cycle: fetch a snapshot, install it, then recompute and
//! offer each subscriber's count. Runs once at startup and then on a fixed
//! interval.
//!
//! ```text
//!   tick ──► Feed::fetch_all() ──► SnapshotStore::replace()
//!                                        │
//!            SubscriberRegistry::for_each()  (copy taken, lock released)
//!                                        │
//!               per subscriber: measure(filter) ──► slot.offer()  (never waits)
//! ```
//!
//! A failed fetch changes nothing: the previous snapshot stays installed and no
//! subscriber is touched until the next successful cycle.

pub mod broadcast;
pub mod config;

pub use broadcast::{BroadcastEngine, CycleReport, EngineState};
pub use config::EngineConfig;
