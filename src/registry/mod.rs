//! Subscriber registry
//!
//! The registry tracks connected subscribers and their delivery slots. Each slot
//! holds at most one pending result, so the broadcast engine can offer results
//! without ever waiting on a session.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SubscriberRegistry>
//!                   ┌──────────────────────────────┐
//!                   │ Mutex<HashMap<SubscriberId,  │
//!                   │   Subscriber {               │
//!                   │     filter,                  │
//!                   │     slot: DeliverySlot,      │
//!                   │   }                          │
//!                   │ >>                           │
//!                   └──────────────┬───────────────┘
//!                                  │ subscribers() (copy, lock released)
//!                                  ▼
//!   [BroadcastEngine] ── slot.offer() ──► [slot] ── handle.recv() ──► [Session] ──► WS
//! ```
//!
//! # Ownership
//!
//! The slot is the one piece of state with two owners: the engine (through the
//! `Subscriber` copy it is visiting) and the session (through its
//! `SubscriberHandle`). Removing a subscriber closes its slot, after which offers
//! are no-ops; the memory goes away when the last `Arc` does.

pub mod entry;
pub mod filter;
pub mod slot;
pub mod store;

pub use entry::{Subscriber, SubscriberHandle, SubscriberId};
pub use filter::SubscriberFilter;
pub use slot::{Delivery, DeliveryReceiver, DeliverySlot, Offer};
pub use store::SubscriberRegistry;
