//! Subscriber entry and handle types
//!
//! A [`Subscriber`] is what the registry stores and the engine visits. A
//! [`SubscriberHandle`] is what the owning session keeps; dropping it deregisters.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::filter::SubscriberFilter;
use super::slot::{Delivery, DeliveryReceiver, DeliverySlot, Offer};
use super::store::SubscriberRegistry;

/// Unique subscriber identity
///
/// Allocated from a 64-bit counter and never reused. At one registration per
/// nanosecond the counter lasts over 500 years, so wraparound is not handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(crate) u64);

impl SubscriberId {
    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered subscriber as seen by the broadcast engine
///
/// Cheap to clone: the slot is reference-counted.
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// Identity
    pub id: SubscriberId,
    /// Spatial filter
    pub filter: SubscriberFilter,
    /// When the subscriber registered
    pub registered_at: Instant,
    /// Producer side of the delivery slot
    pub(super) slot: DeliverySlot,
}

impl Subscriber {
    /// Offer a result to this subscriber without blocking
    pub fn deliver(&self, delivery: Delivery) -> Offer {
        self.slot.offer(delivery)
    }

    /// Whether the delivery slot is closed
    pub fn is_closed(&self) -> bool {
        self.slot.is_closed()
    }
}

/// Session-side ownership of a registration
///
/// Deregisters from the registry when dropped, whatever the reason the session
/// ended.
pub struct SubscriberHandle {
    id: SubscriberId,
    filter: SubscriberFilter,
    slot: DeliverySlot,
    receiver: DeliveryReceiver,
    registry: Arc<SubscriberRegistry>,
}

impl SubscriberHandle {
    pub(super) fn new(
        id: SubscriberId,
        filter: SubscriberFilter,
        slot: DeliverySlot,
        receiver: DeliveryReceiver,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            id,
            filter,
            slot,
            receiver,
            registry,
        }
    }

    /// Subscriber identity
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Subscriber filter
    pub fn filter(&self) -> &SubscriberFilter {
        &self.filter
    }

    /// Wait for the next result; `None` once the registry closed this subscriber
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }

    /// Take a pending result without waiting
    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.receiver.try_recv()
    }

    /// Push a result into this subscriber's own slot
    ///
    /// Used for the current-state read at registration. Goes through the same
    /// ordering rules as engine deliveries.
    pub fn offer(&self, delivery: Delivery) -> Offer {
        self.slot.offer(delivery)
    }

    /// Remove the registration now instead of on drop
    pub fn deregister(self) {
        drop(self);
    }
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .finish()
    }
}

impl Drop for SubscriberHandle {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
