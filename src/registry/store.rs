//! Subscriber registry implementation
//!
//! The central index of live subscribers. Registration, removal and enumeration
//! all take one mutex, held only for map operations; results are delivered
//! after the lock is released.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::entry::{Subscriber, SubscriberHandle, SubscriberId};
use super::filter::SubscriberFilter;
use super::slot;

/// Registry of all connected subscribers
pub struct SubscriberRegistry {
    /// Map of subscriber id to entry
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,

    /// Next identity to hand out
    next_id: AtomicU64,

    /// Set by `close_all`; read and written only while holding `subscribers`
    closed: AtomicBool,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a subscriber
    ///
    /// The entry is fully built (identity, filter, delivery slot) before it is
    /// inserted, so enumeration never sees a partial subscriber.
    ///
    /// After [`close_all`](Self::close_all) the subscriber is not inserted and
    /// its slot starts closed, so the session ends as soon as it waits on it.
    pub fn add(self: &Arc<Self>, filter: SubscriberFilter) -> SubscriberHandle {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (slot, receiver) = slot::slot();

        let subscriber = Subscriber {
            id,
            filter,
            registered_at: Instant::now(),
            slot: slot.clone(),
        };

        let total = {
            let mut subscribers = self.subscribers.lock();
            if self.closed.load(Ordering::Acquire) {
                None
            } else {
                subscribers.insert(id, subscriber);
                Some(subscribers.len())
            }
        };

        let Some(total) = total else {
            slot.close();
            tracing::debug!(subscriber_id = %id, "Registry closed, subscriber not registered");
            return SubscriberHandle::new(id, filter, slot, receiver, Arc::clone(self));
        };

        tracing::info!(
            subscriber_id = %id,
            longitude = filter.center.longitude,
            latitude = filter.center.latitude,
            radius_km = filter.radius,
            subscribers = total,
            "Subscriber registered"
        );

        SubscriberHandle::new(id, filter, slot, receiver, Arc::clone(self))
    }

    /// Remove a subscriber
    ///
    /// Idempotent. When this returns, the subscriber's slot is closed and no
    /// further result will be written to it.
    pub fn remove(&self, id: SubscriberId) -> bool {
        let (removed, total) = {
            let mut subscribers = self.subscribers.lock();
            let removed = subscribers.remove(&id);
            (removed, subscribers.len())
        };

        match removed {
            Some(subscriber) => {
                subscriber.slot.close();
                tracing::info!(subscriber_id = %id, subscribers = total, "Subscriber removed");
                true
            }
            None => false,
        }
    }

    /// Visit every subscriber registered at the time of the call
    ///
    /// The set is copied under the lock and visited after releasing it, so
    /// `visit` may block or call back into the registry.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&Subscriber),
    {
        for subscriber in self.subscribers() {
            visit(&subscriber);
        }
    }

    /// Copy of the current subscriber set
    pub fn subscribers(&self) -> Vec<Subscriber> {
        self.subscribers.lock().values().cloned().collect()
    }

    /// Look up a single subscriber
    pub fn get(&self, id: SubscriberId) -> Option<Subscriber> {
        self.subscribers.lock().get(&id).cloned()
    }

    /// Whether a subscriber is registered
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Whether no subscriber is registered
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    /// Whether [`close_all`](Self::close_all) has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Remove every subscriber, closing their slots
    ///
    /// Sessions waiting on their slot wake up and end. Later registrations are
    /// refused the same way. Used on shutdown.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Subscriber> = {
            let mut subscribers = self.subscribers.lock();
            self.closed.store(true, Ordering::Release);
            subscribers.drain().map(|(_, s)| s).collect()
        };

        for subscriber in &drained {
            subscriber.slot.close();
        }

        if !drained.is_empty() {
            tracing::info!(subscribers = drained.len(), "All subscribers closed");
        }

        drained.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
