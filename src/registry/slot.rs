//! Single-slot delivery channel
//!
//! Each subscriber gets one slot. The engine offers results without ever waiting;
//! the session takes whatever is pending. Only the newest result is kept, so a
//! subscriber that stops draining costs one `Delivery` of memory and nothing else.
//!
//! The slot is the only state shared by producer (engine) and consumer (session).
//! Both sides hold an `Arc` to it, so it is freed once both have let go.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// A result ready for one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Generation of the snapshot the count was computed from
    pub generation: u64,
    /// Number of objects inside the subscriber's circle
    pub count: usize,
}

/// Outcome of [`DeliverySlot::offer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Slot was empty, value stored
    Stored,
    /// An unread value was overwritten (consumer is behind)
    Replaced,
    /// Value is older than the pending or last taken one; dropped
    Stale,
    /// Slot is closed; nothing written
    Closed,
}

#[derive(Debug, Default)]
struct SlotState {
    pending: Option<Delivery>,
    /// Highest generation ever accepted; keeps deliveries ordered across snapshots
    high_water: u64,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<SlotState>,
    notify: Notify,
}

/// Producer side of a delivery slot
#[derive(Debug, Clone)]
pub struct DeliverySlot {
    shared: Arc<Shared>,
}

/// Consumer side of a delivery slot
#[derive(Debug)]
pub struct DeliveryReceiver {
    shared: Arc<Shared>,
}

/// Create a connected slot/receiver pair
pub fn slot() -> (DeliverySlot, DeliveryReceiver) {
    let shared = Arc::new(Shared::default());
    (
        DeliverySlot {
            shared: Arc::clone(&shared),
        },
        DeliveryReceiver { shared },
    )
}

impl DeliverySlot {
    /// Offer a value; never blocks on the consumer
    ///
    /// Values from a snapshot older than one already accepted are dropped, so the
    /// consumer never sees generations go backwards. Equal generations are accepted.
    pub fn offer(&self, delivery: Delivery) -> Offer {
        let outcome = {
            let mut state = self.shared.state.lock();

            if state.closed {
                return Offer::Closed;
            }
            if delivery.generation < state.high_water {
                return Offer::Stale;
            }

            state.high_water = delivery.generation;
            match state.pending.replace(delivery) {
                Some(_) => Offer::Replaced,
                None => Offer::Stored,
            }
        };

        self.shared.notify.notify_one();
        outcome
    }

    /// Close the slot
    ///
    /// Once this returns no offer will write to the slot. The consumer still gets
    /// a pending value, then `None`.
    pub fn close(&self) {
        self.shared.state.lock().closed = true;
        self.shared.notify.notify_one();
    }

    /// Whether the slot has been closed
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Whether a value is waiting to be taken
    pub fn has_pending(&self) -> bool {
        self.shared.state.lock().pending.is_some()
    }
}

impl DeliveryReceiver {
    /// Wait for the next value
    ///
    /// Returns `None` once the slot is closed and drained. Cancel-safe: a value is
    /// only removed from the slot by a call that returns it.
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            {
                let mut state = self.shared.state.lock();
                if let Some(delivery) = state.pending.take() {
                    return Some(delivery);
                }
                if state.closed {
                    return None;
                }
            }

            // notify_one leaves a permit if nobody is waiting, so a value offered
            // between the check above and this await is not lost
            self.shared.notify.notified().await;
        }
    }

    /// Take a pending value without waiting
    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.shared.state.lock().pending.take()
    }

    /// Whether the producer side has closed the slot
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }
}

impl Drop for DeliveryReceiver {
    fn drop(&mut self) {
        // Nobody will read from here again; later offers are no-ops
        let mut state = self.shared.state.lock();
        state.closed = true;
        state.pending = None;
    }
}
