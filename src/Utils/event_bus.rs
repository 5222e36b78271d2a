//! # Event bus
//!
//! Typed publish/subscribe channel. Every kind of solver notification gets its own
//! `EventBus<T>`, so a subscriber only ever sees the payload type it asked for.
//!
//! ```rust
//! use RustedODE::Utils::event_bus::EventBus;
//! use std::sync::{Arc, Mutex};
//!
//! let bus: EventBus<f64> = EventBus::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let id = bus.subscribe(move |x: &f64| sink.lock().unwrap().push(*x));
//! assert_eq!(bus.publish(&0.5), 1);
//! assert!(bus.unsubscribe(id));
//! assert_eq!(bus.publish(&1.0), 0);
//! assert_eq!(*seen.lock().unwrap(), vec![0.5]);
//! ```
//!
//! Delivery is synchronous, on the publishing thread, in subscription order.
//! The subscriber list is copied before delivery, so a subscriber may subscribe,
//! unsubscribe or publish again from inside its callback. A subscriber added during
//! a delivery is not called for that event; one removed during a delivery still is.
//! A panicking subscriber is logged and skipped, the rest still receive the event.

use log::error;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// handle returned by `subscribe`, needed to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct EventBus<T> {
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber<T>)>>,
    next_id: AtomicU64,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        EventBus {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    // callbacks never run under the lock
    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Subscriber<T>)>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(callback)));
        id
    }

    /// false if the id was never issued by this bus or is already removed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    /// Delivers `event` to every current subscriber and returns how many of them
    /// handled it without panicking.
    pub fn publish(&self, event: &T) -> usize {
        let snapshot: Vec<(SubscriptionId, Subscriber<T>)> = self.lock().clone();
        let mut delivered = 0;
        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!("subscriber {:?} panicked: {}", id, reason);
                }
            }
        }
        delivered
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }
}
