//! Change notifications.
//!
//! After every mutation the façade hands an [`UpdateEvent`] to an
//! [`EventSink`]. The sink decides how the event reaches listeners; the
//! store itself never knows about a transport.
//!
//! [`EventBus`] is the stock sink: a publish/subscribe channel built on
//! [`tokio::sync::broadcast`]. Events are wrapped in [`Arc`] so fan-out to
//! several listeners does not clone the payload.
//!
//! # Usage
//!
//! ```rust
//! # use datastore_core::notify::{EventBus, EventSink, UpdateEvent};
//! let bus = EventBus::new(64);
//! let mut rx = bus.subscribe();
//!
//! bus.updated(&UpdateEvent::deleted(7));
//!
//! let event = rx.try_recv().unwrap();
//! assert!(event.deleted);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::Uid;

/// What changed on one object.
///
/// `data_changed` and `deleted` are never both set. A properties update
/// sets neither, and `properties_changed` is always sent empty: listeners
/// re-read the properties they care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub uid: Uid,
    pub data_changed: bool,
    pub properties_changed: BTreeMap<String, String>,
    pub deleted: bool,
}

impl UpdateEvent {
    /// The blob of `uid` was written (creation or `set_data`).
    pub fn data_changed(uid: Uid) -> Self {
        Self {
            uid,
            data_changed: true,
            properties_changed: BTreeMap::new(),
            deleted: false,
        }
    }

    /// Properties of `uid` were written.
    pub fn properties_changed(uid: Uid) -> Self {
        Self {
            uid,
            data_changed: false,
            properties_changed: BTreeMap::new(),
            deleted: false,
        }
    }

    /// `uid` was removed.
    pub fn deleted(uid: Uid) -> Self {
        Self {
            uid,
            data_changed: false,
            properties_changed: BTreeMap::new(),
            deleted: true,
        }
    }
}

/// Receives one call per successful mutation, in order.
///
/// Called synchronously from the mutating operation after its statements
/// have committed. Implementations must not call back into the store.
pub trait EventSink: Send + Sync {
    fn updated(&self, event: &UpdateEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn updated(&self, event: &UpdateEvent) {
        (**self).updated(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn updated(&self, _event: &UpdateEvent) {}
}

// ---------------------------------------------------------------------------
// Event bus
// ---------------------------------------------------------------------------

/// Broadcast sink delivering [`Arc<UpdateEvent>`] to every subscriber.
///
/// Cheaply cloneable; all clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<UpdateEvent>>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    ///
    /// A subscriber that falls more than `capacity` events behind gets
    /// [`broadcast::error::RecvError::Lagged`] on its next receive.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event, returning how many subscribers will see it.
    ///
    /// With nobody subscribed the event is dropped and `0` is returned.
    pub fn publish(&self, event: UpdateEvent) -> usize {
        match self.sender.send(Arc::new(event)) {
            Ok(n) => {
                tracing::trace!(receivers = n, "update event published");
                n
            }
            Err(_) => {
                tracing::trace!("update event published but no active receivers");
                0
            }
        }
    }

    /// Subscribe to all future events. Earlier events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<UpdateEvent>> {
        self.sender.subscribe()
    }

    /// Current number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for EventBus {
    fn updated(&self, event: &UpdateEvent) {
        self.publish(event.clone());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
