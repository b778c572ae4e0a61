//! Event bus with synchronous pub/sub for Hearth
//!
//! This crate provides the EventBus, the central message broker of the
//! hub. Listeners subscribe with a callback keyed by event type; firing
//! an event dispatches to every matching listener synchronously, in
//! subscription order, on the firing thread. The tracking layer relies
//! on this ordering to implement its one-shot and rollback guards.

mod clock;

pub use clock::Clock;

use dashmap::DashMap;
use hearth_core::{Context, Event, EventData, EventType};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, trace};

/// A unique identifier for an event listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerCallback = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Clone)]
struct ListenerEntry {
    id: ListenerId,
    callback: ListenerCallback,
}

/// The event bus for publishing and subscribing to events
///
/// One failing listener never prevents the remaining listeners from
/// seeing the same event: each dispatch is isolated and a panicking
/// callback is logged and skipped.
pub struct EventBus {
    /// Map of event types to their listeners, in subscription order
    listeners: DashMap<EventType, Vec<ListenerEntry>>,
    /// Counter for generating unique listener IDs
    next_listener_id: AtomicU64,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to events of a specific type
    ///
    /// The callback runs synchronously on the firing thread for every
    /// event of the given type. Returns a [`Subscription`] whose
    /// `cancel` removes the listener; cancelling twice is a no-op.
    pub fn listen(
        self: &Arc<Self>,
        event_type: impl Into<EventType>,
        callback: impl Fn(&Event) + Send + Sync + 'static,
    ) -> Subscription {
        let event_type = event_type.into();
        trace!(event_type = %event_type, "subscribing listener");

        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .entry(event_type.clone())
            .or_default()
            .push(ListenerEntry {
                id,
                callback: Arc::new(callback),
            });

        Subscription {
            bus: Arc::downgrade(self),
            event_type,
            id,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Subscribe to events of a specific typed payload
    ///
    /// Events whose data does not deserialize to `T` are skipped.
    pub fn listen_typed<T>(
        self: &Arc<Self>,
        callback: impl Fn(&Event<T>) + Send + Sync + 'static,
    ) -> Subscription
    where
        T: EventData + serde::de::DeserializeOwned,
    {
        self.listen(T::event_type(), move |event| {
            match serde_json::from_value::<T>(event.data.clone()) {
                Ok(data) => callback(&Event {
                    event_type: event.event_type.clone(),
                    data,
                    time_fired: event.time_fired,
                    context: event.context.clone(),
                }),
                Err(err) => {
                    trace!(event_type = %event.event_type, %err, "skipping undecodable event")
                }
            }
        })
    }

    /// Fire an event to all subscribers of its type
    ///
    /// Dispatch is synchronous and in subscription order. Listener
    /// additions and removals performed from within a callback take
    /// effect for the next fired event, not the one being dispatched.
    pub fn fire(&self, event: Event) {
        debug!(event_type = %event.event_type, "firing event");

        // Snapshot so listeners can (un)subscribe re-entrantly without
        // holding the table entry across dispatch.
        let Some(entries) = self
            .listeners
            .get(&event.event_type)
            .map(|entry| entry.value().clone())
        else {
            return;
        };

        for entry in entries {
            if catch_unwind(AssertUnwindSafe(|| (entry.callback)(&event))).is_err() {
                error!(
                    event_type = %event.event_type,
                    listener_id = entry.id.0,
                    "listener panicked while dispatching event"
                );
            }
        }
    }

    /// Fire a typed event
    pub fn fire_typed<T: EventData + serde::Serialize>(&self, data: T, context: Context) {
        let json_data = serde_json::to_value(&data).unwrap_or_default();
        self.fire(Event::new(T::event_type(), json_data, context));
    }

    /// Get the number of listeners registered for an event type
    pub fn listener_count(&self, event_type: impl Into<EventType>) -> usize {
        self.listeners
            .get(&event_type.into())
            .map_or(0, |entry| entry.len())
    }

    fn remove_listener(&self, event_type: &EventType, id: ListenerId) {
        let Some(mut entry) = self.listeners.get_mut(event_type) else {
            return;
        };
        entry.retain(|listener| listener.id != id);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a registered listener
///
/// Cancelling removes the listener from the bus; it is idempotent and
/// safe to call from within the listener's own callback. A subscription
/// does not keep the bus alive and does nothing once the bus is gone.
pub struct Subscription {
    bus: Weak<EventBus>,
    event_type: EventType,
    id: ListenerId,
    cancelled: AtomicBool,
}

impl Subscription {
    /// Remove the listener from the bus
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.remove_listener(&self.event_type, self.id);
        }
    }
}

/// Thread-safe shared handle to the event bus
pub type SharedEventBus = Arc<EventBus>;
