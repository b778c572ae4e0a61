//! One-shot point-in-time scheduling
//!
//! The fundamental time primitive: every higher-level time tracker
//! (call_later, interval, sunrise/sunset) is built by arming and
//! re-arming this one. It is driven entirely by the clock's
//! time_changed ticks rather than an independent timer.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, Utc};
use hearth_bus::{SharedEventBus, Subscription};
use hearth_core::events::TimeChangedData;

use crate::cancel::CancelHandle;
use crate::sync::lock;

/// Firing state of a one-shot listener
///
/// Checked and flipped before the subscription is removed and before
/// the action runs, so a second qualifying tick that is already in
/// flight when the first one fires is short-circuited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FireState {
    Armed,
    Fired,
}

/// Add a listener that fires once at or after a specific UTC instant
///
/// The action is passed the tick timestamp that satisfied the target.
/// A target already in the past fires on the very next tick; that
/// catch-up behavior is intended. The listener unsubscribes itself
/// after firing and fires at most once regardless of how many
/// qualifying ticks arrive.
pub fn track_point_in_utc_time(
    bus: &SharedEventBus,
    action: impl Fn(DateTime<Utc>) + Send + Sync + 'static,
    point_in_time: DateTime<Utc>,
) -> CancelHandle {
    let state = Arc::new(Mutex::new(FireState::Armed));
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    let state_in_cb = state.clone();
    let slot_in_cb = slot.clone();
    let subscription = bus.listen_typed::<TimeChangedData>(move |event| {
        let now = event.data.now;
        if now < point_in_time {
            return;
        }

        {
            let mut fire_state = lock(&state_in_cb);
            if *fire_state == FireState::Fired {
                return;
            }
            *fire_state = FireState::Fired;
        }

        if let Some(subscription) = lock(&slot_in_cb).take() {
            subscription.cancel();
        }
        action(now);
    });
    *lock(&slot) = Some(subscription);

    CancelHandle::new(move || {
        *lock(&state) = FireState::Fired;
        if let Some(subscription) = lock(&slot).take() {
            subscription.cancel();
        }
    })
}

/// Add a listener that fires once at or after a specific local instant
///
/// Scheduling is delegated to the UTC primitive; the action is passed
/// the firing time converted back to local time.
pub fn track_point_in_time(
    bus: &SharedEventBus,
    action: impl Fn(DateTime<Local>) + Send + Sync + 'static,
    point_in_time: DateTime<Local>,
) -> CancelHandle {
    track_point_in_utc_time(
        bus,
        move |utc_now| action(utc_now.with_timezone(&Local)),
        point_in_time.with_timezone(&Utc),
    )
}

/// Add a listener that fires once, `delay` from now
pub fn call_later(
    bus: &SharedEventBus,
    delay: Duration,
    action: impl Fn(DateTime<Utc>) + Send + Sync + 'static,
) -> CancelHandle {
    track_point_in_utc_time(bus, action, Utc::now() + delay)
}
