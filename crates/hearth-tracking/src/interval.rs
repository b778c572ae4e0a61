//! Repeating interval tracking

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use hearth_bus::SharedEventBus;

use crate::cancel::CancelHandle;
use crate::point_in_time::track_point_in_utc_time;
use crate::sync::lock;

/// Self-rescheduling timer built on the one-shot primitive
///
/// Each fire re-arms for `tick + interval` from the tick that fired,
/// not from the original schedule, so drift accumulates with a slow
/// tick stream. The active slot holds whichever one-shot arm is
/// currently live.
struct IntervalTracker {
    bus: SharedEventBus,
    interval: Duration,
    action: Box<dyn Fn(DateTime<Utc>) + Send + Sync>,
    active: Mutex<Option<CancelHandle>>,
    cancelled: AtomicBool,
}

impl IntervalTracker {
    fn arm(self: &Arc<Self>, fire_at: DateTime<Utc>) {
        let tracker = Arc::clone(self);
        let handle = track_point_in_utc_time(&self.bus, move |now| tracker.on_fire(now), fire_at);

        if self.cancelled.load(Ordering::SeqCst) {
            // Cancelled while the new arm was being registered
            handle.cancel();
            return;
        }
        *lock(&self.active) = Some(handle);
    }

    fn on_fire(self: &Arc<Self>, now: DateTime<Utc>) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        // Re-arm before running the action so a slow action does not
        // delay the next schedule point.
        self.arm(now + self.interval);
        (self.action)(now);
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(handle) = lock(&self.active).take() {
            handle.cancel();
        }
    }
}

/// Add a listener that fires repetitively at every `interval`
///
/// The action is passed the tick timestamp that triggered it. The
/// returned handle cancels whichever underlying one-shot arm is
/// currently active.
pub fn track_time_interval(
    bus: &SharedEventBus,
    action: impl Fn(DateTime<Utc>) + Send + Sync + 'static,
    interval: Duration,
) -> CancelHandle {
    let tracker = Arc::new(IntervalTracker {
        bus: bus.clone(),
        interval,
        action: Box::new(action),
        active: Mutex::new(None),
        cancelled: AtomicBool::new(false),
    });
    tracker.arm(Utc::now() + interval);

    CancelHandle::new(move || tracker.cancel())
}
