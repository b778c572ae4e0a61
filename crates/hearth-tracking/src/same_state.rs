//! Continuous-condition tracking
//!
//! Fires only if the watched entities stay in a qualifying condition
//! for a full period: a one-shot timer armed for now + period, plus a
//! state-change watcher that tears everything down the moment the
//! condition is violated.

use std::sync::{Arc, Mutex};

use chrono::Duration;
use hearth_bus::SharedEventBus;
use hearth_core::{EntityId, State};

use crate::cancel::CancelHandle;
use crate::point_in_time::call_later;
use crate::state_change::{track_state_change, EntityIds};
use crate::state_match::StateMatch;
use crate::sync::lock;

struct SameStateTracker {
    timer: Mutex<Option<CancelHandle>>,
    watcher: Mutex<Option<CancelHandle>>,
}

impl SameStateTracker {
    fn clear(&self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.cancel();
        }
        if let Some(watcher) = lock(&self.watcher).take() {
            watcher.cancel();
        }
    }
}

/// Track that entities stay in a qualifying condition for `period`
///
/// The check function is re-validated on every state change observed
/// for `entity_ids`; the first transition it rejects cancels both the
/// timer and the watcher and the action never runs. If the period
/// elapses without disqualification, the watcher is cancelled and the
/// action is invoked once.
///
/// The returned handle tears down whichever of the two inner trackers
/// is still live and is safe to call after either has self-cancelled.
pub fn track_same_state(
    bus: &SharedEventBus,
    period: Duration,
    action: impl Fn() + Send + Sync + 'static,
    check_same: impl Fn(&EntityId, Option<&State>, Option<&State>) -> bool + Send + Sync + 'static,
    entity_ids: impl Into<EntityIds>,
) -> CancelHandle {
    let tracker = Arc::new(SameStateTracker {
        timer: Mutex::new(None),
        watcher: Mutex::new(None),
    });

    let on_elapsed = tracker.clone();
    let timer = call_later(bus, period, move |_now| {
        on_elapsed.clear();
        action();
    });

    let on_change = tracker.clone();
    let watcher = track_state_change(
        bus,
        entity_ids,
        move |entity_id, old_state, new_state| {
            if !check_same(entity_id, old_state, new_state) {
                on_change.clear();
            }
        },
        StateMatch::Any,
        StateMatch::Any,
    );

    *lock(&tracker.timer) = Some(timer);
    *lock(&tracker.watcher) = Some(watcher);

    CancelHandle::new(move || tracker.clear())
}
