//! Sunrise and sunset tracking
//!
//! The next occurrence is fetched freshly from the astronomical
//! calculator after every fire, never derived by adding 24 hours,
//! since day length varies with the season and location.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use hearth_bus::SharedEventBus;

use crate::cancel::CancelHandle;
use crate::point_in_time::track_point_in_utc_time;
use crate::sync::lock;

/// Kind of astronomical event to track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunEvent {
    Sunrise,
    Sunset,
}

/// Astronomical-event calculator collaborator
///
/// Owned elsewhere, along with the location, elevation and timezone
/// configuration it needs. Must always return a future instant;
/// trackers do not defend against a calculator stuck in the past.
pub trait SunEventCalculator: Send + Sync {
    /// The next occurrence of `kind`, shifted by `offset` if given
    fn next_event(&self, kind: SunEvent, offset: Option<Duration>) -> DateTime<Utc>;
}

struct SunTracker {
    bus: SharedEventBus,
    calculator: Arc<dyn SunEventCalculator>,
    kind: SunEvent,
    offset: Option<Duration>,
    action: Box<dyn Fn() + Send + Sync>,
    active: Mutex<Option<CancelHandle>>,
    cancelled: AtomicBool,
}

impl SunTracker {
    fn arm(self: &Arc<Self>) {
        let next = self.calculator.next_event(self.kind, self.offset);
        let tracker = Arc::clone(self);
        let handle = track_point_in_utc_time(&self.bus, move |_now| tracker.on_fire(), next);

        if self.cancelled.load(Ordering::SeqCst) {
            handle.cancel();
            return;
        }
        *lock(&self.active) = Some(handle);
    }

    fn on_fire(self: &Arc<Self>) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        self.arm();
        (self.action)();
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(handle) = lock(&self.active).take() {
            handle.cancel();
        }
    }
}

fn track_sun_event(
    bus: &SharedEventBus,
    calculator: &Arc<dyn SunEventCalculator>,
    kind: SunEvent,
    action: impl Fn() + Send + Sync + 'static,
    offset: Option<Duration>,
) -> CancelHandle {
    let tracker = Arc::new(SunTracker {
        bus: bus.clone(),
        calculator: calculator.clone(),
        kind,
        offset,
        action: Box::new(action),
        active: Mutex::new(None),
        cancelled: AtomicBool::new(false),
    });
    tracker.arm();

    CancelHandle::new(move || tracker.cancel())
}

/// Add a listener that fires daily at a specified offset from sunrise
pub fn track_sunrise(
    bus: &SharedEventBus,
    calculator: &Arc<dyn SunEventCalculator>,
    action: impl Fn() + Send + Sync + 'static,
    offset: Option<Duration>,
) -> CancelHandle {
    track_sun_event(bus, calculator, SunEvent::Sunrise, action, offset)
}

/// Add a listener that fires daily at a specified offset from sunset
pub fn track_sunset(
    bus: &SharedEventBus,
    calculator: &Arc<dyn SunEventCalculator>,
    action: impl Fn() + Send + Sync + 'static,
    offset: Option<Duration>,
) -> CancelHandle {
    track_sun_event(bus, calculator, SunEvent::Sunset, action, offset)
}
