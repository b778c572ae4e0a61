//! The process-wide clock source
//!
//! Publishes a time_changed event at a fixed period. Every time-based
//! tracker in the hub is driven by this single event stream rather than
//! by its own timer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hearth_core::events::TimeChangedData;
use hearth_core::Context;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::EventBus;

/// Periodic publisher of time_changed events
///
/// The tick carries wall-clock UTC, so a system clock adjustment shows
/// up as a jump (possibly backwards) in consecutive tick timestamps.
/// Consumers must tolerate that; see the pattern tracker.
pub struct Clock {
    task: JoinHandle<()>,
}

impl Clock {
    /// Start ticking on the current tokio runtime
    ///
    /// The first tick fires immediately, then once per `period`.
    pub fn start(bus: Arc<EventBus>, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                bus.fire_typed(TimeChangedData { now: Utc::now() }, Context::new());
            }
        });
        debug!(period_ms = period.as_millis() as u64, "clock started");
        Self { task }
    }

    /// Stop publishing ticks
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.task.abort();
    }
}
