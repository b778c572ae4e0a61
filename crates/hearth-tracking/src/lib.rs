//! Event and time tracking helpers for Hearth
//!
//! This crate turns the hub's two raw event streams (state_changed and
//! the clock's time_changed tick) into narrow, per-listener callback
//! firings:
//!
//! - [`track_state_change`]: state transitions filtered by entity set
//!   and from/to state
//! - [`track_point_in_utc_time`] / [`track_point_in_time`] /
//!   [`call_later`]: the one-shot scheduling primitive
//! - [`track_time_interval`]: repeating timer built by re-arming the
//!   one-shot primitive
//! - [`track_utc_time_change`] / [`track_time_change`]: cron-like
//!   hour/minute/second pattern firing
//! - [`track_sunrise`] / [`track_sunset`]: astronomical events via a
//!   [`SunEventCalculator`]
//! - [`track_same_state`]: fire only if a condition holds continuously
//!   for a duration
//! - [`track_template_result`] / [`track_template`]: re-evaluate a
//!   template as its dynamic dependency set changes, notifying on value
//!   changes only
//!
//! Every tracker takes the event bus explicitly and returns a
//! [`CancelHandle`]; cancellation is idempotent and safe from within
//! the tracker's own callback.

mod cancel;
mod interval;
mod pattern;
mod point_in_time;
mod same_state;
mod state_change;
mod state_match;
mod sun;
mod sync;
mod template;
mod threadsafe;

pub use cancel::CancelHandle;
pub use interval::track_time_interval;
pub use pattern::{
    track_time_change, track_utc_time_change, TimePattern, TimePatternError,
};
pub use point_in_time::{call_later, track_point_in_time, track_point_in_utc_time};
pub use same_state::track_same_state;
pub use state_change::{track_state_change, EntityIds};
pub use state_match::StateMatch;
pub use sun::{track_sunrise, track_sunset, SunEvent, SunEventCalculator};
pub use template::{track_template, track_template_result, TrackTemplateResult, TrackTemplateResultInfo};
pub use threadsafe::register_blocking;
