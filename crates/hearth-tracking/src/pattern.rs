//! Cron-like hour/minute/second pattern tracking
//!
//! Unlike the interval trackers this is not built on the one-shot
//! primitive: it subscribes to the tick stream directly so it can
//! re-evaluate its compound condition on every tick and survive a
//! system clock rollback, which a single armed target instant cannot.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use hearth_bus::SharedEventBus;
use hearth_core::events::TimeChangedData;
use thiserror::Error;
use tracing::debug;

use crate::cancel::CancelHandle;
use crate::sync::lock;

/// Error building a time pattern match set
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimePatternError {
    #[error("time pattern value {value} out of range {min}..={max}")]
    OutOfRange { value: u32, min: u32, max: u32 },

    #[error("time pattern match set is empty")]
    Empty,
}

/// One field of an hour/minute/second filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimePattern {
    /// Matches every value in the field's range
    Any,
    /// Matches a single value
    Single(u32),
    /// Matches any value in the collection
    Multiple(Vec<u32>),
}

impl TimePattern {
    fn is_any(&self) -> bool {
        matches!(self, TimePattern::Any)
    }

    /// Expand to a sorted, deduplicated match set over `min..=max`
    fn expand(&self, min: u32, max: u32) -> Result<Vec<u32>, TimePatternError> {
        let mut values = match self {
            TimePattern::Any => (min..=max).collect::<Vec<_>>(),
            TimePattern::Single(value) => vec![*value],
            TimePattern::Multiple(values) => values.clone(),
        };
        if values.is_empty() {
            return Err(TimePatternError::Empty);
        }
        for &value in &values {
            if value < min || value > max {
                return Err(TimePatternError::OutOfRange { value, min, max });
            }
        }
        values.sort_unstable();
        values.dedup();
        Ok(values)
    }
}

impl From<u32> for TimePattern {
    fn from(value: u32) -> Self {
        TimePattern::Single(value)
    }
}

impl From<Vec<u32>> for TimePattern {
    fn from(values: Vec<u32>) -> Self {
        TimePattern::Multiple(values)
    }
}

impl From<Option<u32>> for TimePattern {
    fn from(value: Option<u32>) -> Self {
        value.map_or(TimePattern::Any, TimePattern::Single)
    }
}

/// Concrete sorted match sets for hour, minute and second
#[derive(Debug, Clone)]
struct TimeExpression {
    hours: Vec<u32>,
    minutes: Vec<u32>,
    seconds: Vec<u32>,
}

impl TimeExpression {
    fn parse(
        hour: &TimePattern,
        minute: &TimePattern,
        second: &TimePattern,
    ) -> Result<Self, TimePatternError> {
        Ok(Self {
            hours: hour.expand(0, 23)?,
            minutes: minute.expand(0, 59)?,
            seconds: second.expand(0, 59)?,
        })
    }

    /// The soonest wall-clock instant at or after `after` whose hour,
    /// minute and second all belong to the match sets.
    ///
    /// Carry logic: when a field has no match at or after the current
    /// value, it wraps to its first match and bumps the next coarser
    /// field; finer fields reset to their first match whenever a
    /// coarser field moves.
    fn next_after(&self, after: NaiveDateTime) -> NaiveDateTime {
        let mut date = after.date();
        let mut hour = after.hour();
        let mut minute = after.minute();
        let mut second = after.second();

        match lower_bound(&self.seconds, second) {
            Some(s) => second = s,
            None => {
                second = self.seconds[0];
                minute += 1; // may overflow to 60; the minute bound below carries it
            }
        }

        match lower_bound(&self.minutes, minute) {
            Some(m) => {
                if m != minute {
                    second = self.seconds[0];
                }
                minute = m;
            }
            None => {
                second = self.seconds[0];
                minute = self.minutes[0];
                hour += 1;
            }
        }

        match lower_bound(&self.hours, hour) {
            Some(h) => {
                if h != hour {
                    second = self.seconds[0];
                    minute = self.minutes[0];
                }
                hour = h;
            }
            None => {
                second = self.seconds[0];
                minute = self.minutes[0];
                hour = self.hours[0];
                date = next_day(date);
            }
        }

        date.and_hms_opt(hour, minute, second).unwrap_or(after)
    }
}

fn lower_bound(sorted: &[u32], value: u32) -> Option<u32> {
    sorted.iter().copied().find(|&v| v >= value)
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

/// Compute the next matching instant, in UTC or local wall time
fn calculate_next(expression: &TimeExpression, now: DateTime<Utc>, local: bool) -> DateTime<Utc> {
    if !local {
        return Utc.from_utc_datetime(&expression.next_after(now.naive_utc()));
    }

    let next_naive = expression.next_after(now.with_timezone(&Local).naive_local());
    match Local.from_local_datetime(&next_naive) {
        chrono::LocalResult::Single(next) => next.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // The matching wall time falls in a DST gap; skip past it.
        chrono::LocalResult::None => Local
            .from_local_datetime(&(next_naive + Duration::hours(1)))
            .earliest()
            .map_or(now + Duration::hours(1), |next| next.with_timezone(&Utc)),
    }
}

#[derive(Debug)]
struct PatternState {
    /// Next matching instant; computed lazily from the first tick
    next_time: Option<DateTime<Utc>>,
    /// Timestamp of the previous tick, for rollback detection
    last_now: Option<DateTime<Utc>>,
}

struct PatternTracker {
    expression: TimeExpression,
    local: bool,
    action: Box<dyn Fn(DateTime<Utc>) + Send + Sync>,
    state: Mutex<PatternState>,
}

impl PatternTracker {
    fn on_tick(&self, now: DateTime<Utc>) {
        let fire = {
            let mut state = lock(&self.state);

            let rolled_back = state.last_now.is_some_and(|last| now < last);
            if rolled_back {
                debug!(%now, "clock rollback detected, recomputing next fire time");
            }
            state.last_now = Some(now);

            if rolled_back || state.next_time.is_none() {
                state.next_time = Some(calculate_next(&self.expression, now, self.local));
            }

            // next_time was just populated above when missing
            if state.next_time.is_some_and(|next| now >= next) {
                // Recompute from one second past the fire to avoid
                // matching the same instant again; seconds are the
                // finest granularity the pattern supports.
                state.next_time = Some(calculate_next(
                    &self.expression,
                    now + Duration::seconds(1),
                    self.local,
                ));
                true
            } else {
                false
            }
        };

        if fire {
            (self.action)(now);
        }
    }
}

/// Add a listener that fires every time the UTC (or local) time matches
/// the hour/minute/second pattern
///
/// A field given as [`TimePattern::Any`] matches its whole range; when
/// all three fields are `Any` the listener degrades to firing on every
/// clock tick with no pattern matching at all.
pub fn track_utc_time_change(
    bus: &SharedEventBus,
    action: impl Fn(DateTime<Utc>) + Send + Sync + 'static,
    hour: impl Into<TimePattern>,
    minute: impl Into<TimePattern>,
    second: impl Into<TimePattern>,
    local: bool,
) -> Result<CancelHandle, TimePatternError> {
    let hour = hour.into();
    let minute = minute.into();
    let second = second.into();

    if hour.is_any() && minute.is_any() && second.is_any() {
        let subscription = bus.listen_typed::<TimeChangedData>(move |event| action(event.data.now));
        return Ok(CancelHandle::from_subscription(subscription));
    }

    let tracker = Arc::new(PatternTracker {
        expression: TimeExpression::parse(&hour, &minute, &second)?,
        local,
        action: Box::new(action),
        state: Mutex::new(PatternState {
            next_time: None,
            last_now: None,
        }),
    });

    let subscription = bus.listen_typed::<TimeChangedData>(move |event| tracker.on_tick(event.data.now));
    Ok(CancelHandle::from_subscription(subscription))
}

/// Add a listener that fires every time the local time matches the
/// hour/minute/second pattern
///
/// The action is passed the firing tick converted to local time.
pub fn track_time_change(
    bus: &SharedEventBus,
    action: impl Fn(DateTime<Local>) + Send + Sync + 'static,
    hour: impl Into<TimePattern>,
    minute: impl Into<TimePattern>,
    second: impl Into<TimePattern>,
) -> Result<CancelHandle, TimePatternError> {
    track_utc_time_change(
        bus,
        move |utc_now| action(utc_now.with_timezone(&Local)),
        hour,
        minute,
        second,
        true,
    )
}
