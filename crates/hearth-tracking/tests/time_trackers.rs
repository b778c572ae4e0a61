//! Time-based tracker behavior: one-shot, interval, pattern and sun

mod common;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use common::{Counter, MockSun, TestHub};
use hearth_tracking::{
    call_later, track_point_in_time, track_point_in_utc_time, track_sunrise, track_sunset,
    track_time_change, track_time_interval, track_utc_time_change, TimePattern,
};

fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
}

#[test]
fn one_shot_fires_once_at_or_after_target() {
    let hub = TestHub::new();
    let fired = Arc::new(Mutex::new(Vec::new()));

    let target = utc(12, 0, 0);
    let fired_cb = fired.clone();
    let _handle = track_point_in_utc_time(
        &hub.bus,
        move |now| fired_cb.lock().unwrap().push(now),
        target,
    );

    hub.tick(utc(11, 59, 59));
    assert!(fired.lock().unwrap().is_empty());

    // Two consecutive qualifying ticks: the guard allows exactly one fire
    hub.tick(utc(12, 0, 0));
    hub.tick(utc(12, 0, 1));

    let fired = fired.lock().unwrap();
    assert_eq!(*fired, vec![utc(12, 0, 0)]);
}

#[test]
fn one_shot_in_the_past_fires_on_next_tick() {
    let hub = TestHub::new();
    let count = Counter::new();

    let count_cb = count.clone();
    let _handle = track_point_in_utc_time(&hub.bus, move |_| count_cb.bump(), utc(6, 0, 0));

    hub.tick(utc(18, 0, 0));
    assert_eq!(count.get(), 1);
}

#[test]
fn one_shot_cancel_prevents_fire_and_is_idempotent() {
    let hub = TestHub::new();
    let count = Counter::new();

    let count_cb = count.clone();
    let handle = track_point_in_utc_time(&hub.bus, move |_| count_cb.bump(), utc(12, 0, 0));

    handle.cancel();
    handle.cancel();
    hub.tick(utc(12, 0, 0));
    assert_eq!(count.get(), 0);
}

#[test]
fn call_later_fires_after_delay() {
    let hub = TestHub::new();
    let count = Counter::new();

    let count_cb = count.clone();
    let _handle = call_later(&hub.bus, Duration::seconds(30), move |_| count_cb.bump());
    let base = Utc::now();

    hub.tick(base + Duration::seconds(10));
    assert_eq!(count.get(), 0);

    hub.tick(base + Duration::seconds(30));
    assert_eq!(count.get(), 1);
}

#[test]
fn local_one_shot_passes_local_time_to_the_action() {
    let hub = TestHub::new();
    let fired: Arc<Mutex<Vec<DateTime<Local>>>> = Arc::new(Mutex::new(Vec::new()));

    let target = utc(12, 0, 0).with_timezone(&Local);
    let fired_cb = fired.clone();
    let _handle = track_point_in_time(
        &hub.bus,
        move |now| fired_cb.lock().unwrap().push(now),
        target,
    );

    hub.tick(utc(11, 59, 59));
    assert!(fired.lock().unwrap().is_empty());
    hub.tick(utc(12, 0, 0));

    // The action sees the firing tick converted to local time
    let fired = fired.lock().unwrap();
    assert_eq!(*fired, vec![utc(12, 0, 0).with_timezone(&Local)]);
    assert_eq!(fired[0].with_timezone(&Utc), utc(12, 0, 0));
}

#[test]
fn interval_rearms_on_every_fire() {
    let hub = TestHub::new();
    let fired = Arc::new(Mutex::new(Vec::new()));

    let fired_cb = fired.clone();
    let _handle = track_time_interval(
        &hub.bus,
        move |now| fired_cb.lock().unwrap().push(now),
        Duration::seconds(5),
    );
    let base = Utc::now();

    let ticks = [
        base + Duration::seconds(5),
        base + Duration::seconds(10),
        base + Duration::seconds(15),
    ];
    for tick in ticks {
        hub.tick(tick);
    }

    // One fire per tick, each carrying the tick that triggered it
    assert_eq!(*fired.lock().unwrap(), ticks);
}

#[test]
fn interval_cancel_stops_future_fires() {
    let hub = TestHub::new();
    let count = Counter::new();

    let count_cb = count.clone();
    let handle = track_time_interval(&hub.bus, move |_| count_cb.bump(), Duration::seconds(5));
    let base = Utc::now();

    hub.tick(base + Duration::seconds(5));
    assert_eq!(count.get(), 1);

    handle.cancel();
    handle.cancel();
    hub.tick(base + Duration::seconds(10));
    hub.tick(base + Duration::seconds(15));
    assert_eq!(count.get(), 1);
}

#[test]
fn pattern_fires_at_matching_seconds() {
    let hub = TestHub::new();
    let fired = Arc::new(Mutex::new(Vec::new()));

    let fired_cb = fired.clone();
    let _handle = track_utc_time_change(
        &hub.bus,
        move |now| fired_cb.lock().unwrap().push(now),
        TimePattern::Any,
        TimePattern::Any,
        0u32,
        false,
    )
    .unwrap();

    hub.tick(utc(10, 15, 30));
    hub.tick(utc(10, 15, 45));
    hub.tick(utc(10, 16, 0));
    hub.tick(utc(10, 16, 1));
    hub.tick(utc(10, 17, 0));

    assert_eq!(*fired.lock().unwrap(), vec![utc(10, 16, 0), utc(10, 17, 0)]);
}

#[test]
fn pattern_all_any_degrades_to_every_tick() {
    let hub = TestHub::new();
    let count = Counter::new();

    let count_cb = count.clone();
    let _handle = track_utc_time_change(
        &hub.bus,
        move |_| count_cb.bump(),
        TimePattern::Any,
        TimePattern::Any,
        TimePattern::Any,
        false,
    )
    .unwrap();

    hub.tick(utc(10, 15, 30));
    hub.tick(utc(10, 15, 31));
    hub.tick(utc(10, 15, 33));
    assert_eq!(count.get(), 3);
}

#[test]
fn local_pattern_passes_local_time_to_the_action() {
    let hub = TestHub::new();
    let fired: Arc<Mutex<Vec<DateTime<Local>>>> = Arc::new(Mutex::new(Vec::new()));

    // Second-of-minute patterns are offset-independent: every timezone
    // offset is a whole number of minutes, so the local second matches
    // exactly when the UTC second does.
    let fired_cb = fired.clone();
    let _handle = track_time_change(
        &hub.bus,
        move |now| fired_cb.lock().unwrap().push(now),
        TimePattern::Any,
        TimePattern::Any,
        0u32,
    )
    .unwrap();

    hub.tick(utc(10, 15, 30));
    hub.tick(utc(10, 16, 0));
    hub.tick(utc(10, 16, 1));

    let fired = fired.lock().unwrap();
    assert_eq!(*fired, vec![utc(10, 16, 0).with_timezone(&Local)]);
    assert_eq!(fired[0].with_timezone(&Utc), utc(10, 16, 0));
}

#[test]
fn pattern_recovers_from_clock_rollback() {
    let hub = TestHub::new();
    let fired = Arc::new(Mutex::new(Vec::new()));

    let fired_cb = fired.clone();
    let _handle = track_utc_time_change(
        &hub.bus,
        move |now| fired_cb.lock().unwrap().push(now),
        TimePattern::Any,
        TimePattern::Any,
        0u32,
        false,
    )
    .unwrap();

    hub.tick(utc(10, 15, 30));
    hub.tick(utc(10, 16, 0));
    assert_eq!(fired.lock().unwrap().len(), 1);

    // Clock rolls back; the stale schedule must not be trusted
    hub.tick(utc(10, 15, 45));
    hub.tick(utc(10, 15, 50));
    hub.tick(utc(10, 16, 0));

    assert_eq!(
        *fired.lock().unwrap(),
        vec![utc(10, 16, 0), utc(10, 16, 0)]
    );
}

#[test]
fn pattern_does_not_refire_within_matching_second() {
    let hub = TestHub::new();
    let count = Counter::new();

    let count_cb = count.clone();
    let _handle = track_utc_time_change(
        &hub.bus,
        move |_| count_cb.bump(),
        TimePattern::Any,
        TimePattern::Any,
        0u32,
        false,
    )
    .unwrap();

    hub.tick(utc(10, 15, 59));
    hub.tick(utc(10, 16, 0));
    hub.tick(utc(10, 16, 0));
    assert_eq!(count.get(), 1);
}

#[test]
fn pattern_rejects_out_of_range_values() {
    let hub = TestHub::new();
    assert!(track_utc_time_change(
        &hub.bus,
        |_| {},
        24u32,
        TimePattern::Any,
        TimePattern::Any,
        false,
    )
    .is_err());
}

#[test]
fn pattern_cancel_is_idempotent() {
    let hub = TestHub::new();
    let count = Counter::new();

    let count_cb = count.clone();
    let handle = track_utc_time_change(
        &hub.bus,
        move |_| count_cb.bump(),
        TimePattern::Any,
        TimePattern::Any,
        0u32,
        false,
    )
    .unwrap();

    handle.cancel();
    handle.cancel();
    hub.tick(utc(10, 16, 0));
    assert_eq!(count.get(), 0);
}

#[test]
fn sunrise_rearms_from_the_calculator() {
    let hub = TestHub::new();
    let count = Counter::new();

    let first = utc(5, 58, 0);
    let second = utc(5, 57, 0) + Duration::days(1);
    let sun = MockSun::new([first, second]);
    let calculator: Arc<dyn hearth_tracking::SunEventCalculator> = sun.clone();

    let count_cb = count.clone();
    let _handle = track_sunrise(&hub.bus, &calculator, move || count_cb.bump(), None);

    hub.tick(first);
    assert_eq!(count.get(), 1);

    hub.tick(second);
    assert_eq!(count.get(), 2);

    // Every occurrence was fetched freshly, never derived by adding 24h
    let requests = sun.requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    assert!(requests
        .iter()
        .all(|(kind, _)| *kind == hearth_tracking::SunEvent::Sunrise));
}

#[test]
fn sunset_cancel_stops_future_fires() {
    let hub = TestHub::new();
    let count = Counter::new();

    let first = utc(20, 12, 0);
    let sun = MockSun::new([first]);
    let calculator: Arc<dyn hearth_tracking::SunEventCalculator> = sun.clone();

    let offset = Some(Duration::minutes(-10));
    let count_cb = count.clone();
    let handle = track_sunset(&hub.bus, &calculator, move || count_cb.bump(), offset);
    assert_eq!(sun.requests.lock().unwrap()[0].1, offset);

    handle.cancel();
    handle.cancel();
    hub.tick(first);
    assert_eq!(count.get(), 0);
}
