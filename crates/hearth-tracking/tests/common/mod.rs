//! Shared test fixtures for the tracking suites
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use hearth_bus::{EventBus, SharedEventBus};
use hearth_core::events::{StateChangedData, TimeChangedData};
use hearth_core::{Context, State};
use hearth_template::{
    EntityFilter, RenderOutcome, Template, TemplateEngine, TemplateResult, TemplateVars,
};
use hearth_tracking::{SunEvent, SunEventCalculator};

/// A bus plus helpers to publish the events the trackers consume
pub struct TestHub {
    pub bus: SharedEventBus,
}

impl TestHub {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
        Self {
            bus: Arc::new(EventBus::new()),
        }
    }

    /// Publish a clock tick carrying `now`
    pub fn tick(&self, now: DateTime<Utc>) {
        self.bus.fire_typed(TimeChangedData { now }, Context::new());
    }

    pub fn state(&self, entity_id: &str, value: &str) -> State {
        State::new(
            entity_id.parse().unwrap(),
            value,
            HashMap::new(),
            Context::new(),
        )
    }

    pub fn fire_state_changed(&self, entity_id: &str, old: Option<State>, new: Option<State>) {
        self.bus.fire_typed(
            StateChangedData {
                entity_id: entity_id.parse().unwrap(),
                old_state: old,
                new_state: new,
            },
            Context::new(),
        );
    }

    /// Publish an ordinary transition with both snapshots present
    pub fn fire_transition(&self, entity_id: &str, from: &str, to: &str) {
        self.fire_state_changed(
            entity_id,
            Some(self.state(entity_id, from)),
            Some(self.state(entity_id, to)),
        );
    }

    /// Publish an entity appearing (no old state)
    pub fn fire_appeared(&self, entity_id: &str, value: &str) {
        self.fire_state_changed(entity_id, None, Some(self.state(entity_id, value)));
    }
}

/// Template engine double fed a queue of outcomes
///
/// When the queue runs dry the last outcome repeats, so a tracker can
/// re-render an unchanged template any number of times.
pub struct MockEngine {
    state: Mutex<MockEngineState>,
}

struct MockEngineState {
    queue: VecDeque<RenderOutcome>,
    last: Option<RenderOutcome>,
    renders: usize,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockEngineState {
                queue: VecDeque::new(),
                last: None,
                renders: 0,
            }),
        })
    }

    pub fn push(&self, result: TemplateResult<String>, filter: EntityFilter) {
        self.state
            .lock()
            .unwrap()
            .queue
            .push_back(RenderOutcome { result, filter });
    }

    pub fn push_ok(&self, rendered: &str, filter: EntityFilter) {
        self.push(Ok(rendered.to_owned()), filter);
    }

    /// How many renders the tracker has requested
    pub fn render_count(&self) -> usize {
        self.state.lock().unwrap().renders
    }
}

impl TemplateEngine for MockEngine {
    fn render_with_collect(&self, _template: &Template, _variables: &TemplateVars) -> RenderOutcome {
        let mut state = self.state.lock().unwrap();
        state.renders += 1;
        if let Some(outcome) = state.queue.pop_front() {
            state.last = Some(outcome.clone());
        }
        state
            .last
            .clone()
            .expect("MockEngine has no outcome queued")
    }
}

/// Sun calculator double fed a queue of occurrence times
pub struct MockSun {
    times: Mutex<VecDeque<DateTime<Utc>>>,
    pub requests: Mutex<Vec<(SunEvent, Option<Duration>)>>,
}

impl MockSun {
    pub fn new(times: impl IntoIterator<Item = DateTime<Utc>>) -> Arc<Self> {
        Arc::new(Self {
            times: Mutex::new(times.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }
}

impl SunEventCalculator for MockSun {
    fn next_event(&self, kind: SunEvent, offset: Option<Duration>) -> DateTime<Utc> {
        self.requests.lock().unwrap().push((kind, offset));
        self.times
            .lock()
            .unwrap()
            .pop_front()
            // Out of scheduled occurrences: park the tracker far out
            .unwrap_or_else(|| Utc::now() + Duration::days(3650))
    }
}

/// Counter shared between a tracker action and test assertions
#[derive(Clone, Default)]
pub struct Counter {
    count: Arc<Mutex<usize>>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) {
        *self.count.lock().unwrap() += 1;
    }

    pub fn get(&self) -> usize {
        *self.count.lock().unwrap()
    }
}
