//! Template result tracking
//!
//! Re-evaluates a template whenever any entity it currently depends on
//! changes, and notifies a listener only when the rendered value
//! changes. The dependency set is re-collected on every render, so the
//! subscription stays on the full state_changed stream and the filter
//! is applied per event; a narrow subscription taken at registration
//! time would miss entities that become relevant later.

use std::sync::{Arc, Mutex};

use hearth_bus::{SharedEventBus, Subscription};
use hearth_core::events::StateChangedData;
use hearth_core::Event;
use hearth_template::{
    result_as_boolean, EntityFilter, Template, TemplateEngine, TemplateError, TemplateResult,
    TemplateVars,
};
use tracing::error;

use crate::cancel::CancelHandle;
use crate::sync::lock;

/// One notified result of template tracking
#[derive(Debug, Clone)]
pub struct TrackTemplateResult {
    /// The template that produced the result
    pub template: Template,
    /// The output of the last successful render, or None if there has
    /// not been one
    pub last_result: Option<String>,
    /// The output of this render, or the error it raised
    pub result: TemplateResult<String>,
}

/// Listener for template results
///
/// The event is the state change that caused the re-render, or None
/// for the registration baseline and for forced refreshes.
pub type TemplateResultListener =
    dyn Fn(Option<&Event<StateChangedData>>, TrackTemplateResult) + Send + Sync;

#[derive(Debug, Default)]
struct RenderState {
    last_result: Option<String>,
    last_exception: Option<TemplateError>,
    filter: EntityFilter,
}

struct TemplateTracker {
    engine: Arc<dyn TemplateEngine>,
    template: Template,
    variables: TemplateVars,
    action: Box<TemplateResultListener>,
    state: Mutex<RenderState>,
    subscription: Mutex<Option<Subscription>>,
}

impl TemplateTracker {
    /// First render at registration: the listener is always notified
    /// exactly once with the baseline, success or error.
    fn initial_render(&self) {
        let outcome = self.engine.render_with_collect(&self.template, &self.variables);

        {
            let mut state = lock(&self.state);
            state.filter = outcome.filter;
            match &outcome.result {
                Ok(rendered) => state.last_result = Some(rendered.clone()),
                Err(err) => state.last_exception = Some(err.clone()),
            }
        }

        (self.action)(
            None,
            TrackTemplateResult {
                template: self.template.clone(),
                last_result: None,
                result: outcome.result,
            },
        );
    }

    /// Decide whether `event` makes the current dependency set stale.
    ///
    /// Ordinary transitions (both snapshots present) only count if the
    /// entity is in the concrete include set of the latest render.
    /// Lifecycle events (entity appearing or disappearing) fall back to
    /// the full predicate, which can match by domain for entities no
    /// render has seen yet.
    fn triggers_rerender(&self, data: &StateChangedData) -> bool {
        let state = lock(&self.state);
        if data.old_state.is_some() && data.new_state.is_some() {
            state.filter.include_entities().contains(data.entity_id.as_str())
        } else {
            state.filter.matches(&data.entity_id)
        }
    }

    fn refresh(&self, event: Option<&Event<StateChangedData>>) {
        let outcome = self.engine.render_with_collect(&self.template, &self.variables);

        let update = {
            let mut state = lock(&self.state);
            // The dependency set always reflects the latest render,
            // even a failed one.
            state.filter = outcome.filter;

            match outcome.result {
                Err(err) => {
                    let entered_error = state.last_exception.is_none();
                    let last_result = state.last_result.clone();
                    state.last_exception = Some(err.clone());
                    // Repeated failures are not re-reported
                    entered_error.then(|| TrackTemplateResult {
                        template: self.template.clone(),
                        last_result,
                        result: Err(err),
                    })
                }
                Ok(rendered) => {
                    state.last_exception = None;
                    if state.last_result.as_deref() == Some(rendered.as_str()) {
                        // Re-render without a value change is a no-op
                        None
                    } else {
                        let last_result =
                            std::mem::replace(&mut state.last_result, Some(rendered.clone()));
                        Some(TrackTemplateResult {
                            template: self.template.clone(),
                            last_result,
                            result: Ok(rendered),
                        })
                    }
                }
            }
        };

        if let Some(update) = update {
            (self.action)(event, update);
        }
    }

    fn remove(&self) {
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.cancel();
        }
    }
}

/// Handle to a registered template result tracker
pub struct TrackTemplateResultInfo {
    tracker: Arc<TemplateTracker>,
}

impl TrackTemplateResultInfo {
    /// The tracked template
    pub fn template(&self) -> &Template {
        &self.tracker.template
    }

    /// Force a recompute, bypassing the event filter
    ///
    /// Used when the caller knows external conditions changed without a
    /// corresponding state event. Notification semantics are the same
    /// as for an event-triggered re-render.
    pub fn refresh(&self) {
        self.tracker.refresh(None);
    }

    /// Cancel the tracking; idempotent
    pub fn remove(&self) {
        self.tracker.remove();
    }
}

/// Add a listener that fires when the result of a template changes
///
/// The action fires once synchronously at registration with the initial
/// result (or the initial error), and afterwards whenever a re-render
/// produces a different value. A render error is reported once on the
/// transition into the error state, not on every failing re-render, and
/// recovering to a value equal to the last reported one is silent.
pub fn track_template_result(
    bus: &SharedEventBus,
    engine: &Arc<dyn TemplateEngine>,
    template: Template,
    variables: TemplateVars,
    action: impl Fn(Option<&Event<StateChangedData>>, TrackTemplateResult) + Send + Sync + 'static,
) -> TrackTemplateResultInfo {
    let tracker = Arc::new(TemplateTracker {
        engine: engine.clone(),
        template,
        variables,
        action: Box::new(action),
        state: Mutex::new(RenderState::default()),
        subscription: Mutex::new(None),
    });

    tracker.initial_render();

    let in_callback = tracker.clone();
    let subscription = bus.listen_typed::<StateChangedData>(move |event| {
        if in_callback.triggers_rerender(&event.data) {
            in_callback.refresh(Some(event));
        }
    });
    *lock(&tracker.subscription) = Some(subscription);

    TrackTemplateResultInfo { tracker }
}

/// Add a listener that fires when a template evaluates to true
///
/// Truthiness follows [`result_as_boolean`]: "on", "yes", "true" and
/// friends. The action fires on the transition from not-true to true;
/// render errors are logged (once per error streak, via the underlying
/// de-duplication) and never passed through.
pub fn track_template(
    bus: &SharedEventBus,
    engine: &Arc<dyn TemplateEngine>,
    template: Template,
    variables: TemplateVars,
    action: impl Fn(Option<&Event<StateChangedData>>) + Send + Sync + 'static,
) -> CancelHandle {
    let info = track_template_result(
        bus,
        engine,
        template,
        variables,
        move |event, update| match update.result {
            Err(err) => {
                error!(template = %update.template, %err, "error while processing template");
            }
            Ok(rendered) => {
                let was_true = update
                    .last_result
                    .as_deref()
                    .is_some_and(result_as_boolean);
                if !was_true && result_as_boolean(&rendered) {
                    action(event);
                }
            }
        },
    );

    CancelHandle::new(move || info.remove())
}
