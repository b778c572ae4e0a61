//! Tracking of state_changed events filtered by entity and state

use std::collections::HashSet;

use hearth_bus::SharedEventBus;
use hearth_core::events::StateChangedData;
use hearth_core::{EntityId, State, MATCH_ALL};

use crate::cancel::CancelHandle;
use crate::state_match::StateMatch;

/// The set of entities a tracker listens to
///
/// Normalized to a lower-cased set at registration time, or the
/// match-everything sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityIds {
    /// Every entity in the system
    All,
    /// Only the listed entity ids
    Only(HashSet<String>),
}

impl EntityIds {
    fn matches(&self, entity_id: &EntityId) -> bool {
        match self {
            EntityIds::All => true,
            EntityIds::Only(set) => set.contains(entity_id.as_str()),
        }
    }
}

impl From<&str> for EntityIds {
    fn from(value: &str) -> Self {
        if value == MATCH_ALL {
            EntityIds::All
        } else {
            EntityIds::Only(HashSet::from([value.to_lowercase()]))
        }
    }
}

impl From<&EntityId> for EntityIds {
    fn from(value: &EntityId) -> Self {
        EntityIds::Only(HashSet::from([value.as_str().to_owned()]))
    }
}

impl From<Vec<&str>> for EntityIds {
    fn from(values: Vec<&str>) -> Self {
        EntityIds::Only(values.iter().map(|s| s.to_lowercase()).collect())
    }
}

impl From<Vec<String>> for EntityIds {
    fn from(values: Vec<String>) -> Self {
        EntityIds::Only(values.iter().map(|s| s.to_lowercase()).collect())
    }
}

/// Track specific state changes
///
/// `entity_ids`, `from_state` and `to_state` narrow which transitions
/// reach the action: the entity must be in the set (or the set is
/// [`EntityIds::All`]) and the old and new state values must satisfy
/// their respective [`StateMatch`] filters. A missing old or new state
/// snapshot is matched as `None`.
///
/// The action receives the entity id and both state snapshots. Returns
/// a handle that removes the single underlying bus subscription.
pub fn track_state_change(
    bus: &SharedEventBus,
    entity_ids: impl Into<EntityIds>,
    action: impl Fn(&EntityId, Option<&State>, Option<&State>) + Send + Sync + 'static,
    from_state: impl Into<StateMatch>,
    to_state: impl Into<StateMatch>,
) -> CancelHandle {
    let entity_ids = entity_ids.into();
    let match_from = from_state.into();
    let match_to = to_state.into();

    let subscription = bus.listen_typed::<StateChangedData>(move |event| {
        let data = &event.data;
        if !entity_ids.matches(&data.entity_id) {
            return;
        }

        let old_value = data.old_state.as_ref().map(|s| s.state.as_str());
        let new_value = data.new_state.as_ref().map(|s| s.state.as_str());
        if !match_from.matches(old_value) || !match_to.matches(new_value) {
            return;
        }

        action(
            &data.entity_id,
            data.old_state.as_ref(),
            data.new_state.as_ref(),
        );
    });

    CancelHandle::from_subscription(subscription)
}
