//! Core types for Hearth
//!
//! This crate provides the fundamental types used throughout the Hearth
//! home-automation hub: EntityId, State, Event, and Context, along with
//! the standard event types the tracking layer consumes.

mod context;
mod entity_id;
mod event;
mod state;

pub use context::Context;
pub use entity_id::{EntityId, EntityIdError};
pub use event::{Event, EventData, EventType};
pub use state::State;

/// Sentinel that matches every entity id or state value in a filter spec
pub const MATCH_ALL: &str = "*";

/// Standard event types used by Hearth
pub mod events {
    use super::*;
    use chrono::{DateTime, Utc};

    /// Event type for state changes
    pub const STATE_CHANGED: &str = "state_changed";

    /// Event type for the periodic clock tick
    pub const TIME_CHANGED: &str = "time_changed";

    /// Data for STATE_CHANGED events
    ///
    /// Either of the state snapshots may be None: a missing old_state means
    /// the entity just appeared, a missing new_state means it was removed.
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct StateChangedData {
        pub entity_id: EntityId,
        pub old_state: Option<State>,
        pub new_state: Option<State>,
    }

    impl EventData for StateChangedData {
        fn event_type() -> &'static str {
            STATE_CHANGED
        }
    }

    /// Data for TIME_CHANGED events, published by the clock source
    #[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
    pub struct TimeChangedData {
        pub now: DateTime<Utc>,
    }

    impl EventData for TimeChangedData {
        fn event_type() -> &'static str {
            TIME_CHANGED
        }
    }
}
