//! From/to state filter predicates

use std::collections::HashSet;

use hearth_core::MATCH_ALL;

/// A compiled from/to state filter
///
/// Built once at registration time from a filter spec: nothing (match
/// everything), a single literal, or a collection of literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateMatch {
    /// Matches any state value, including a missing one
    Any,
    /// Matches exactly one state value
    Exact(String),
    /// Matches any state value in the set
    OneOf(HashSet<String>),
}

impl StateMatch {
    /// Test a state value against the filter
    ///
    /// `None` represents a missing state (entity appearing or
    /// disappearing); only [`StateMatch::Any`] accepts it.
    pub fn matches(&self, state: Option<&str>) -> bool {
        match self {
            StateMatch::Any => true,
            StateMatch::Exact(expected) => state == Some(expected.as_str()),
            StateMatch::OneOf(set) => state.is_some_and(|s| set.contains(s)),
        }
    }
}

impl From<&str> for StateMatch {
    fn from(value: &str) -> Self {
        if value == MATCH_ALL {
            StateMatch::Any
        } else {
            StateMatch::Exact(value.to_owned())
        }
    }
}

impl From<String> for StateMatch {
    fn from(value: String) -> Self {
        StateMatch::from(value.as_str())
    }
}

impl From<Option<&str>> for StateMatch {
    fn from(value: Option<&str>) -> Self {
        value.map_or(StateMatch::Any, StateMatch::from)
    }
}

impl From<Vec<&str>> for StateMatch {
    fn from(values: Vec<&str>) -> Self {
        StateMatch::OneOf(values.into_iter().map(str::to_owned).collect())
    }
}

impl From<Vec<String>> for StateMatch {
    fn from(values: Vec<String>) -> Self {
        StateMatch::OneOf(values.into_iter().collect())
    }
}

impl From<&[&str]> for StateMatch {
    fn from(values: &[&str]) -> Self {
        StateMatch::OneOf(values.iter().map(|s| (*s).to_owned()).collect())
    }
}
