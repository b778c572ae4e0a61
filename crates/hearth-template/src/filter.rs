//! Entity dependency filter produced by a template render

use std::collections::HashSet;

use hearth_core::EntityId;

/// The set of entities a template render depended on
///
/// An immutable value: the tracker replaces it wholesale after every
/// render instead of mutating it in place. Beyond the concrete entity
/// ids the render touched, a template may depend on whole domains
/// (e.g. by iterating all lights) or on every state in the system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityFilter {
    all_states: bool,
    entities: HashSet<String>,
    domains: HashSet<String>,
}

impl EntityFilter {
    /// Filter that matches only the given entity ids
    pub fn for_entities<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            all_states: false,
            entities: entities.into_iter().map(Into::into).collect(),
            domains: HashSet::new(),
        }
    }

    /// Filter that matches every entity in the system
    pub fn all() -> Self {
        Self {
            all_states: true,
            ..Self::default()
        }
    }

    /// Add domains whose entities the template depends on by pattern
    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains.extend(domains.into_iter().map(Into::into));
        self
    }

    /// The concrete entity ids referenced by the last render
    pub fn include_entities(&self) -> &HashSet<String> {
        &self.entities
    }

    /// Full predicate: does this filter match `entity_id`?
    ///
    /// Unlike the include set, this also matches entities the template
    /// would reference by domain but has not seen in a render yet.
    pub fn matches(&self, entity_id: &EntityId) -> bool {
        self.all_states
            || self.entities.contains(entity_id.as_str())
            || self.domains.contains(entity_id.domain())
    }
}
