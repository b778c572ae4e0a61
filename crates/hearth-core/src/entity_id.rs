//! Entity ID type representing a domain.object_id pair

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for invalid entity IDs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity_id must contain exactly one '.' separator")]
    InvalidFormat,

    #[error("domain cannot be empty")]
    EmptyDomain,

    #[error("object_id cannot be empty")]
    EmptyObjectId,

    #[error("entity_id contains invalid characters (lowercase alphanumeric and underscores only)")]
    InvalidChars,
}

/// An entity ID such as "light.living_room"
///
/// Stored as the full lowercase string with the position of the separator,
/// so `as_str` and hashing are free and the parts are cheap slices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    full: String,
    dot: usize,
}

impl EntityId {
    /// Create a new EntityId from domain and object_id parts
    pub fn new(domain: &str, object_id: &str) -> Result<Self, EntityIdError> {
        if domain.is_empty() {
            return Err(EntityIdError::EmptyDomain);
        }
        if object_id.is_empty() {
            return Err(EntityIdError::EmptyObjectId);
        }
        if !is_valid_part(domain) || !is_valid_part(object_id) {
            return Err(EntityIdError::InvalidChars);
        }
        Ok(Self {
            full: format!("{domain}.{object_id}"),
            dot: domain.len(),
        })
    }

    /// Get the domain part of the entity ID
    pub fn domain(&self) -> &str {
        &self.full[..self.dot]
    }

    /// Get the object_id part of the entity ID
    pub fn object_id(&self) -> &str {
        &self.full[self.dot + 1..]
    }

    /// Get the full "domain.object_id" string
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

/// Valid parts are lowercase alphanumeric plus underscores, and may not
/// start or end with an underscore.
fn is_valid_part(s: &str) -> bool {
    if s.starts_with('_') || s.ends_with('_') {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(domain), Some(object_id), None) => Self::new(domain, object_id),
            _ => Err(EntityIdError::InvalidFormat),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.full
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_entity_id() {
        let id = EntityId::new("light", "living_room").unwrap();
        assert_eq!(id.domain(), "light");
        assert_eq!(id.object_id(), "living_room");
        assert_eq!(id.as_str(), "light.living_room");
    }

    #[test]
    fn test_parse_entity_id() {
        let id: EntityId = "sensor.temperature".parse().unwrap();
        assert_eq!(id.domain(), "sensor");
        assert_eq!(id.object_id(), "temperature");
    }

    #[test]
    fn test_invalid_format() {
        assert_eq!(
            "no_separator".parse::<EntityId>().unwrap_err(),
            EntityIdError::InvalidFormat
        );
        assert_eq!(
            "too.many.parts".parse::<EntityId>().unwrap_err(),
            EntityIdError::InvalidFormat
        );
    }

    #[test]
    fn test_empty_parts() {
        assert_eq!(
            ".object".parse::<EntityId>().unwrap_err(),
            EntityIdError::EmptyDomain
        );
        assert_eq!(
            "domain.".parse::<EntityId>().unwrap_err(),
            EntityIdError::EmptyObjectId
        );
    }

    #[test]
    fn test_invalid_chars() {
        assert!("UPPER.case".parse::<EntityId>().is_err());
        assert!("with-dash.object".parse::<EntityId>().is_err());
        assert!("_light.room".parse::<EntityId>().is_err());
        assert!("light.room_".parse::<EntityId>().is_err());
        assert!("my_light.living_room".parse::<EntityId>().is_ok());
    }

    #[test]
    fn test_serde_roundtrip() {
        let id = EntityId::new("switch", "kitchen").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"switch.kitchen\"");

        let parsed: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
