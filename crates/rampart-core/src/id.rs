//! Identity types for Rampart
//!
//! Records coming back from the platform API are addressed by positive
//! integer ids. Zero and negative values are never valid ids.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Entity identity - a positive integer id of a server-side record
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(NonZeroU64);

impl EntityId {
    pub const MIN: EntityId = EntityId(NonZeroU64::MIN);

    /// Create an id, rejecting zero
    #[inline]
    pub fn new(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(EntityId)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl From<NonZeroU64> for EntityId {
    fn from(id: NonZeroU64) -> Self {
        EntityId(id)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_rejects_zero() {
        assert!(EntityId::new(0).is_none());
        assert_eq!(EntityId::new(7).map(EntityId::get), Some(7));
    }

    #[test]
    fn test_entity_id_serde_transparent() {
        let id = EntityId::new(42).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");

        let back: EntityId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<EntityId>("0").is_err());
    }

    #[test]
    fn test_entity_id_display() {
        let id = EntityId::new(255).unwrap();
        assert_eq!(format!("{}", id), "255");
        assert_eq!(format!("{:?}", id), "Entity(255)");
    }
}
