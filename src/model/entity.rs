//! Entity identity: the (type, id) pair a binding endpoint refers to.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Stable identity of a domain entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

/// A domain object that can report its own identity.
///
/// Either accessor may fail; the failure is surfaced as
/// `Error::EntityExtraction` and propagated as-is by every caller.
pub trait Entity: Send + Sync {
    fn entity_type(&self) -> Result<String>;

    fn entity_id(&self) -> Result<String>;

    fn entity_ref(&self) -> Result<EntityRef> {
        Ok(EntityRef::new(self.entity_type()?, self.entity_id()?))
    }
}

impl Entity for EntityRef {
    fn entity_type(&self) -> Result<String> {
        Ok(self.entity_type.clone())
    }

    fn entity_id(&self) -> Result<String> {
        Ok(self.entity_id.clone())
    }

    fn entity_ref(&self) -> Result<EntityRef> {
        Ok(self.clone())
    }
}
