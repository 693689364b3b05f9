//! Binding: a typed, directed relationship between two entities.

use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::{self, Metadata};
use super::{EntityRef, Value};

/// Opaque binding identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(pub String);

impl BindingId {
    /// A fresh random (v4) identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BindingId {
    fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for BindingId {
    fn from(s: String) -> Self { Self(s) }
}

/// A binding (directed, typed edge) between two entities.
///
/// Bindings are values: every "modification" produces a new binding with
/// the same id. Two bindings are equal when their ids are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub id: BindingId,
    pub from_type: String,
    pub from_id: String,
    pub to_type: String,
    pub to_id: String,
    #[serde(rename = "type")]
    pub binding_type: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Binding {
    pub fn new(
        from: EntityRef,
        to: EntityRef,
        binding_type: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: BindingId::generate(),
            from_type: from.entity_type,
            from_id: from.entity_id,
            to_type: to.entity_type,
            to_id: to.entity_id,
            binding_type: binding_type.into(),
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Same binding with a caller-chosen id.
    pub fn with_id(mut self, id: impl Into<BindingId>) -> Self {
        self.id = id.into();
        self
    }

    /// Copy with the metadata replaced and `updated_at` refreshed.
    pub fn with_metadata(&self, metadata: Metadata) -> Self {
        Self {
            metadata,
            updated_at: Utc::now().max(self.updated_at),
            ..self.clone()
        }
    }

    /// Copy with `patch` merged over the existing metadata.
    pub fn merge_metadata(&self, patch: Metadata) -> Self {
        let mut merged = self.metadata.clone();
        merged.extend(patch);
        self.with_metadata(merged)
    }

    pub fn from_ref(&self) -> EntityRef {
        EntityRef::new(&self.from_type, &self.from_id)
    }

    pub fn to_ref(&self) -> EntityRef {
        EntityRef::new(&self.to_type, &self.to_id)
    }

    pub fn is_from(&self, entity: &EntityRef) -> bool {
        self.from_type == entity.entity_type && self.from_id == entity.entity_id
    }

    pub fn is_to(&self, entity: &EntityRef) -> bool {
        self.to_type == entity.entity_type && self.to_id == entity.entity_id
    }

    /// True if the entity is either endpoint.
    pub fn involves(&self, entity: &EntityRef) -> bool {
        self.is_from(entity) || self.is_to(entity)
    }

    /// True if this binding points from `from` to `to`.
    pub fn connects(&self, from: &EntityRef, to: &EntityRef) -> bool {
        self.is_from(from) && self.is_to(to)
    }

    /// Resolve a query field against this binding.
    ///
    /// Well-known attributes (`id`, `fromType`, `fromId`, `toType`, `toId`,
    /// `type`/`relationshipType`, `createdAt`, `updatedAt`) win over
    /// metadata keys of the same name.
    pub fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
        let attribute = match name {
            "id" => Value::from(self.id.as_str()),
            "fromType" => Value::from(self.from_type.as_str()),
            "fromId" => Value::from(self.from_id.as_str()),
            "toType" => Value::from(self.to_type.as_str()),
            "toId" => Value::from(self.to_id.as_str()),
            "type" | "relationshipType" => Value::from(self.binding_type.as_str()),
            "createdAt" => Value::DateTime(self.created_at),
            "updatedAt" => Value::DateTime(self.updated_at),
            _ => return metadata::lookup(&self.metadata, name).map(Cow::Borrowed),
        };
        Some(Cow::Owned(attribute))
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Binding {}

impl Hash for Binding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::meta;

    fn follows() -> Binding {
        Binding::new(
            EntityRef::new("user", "1"),
            EntityRef::new("user", "2"),
            "follows",
            meta([("score", 10)]),
        )
    }

    #[test]
    fn test_new_binding() {
        let b = follows();
        assert_eq!(b.from_ref(), EntityRef::new("user", "1"));
        assert_eq!(b.to_ref(), EntityRef::new("user", "2"));
        assert_eq!(b.created_at, b.updated_at);
        assert!(b.connects(&EntityRef::new("user", "1"), &EntityRef::new("user", "2")));
        assert!(!b.connects(&EntityRef::new("user", "2"), &EntityRef::new("user", "1")));
        assert!(b.involves(&EntityRef::new("user", "2")));
    }

    #[test]
    fn test_equality_by_id() {
        let a = follows();
        let changed = a.with_metadata(meta([("score", 99)]));
        assert_eq!(a, changed);
        assert_ne!(a, follows());
        assert!(changed.updated_at >= a.updated_at);
    }

    #[test]
    fn test_merge_metadata_keeps_existing_keys() {
        let b = follows().merge_metadata(meta([("weight", 0.5)]));
        assert_eq!(b.metadata.get("score"), Some(&Value::Int(10)));
        assert_eq!(b.metadata.get("weight"), Some(&Value::Float(0.5)));
    }

    #[test]
    fn test_field_resolution() {
        let b = follows();
        assert_eq!(b.field("type").as_deref(), Some(&Value::from("follows")));
        assert_eq!(b.field("relationshipType").as_deref(), Some(&Value::from("follows")));
        assert_eq!(b.field("fromId").as_deref(), Some(&Value::from("1")));
        assert_eq!(b.field("score").as_deref(), Some(&Value::Int(10)));
        assert!(b.field("missing").is_none());
    }
}
