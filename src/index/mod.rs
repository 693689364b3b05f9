//! Binding indices.
//!
//! Two inverted indices narrow a query before predicate evaluation:
//!
//! | Index | Key | Value |
//! |-------|-----|-------|
//! | entity | `(entityType, entityId)` | ids of bindings with that entity as source or target |
//! | type | `relationshipType` | ids of bindings of that type |
//!
//! Buckets that become empty are removed, so the index never holds keys
//! for entities or types with no live bindings.

use std::hash::Hash;

use hashbrown::{Equivalent, HashMap, HashSet};

use crate::criteria::Criteria;
use crate::model::{Binding, BindingId, EntityRef};

/// Result of candidate computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    /// No indexed filter applies; every stored binding is a candidate.
    All,
    /// Only these bindings can possibly match.
    Ids(HashSet<BindingId>),
}

impl Candidates {
    pub fn is_all(&self) -> bool {
        matches!(self, Candidates::All)
    }
}

/// Entity and relationship-type indices over a set of bindings.
#[derive(Debug, Default, Clone)]
pub struct BindingIndex {
    entities: HashMap<EntityRef, HashSet<BindingId>>,
    types: HashMap<String, HashSet<BindingId>>,
}

impl BindingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding under both endpoints and its type.
    pub fn insert(&mut self, binding: &Binding) {
        self.entities.entry(binding.from_ref()).or_default().insert(binding.id.clone());
        self.entities.entry(binding.to_ref()).or_default().insert(binding.id.clone());
        self.types.entry(binding.binding_type.clone()).or_default().insert(binding.id.clone());
    }

    /// Drop a binding from every bucket it was registered in.
    pub fn remove(&mut self, binding: &Binding) {
        remove_from(&mut self.entities, &binding.from_ref(), &binding.id);
        remove_from(&mut self.entities, &binding.to_ref(), &binding.id);
        remove_from(&mut self.types, binding.binding_type.as_str(), &binding.id);
    }

    /// Bindings that have `entity` as either endpoint.
    pub fn by_entity(&self, entity: &EntityRef) -> Option<&HashSet<BindingId>> {
        self.entities.get(entity)
    }

    pub fn by_type(&self, binding_type: &str) -> Option<&HashSet<BindingId>> {
        self.types.get(binding_type)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.types.clear();
    }

    /// Intersect the buckets of every indexed filter in `criteria`.
    ///
    /// The result only narrows; callers must still evaluate the full
    /// criteria against each candidate.
    pub fn candidates(&self, criteria: &Criteria) -> Candidates {
        let from = criteria.from_ref();
        let to = criteria.to_ref();

        let lookups = [
            from.as_ref().map(|e| self.by_entity(e)),
            to.as_ref().map(|e| self.by_entity(e)),
            criteria.relationship_type.as_deref().map(|t| self.by_type(t)),
        ];

        let mut buckets = Vec::with_capacity(lookups.len());
        for lookup in lookups.into_iter().flatten() {
            match lookup {
                Some(bucket) => buckets.push(bucket),
                // a filter with no bucket cannot match anything
                None => return Candidates::Ids(HashSet::new()),
            }
        }

        buckets.sort_by_key(|b| b.len());
        let Some((smallest, rest)) = buckets.split_first() else {
            return Candidates::All;
        };

        let ids = smallest
            .iter()
            .filter(|id| rest.iter().all(|bucket| bucket.contains(*id)))
            .cloned()
            .collect();
        Candidates::Ids(ids)
    }
}

fn remove_from<K, Q>(buckets: &mut HashMap<K, HashSet<BindingId>>, key: &Q, id: &BindingId)
where
    K: Hash + Eq,
    Q: Hash + Equivalent<K> + ?Sized,
{
    if let Some(bucket) = buckets.get_mut(key) {
        bucket.remove(id);
        if bucket.is_empty() {
            buckets.remove(key);
        }
    }
}
