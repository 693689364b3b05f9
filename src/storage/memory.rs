//! In-memory binding store.
//!
//! This is the reference implementation of `BindingStore`.
//! The primary map and both indices live behind one `RwLock`, so every
//! write (map plus three index buckets) is atomic to readers, and a query
//! holds the read lock from candidate computation to the last evaluated
//! binding. Concurrent queries share the read lock.
//!
//! ## Limitations
//!
//! - **No durability**: everything is lost on drop.
//! - **No metadata indices**: clauses are evaluated on every candidate.
//!   Only endpoint and type filters narrow the scan.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{BindingStore, MemoryConfig};
use crate::criteria::Criteria;
use crate::execution::{self, Candidate};
use crate::index::{BindingIndex, Candidates};
use crate::model::metadata;
use crate::model::*;
use crate::{Error, Result};

/// Registry name of the memory store.
pub const KIND: &str = "memory";

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory indexed binding storage.
///
/// Cloning yields another handle to the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryState>>,
    config: MemoryConfig,
}

#[derive(Default)]
struct MemoryState {
    bindings: HashMap<BindingId, Stored>,
    index: BindingIndex,
    /// creation counter; survives deletes so order stays strictly increasing
    next_sequence: u64,
}

struct Stored {
    sequence: u64,
    binding: Binding,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryState::default())),
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Number of (entity, type) index buckets currently held.
    pub fn index_sizes(&self) -> (usize, usize) {
        let state = self.inner.read();
        (state.index.entity_count(), state.index.type_count())
    }

    /// Drop all bindings and index entries.
    pub fn clear(&self) {
        let mut state = self.inner.write();
        state.bindings.clear();
        state.index.clear();
        tracing::debug!("cleared memory store");
    }
}

impl MemoryState {
    /// Candidate rows for `criteria`, still unfiltered.
    fn candidates(&self, criteria: &Criteria) -> Vec<Candidate<'_>> {
        let rows: Vec<Candidate<'_>> = match self.index.candidates(criteria) {
            Candidates::All => self.bindings.values().map(Stored::as_candidate).collect(),
            Candidates::Ids(ids) => ids
                .iter()
                .filter_map(|id| self.bindings.get(id))
                .map(Stored::as_candidate)
                .collect(),
        };
        tracing::trace!(
            candidates = rows.len(),
            stored = self.bindings.len(),
            "computed candidate set"
        );
        rows
    }

    fn remove(&mut self, id: &BindingId) -> Option<Binding> {
        let stored = self.bindings.remove(id)?;
        self.index.remove(&stored.binding);
        Some(stored.binding)
    }
}

impl Stored {
    fn as_candidate(&self) -> Candidate<'_> {
        Candidate { sequence: self.sequence, binding: &self.binding }
    }
}

// ============================================================================
// BindingStore impl
// ============================================================================

#[async_trait]
impl BindingStore for MemoryStore {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn store(&self, binding: Binding) -> Result<()> {
        metadata::check_values(&binding.metadata, self.config.max_metadata_depth)?;
        let mut state = self.inner.write();

        // Replacing keeps the original creation slot.
        let existing = state.bindings.get(&binding.id).map(|s| s.sequence);
        let sequence = match existing {
            Some(seq) => seq,
            None => {
                let seq = state.next_sequence;
                state.next_sequence += 1;
                seq
            }
        };
        state.remove(&binding.id);
        state.index.insert(&binding);

        tracing::debug!(
            id = %binding.id,
            binding_type = %binding.binding_type,
            from = %binding.from_ref(),
            to = %binding.to_ref(),
            "stored binding"
        );
        state.bindings.insert(binding.id.clone(), Stored { sequence, binding });
        Ok(())
    }

    async fn find(&self, id: &BindingId) -> Result<Option<Binding>> {
        Ok(self.inner.read().bindings.get(id).map(|s| s.binding.clone()))
    }

    async fn delete(&self, id: &BindingId) -> Result<bool> {
        let removed = self.inner.write().remove(id);
        if removed.is_some() {
            tracing::debug!(%id, "deleted binding");
        }
        Ok(removed.is_some())
    }

    async fn update_metadata(&self, id: &BindingId, metadata: Metadata) -> Result<Binding> {
        let mut state = self.inner.write();
        let stored = state
            .bindings
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("Binding {id}")))?;

        // Endpoints and type are unchanged, so the indices stay valid.
        stored.binding = stored.binding.with_metadata(metadata);
        tracing::debug!(%id, "updated binding metadata");
        Ok(stored.binding.clone())
    }

    async fn merge_metadata(&self, id: &BindingId, patch: Metadata) -> Result<Binding> {
        let mut state = self.inner.write();
        let stored = state
            .bindings
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("Binding {id}")))?;

        stored.binding = stored.binding.merge_metadata(patch);
        tracing::debug!(%id, "merged binding metadata");
        Ok(stored.binding.clone())
    }

    async fn execute_query(&self, criteria: &Criteria) -> Result<Vec<Binding>> {
        let state = self.inner.read();
        Ok(execution::execute(state.candidates(criteria), criteria))
    }

    async fn count(&self, criteria: &Criteria) -> Result<usize> {
        let state = self.inner.read();
        Ok(execution::count(state.candidates(criteria), criteria))
    }

    async fn find_by_entity(&self, entity: &EntityRef) -> Result<Vec<Binding>> {
        let state = self.inner.read();
        let Some(ids) = state.index.by_entity(entity) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<Candidate<'_>> = ids
            .iter()
            .filter_map(|id| state.bindings.get(id))
            .map(Stored::as_candidate)
            .collect();
        rows.sort_by_key(|c| c.sequence);
        Ok(rows.into_iter().map(|c| c.binding.clone()).collect())
    }

    async fn delete_by_entity(&self, entity: &EntityRef) -> Result<usize> {
        let mut state = self.inner.write();
        let ids: Vec<BindingId> = state
            .index
            .by_entity(entity)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        for id in &ids {
            state.remove(id);
        }
        tracing::debug!(%entity, removed = ids.len(), "deleted bindings for entity");
        Ok(ids.len())
    }

    async fn binding_count(&self) -> Result<usize> {
        Ok(self.inner.read().bindings.len())
    }

    fn validate_and_normalize_metadata(&self, metadata: Metadata) -> Result<Metadata> {
        metadata::normalize(metadata, self.config.max_metadata_depth)
    }
}

// ============================================================================
// Tests
// ============================================================================
