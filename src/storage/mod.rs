//! # Binding Store Trait
//!
//! This is THE contract between the query layer and any storage engine.
//! A store persists bindings, answers [`Criteria`] queries, and resolves
//! entity identity for the builder.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | Indexed in-memory reference engine |
//!
//! Other stores plug in through [`registry::StoreRegistry`].

pub mod memory;
pub mod registry;

use async_trait::async_trait;

use crate::criteria::Criteria;
use crate::model::metadata::{self, DEFAULT_MAX_DEPTH};
use crate::model::*;
use crate::{Error, Result};

pub use memory::MemoryStore;
pub use registry::{StoreFactory, StoreRegistry};

// ============================================================================
// Store Configuration
// ============================================================================

/// Configuration for opening a binding store.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// In-memory (no persistence)
    Memory(MemoryConfig),

    /// A store kind registered by the application.
    Custom {
        kind: String,
        options: Metadata,
    },
}

impl StoreConfig {
    pub fn memory() -> Self {
        StoreConfig::Memory(MemoryConfig::default())
    }

    /// Registry key of the store this config opens.
    pub fn kind(&self) -> &str {
        match self {
            StoreConfig::Memory(_) => memory::KIND,
            StoreConfig::Custom { kind, .. } => kind,
        }
    }
}

/// Tuning for [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Maximum container nesting accepted in metadata.
    pub max_metadata_depth: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { max_metadata_depth: DEFAULT_MAX_DEPTH }
    }
}

// ============================================================================
// BindingStore Trait
// ============================================================================

/// The storage collaborator contract.
///
/// Stores are shared as `Arc<dyn BindingStore>`, so the trait stays object
/// safe. `execute_query` must return results in the order the criteria
/// asks for, with limit/offset applied; `count` ignores limit/offset.
#[async_trait]
pub trait BindingStore: Send + Sync + 'static {
    /// Registry name of this store kind.
    fn kind(&self) -> &'static str;

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Insert a binding, or replace the stored binding with the same id.
    async fn store(&self, binding: Binding) -> Result<()>;

    /// Get a binding by id. Returns None if not found.
    async fn find(&self, id: &BindingId) -> Result<Option<Binding>>;

    /// Delete a binding. Returns true if it existed.
    async fn delete(&self, id: &BindingId) -> Result<bool>;

    /// Replace a binding's metadata. Fails with `NotFound` for unknown ids.
    async fn update_metadata(&self, id: &BindingId, metadata: Metadata) -> Result<Binding>;

    /// Merge `patch` over a binding's metadata. Fails with `NotFound` for
    /// unknown ids.
    ///
    /// Default: `find` then `update_metadata`, which is not atomic; a
    /// concurrent patch between the two calls is lost. Stores that can
    /// merge under one lock should override this.
    async fn merge_metadata(&self, id: &BindingId, patch: Metadata) -> Result<Binding> {
        let current = self
            .find(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Binding {id}")))?;
        let merged = current.merge_metadata(patch);
        self.update_metadata(id, merged.metadata).await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Run criteria and return the ordered page.
    async fn execute_query(&self, criteria: &Criteria) -> Result<Vec<Binding>>;

    /// Number of bindings matching criteria, ignoring limit/offset.
    async fn count(&self, criteria: &Criteria) -> Result<usize>;

    /// All bindings with `entity` as source or target, in creation order.
    async fn find_by_entity(&self, entity: &EntityRef) -> Result<Vec<Binding>>;

    /// Bindings from `from` to `to`, optionally of one type.
    ///
    /// Default: expressed as criteria.
    async fn find_between_entities(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        binding_type: Option<&str>,
    ) -> Result<Vec<Binding>> {
        let criteria = Criteria {
            from_type: Some(from.entity_type.clone()),
            from_id: Some(from.entity_id.clone()),
            to_type: Some(to.entity_type.clone()),
            to_id: Some(to.entity_id.clone()),
            relationship_type: binding_type.map(str::to_owned),
            ..Criteria::default()
        };
        self.execute_query(&criteria).await
    }

    /// Delete every binding involving `entity`. Returns how many were removed.
    ///
    /// Default: find, then delete one by one.
    async fn delete_by_entity(&self, entity: &EntityRef) -> Result<usize> {
        let mut removed = 0;
        for binding in self.find_by_entity(entity).await? {
            if self.delete(&binding.id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Total number of stored bindings.
    async fn binding_count(&self) -> Result<usize> {
        self.count(&Criteria::default()).await
    }

    // ========================================================================
    // Identity and metadata
    // ========================================================================

    /// Resolve a domain object to its (type, id). Errors pass through as-is.
    fn extract_entity(&self, entity: &dyn Entity) -> Result<EntityRef> {
        entity.entity_ref()
    }

    /// Validate metadata and return the form to persist.
    fn validate_and_normalize_metadata(&self, metadata: Metadata) -> Result<Metadata> {
        metadata::normalize(metadata, DEFAULT_MAX_DEPTH)
    }
}
