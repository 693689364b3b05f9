//! # entity-bindings: typed relationships between domain entities
//!
//! Stores directed, typed, metadata-carrying *bindings* between arbitrary
//! entities and queries them through a storage-agnostic criteria model.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `BindingStore` is the contract between the query layer and storage
//! 2. **Clean DTOs**: `Binding`, `Value`, `Criteria` cross all boundaries
//! 3. **Persistent builder**: every `CriteriaBuilder` call returns a new snapshot
//! 4. **Index, then evaluate**: indices narrow candidates, the evaluator decides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use entity_bindings::{meta, Binder, EntityRef};
//!
//! # async fn example() -> entity_bindings::Result<()> {
//! let binder = Binder::open_memory();
//!
//! let ada = EntityRef::new("user", "1");
//! let bob = EntityRef::new("user", "2");
//! binder.bind(&ada, &bob, "follows", meta([("score", 10)])).await?;
//!
//! let strong = binder
//!     .query()
//!     .from_endpoint(&ada)?
//!     .with_type("follows")
//!     .where_between("score", 5, 20)
//!     .order_by("score", "desc")?
//!     .execute()
//!     .await?;
//! assert_eq!(strong.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Stores
//!
//! | Store | Config | Description |
//! |-------|--------|-------------|
//! | Memory | `StoreConfig::Memory` | Indexed in-memory engine |
//! | Custom | `StoreConfig::Custom` | Anything registered in a `StoreRegistry` |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod criteria;
pub mod index;
pub mod execution;
pub mod storage;

use std::sync::Arc;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Binding, BindingId, Entity, EntityRef, Metadata, Value,
    meta,
};

// ============================================================================
// Re-exports: Criteria
// ============================================================================

pub use criteria::{
    Clause, ClauseGroup, Combinator, Criteria, CriteriaBuilder, Endpoint,
    Operator, Predicate, SortClause, SortDirection,
};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{
    BindingStore, MemoryConfig, MemoryStore, StoreConfig, StoreFactory, StoreRegistry,
};

// ============================================================================
// Top-level Binder handle
// ============================================================================

/// The primary entry point. A `Binder` wraps a binding store and offers
/// bind/unbind/lookup operations plus the query builder.
///
/// Cloning is cheap and shares the store.
#[derive(Clone)]
pub struct Binder {
    store: Arc<dyn BindingStore>,
}

impl Binder {
    /// Create a Binder over the given store.
    pub fn with_store<S: BindingStore>(store: S) -> Self {
        Self { store: Arc::new(store) }
    }

    /// Create a Binder over an already shared store.
    pub fn with_shared_store(store: Arc<dyn BindingStore>) -> Self {
        Self { store }
    }

    /// Open the store described by `config` through `registry`.
    pub fn from_config(registry: &StoreRegistry, config: &StoreConfig) -> Result<Self> {
        Ok(Self::with_shared_store(registry.create(config)?))
    }

    /// Access the underlying store (for advanced use).
    pub fn store(&self) -> &Arc<dyn BindingStore> {
        &self.store
    }

    /// Start a query.
    pub fn query(&self) -> CriteriaBuilder {
        CriteriaBuilder::new(Arc::clone(&self.store))
    }

    fn resolve<'e>(&self, endpoint: impl Into<Endpoint<'e>>) -> Result<EntityRef> {
        endpoint.into().resolve(self.store.as_ref())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Create and store a binding from `from` to `to`.
    pub async fn bind<'f, 't>(
        &self,
        from: impl Into<Endpoint<'f>>,
        to: impl Into<Endpoint<'t>>,
        binding_type: &str,
        metadata: Metadata,
    ) -> Result<Binding> {
        if binding_type.trim().is_empty() {
            return Err(Error::InvalidArgument("binding type must not be empty".into()));
        }
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        let metadata = self.store.validate_and_normalize_metadata(metadata)?;

        let binding = Binding::new(from, to, binding_type, metadata);
        self.store.store(binding.clone()).await?;
        Ok(binding)
    }

    /// Delete one binding. Returns true if it existed.
    pub async fn unbind(&self, id: &BindingId) -> Result<bool> {
        self.store.delete(id).await
    }

    /// Delete every binding from `from` to `to` (optionally of one type).
    pub async fn unbind_entities<'f, 't>(
        &self,
        from: impl Into<Endpoint<'f>>,
        to: impl Into<Endpoint<'t>>,
        binding_type: Option<&str>,
    ) -> Result<usize> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        let mut removed = 0;
        for binding in self.store.find_between_entities(&from, &to, binding_type).await? {
            if self.store.delete(&binding.id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Delete every binding the entity takes part in, in either direction.
    pub async fn unbind_entity<'e>(&self, entity: impl Into<Endpoint<'e>>) -> Result<usize> {
        let entity = self.resolve(entity)?;
        self.store.delete_by_entity(&entity).await
    }

    /// Merge `patch` into a binding's metadata.
    ///
    /// Atomic when the store overrides [`BindingStore::merge_metadata`]
    /// (the memory store does).
    pub async fn update_metadata(&self, id: &BindingId, patch: Metadata) -> Result<Binding> {
        let patch = self.store.validate_and_normalize_metadata(patch)?;
        self.store.merge_metadata(id, patch).await
    }

    /// Replace a binding's metadata wholesale.
    pub async fn replace_metadata(&self, id: &BindingId, metadata: Metadata) -> Result<Binding> {
        let metadata = self.store.validate_and_normalize_metadata(metadata)?;
        self.store.update_metadata(id, metadata).await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn find_binding(&self, id: &BindingId) -> Result<Option<Binding>> {
        self.store.find(id).await
    }

    /// Every binding the entity takes part in, in creation order.
    pub async fn find_bindings_for<'e>(&self, entity: impl Into<Endpoint<'e>>) -> Result<Vec<Binding>> {
        let entity = self.resolve(entity)?;
        self.store.find_by_entity(&entity).await
    }

    pub async fn bindings_between<'f, 't>(
        &self,
        from: impl Into<Endpoint<'f>>,
        to: impl Into<Endpoint<'t>>,
        binding_type: Option<&str>,
    ) -> Result<Vec<Binding>> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        self.store.find_between_entities(&from, &to, binding_type).await
    }

    /// True if at least one binding points from `from` to `to`.
    pub async fn are_bound<'f, 't>(
        &self,
        from: impl Into<Endpoint<'f>>,
        to: impl Into<Endpoint<'t>>,
        binding_type: Option<&str>,
    ) -> Result<bool> {
        let mut query = self.query().from_endpoint(from)?.to_endpoint(to)?;
        if let Some(binding_type) = binding_type {
            query = query.with_type(binding_type);
        }
        query.exists().await
    }
}

/// In-memory binder for testing and embedding.
impl Binder {
    pub fn open_memory() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl std::fmt::Debug for Binder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder").field("store", &self.store.kind()).finish()
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Entity extraction failed: {0}")]
    EntityExtraction(String),

    #[error("Metadata validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown store kind: {0}")]
    UnknownStore(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
