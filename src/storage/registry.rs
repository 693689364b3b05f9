//! Store registry.
//!
//! An explicit map from store kind to factory. Build one at start-up,
//! register the kinds the application supports, and pass it by reference
//! to whatever opens stores. There is no process-wide table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{memory, BindingStore, MemoryStore, StoreConfig};
use crate::{Error, Result};

/// Opens a store from its configuration.
pub type StoreFactory = Box<dyn Fn(&StoreConfig) -> Result<Arc<dyn BindingStore>> + Send + Sync>;

#[derive(Default)]
pub struct StoreRegistry {
    factories: HashMap<String, StoreFactory>,
}

impl StoreRegistry {
    /// Registry with no kinds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `memory` kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(memory::KIND, |config| match config {
            StoreConfig::Memory(cfg) => Ok(Arc::new(MemoryStore::with_config(*cfg)) as Arc<dyn BindingStore>),
            other => Err(Error::InvalidArgument(format!(
                "memory store cannot be opened from a '{}' config",
                other.kind()
            ))),
        });
        registry
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&StoreConfig) -> Result<Arc<dyn BindingStore>> + Send + Sync + 'static,
    {
        let kind = kind.into();
        tracing::debug!(%kind, "registered store factory");
        self.factories.insert(kind, Box::new(factory));
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Open the store described by `config`.
    pub fn create(&self, config: &StoreConfig) -> Result<Arc<dyn BindingStore>> {
        let factory = self
            .factories
            .get(config.kind())
            .ok_or_else(|| Error::UnknownStore(config.kind().to_string()))?;
        factory(config)
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry").field("kinds", &self.kinds()).finish()
    }
}
