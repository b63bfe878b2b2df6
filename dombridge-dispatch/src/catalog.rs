//! Name-to-type lookup into the domain object model.

use crate::entity::EntityTypeInfo;
use crate::error::{DispatchError, Result};
use dombridge_model::EntityName;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// The sole entry point into the runtime-assembled domain object model.
pub trait TypeCatalog: Send + Sync {
    /// Returns the entity type registered under `name`.
    ///
    /// Fails with [`DispatchError::UnknownType`] when nothing is registered.
    fn get_type(&self, name: &str) -> Result<Arc<EntityTypeInfo>>;
}

/// In-memory catalog filled while the domain object model is assembled.
#[derive(Debug, Default)]
pub struct DomainCatalog {
    types: HashMap<EntityName, Arc<EntityTypeInfo>>,
}

impl DomainCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type under its name.
    pub fn register(&mut self, info: EntityTypeInfo) -> Result<()> {
        if self.types.contains_key(info.name()) {
            return Err(DispatchError::DuplicateEntityType(info.name().to_string()));
        }
        info!(
            entity = %info.name(),
            entity_type = info.descriptor().name(),
            "Entity type registered"
        );
        self.types.insert(info.name().clone(), Arc::new(info));
        Ok(())
    }

    /// Builder-style [`DomainCatalog::register`].
    pub fn with(mut self, info: EntityTypeInfo) -> Result<Self> {
        self.register(info)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered entity names, sorted.
    pub fn names(&self) -> Vec<&EntityName> {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeCatalog for DomainCatalog {
    fn get_type(&self, name: &str) -> Result<Arc<EntityTypeInfo>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownType(name.to_string()))
    }
}
