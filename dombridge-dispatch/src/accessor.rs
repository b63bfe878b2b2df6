//! Lazily created repository instance and its method table.

use crate::error::{DispatchError, Result};
use crate::repository::{RepositoryHandle, RepositoryType};
use dombridge_model::EntityName;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

type RepositoryFactory = dyn Fn() -> anyhow::Result<RepositoryHandle> + Send + Sync;

/// Obtains the repository of one entity through an external factory.
///
/// The factory runs on first use; the instance and its derived
/// [`RepositoryType`] are then kept for the accessor's lifetime. The
/// factory is assumed to return the same repository type every time.
pub struct RepositoryAccessor {
    entity: EntityName,
    factory: Box<RepositoryFactory>,
    instance: OnceLock<RepositoryHandle>,
    repository_type: OnceLock<Arc<RepositoryType>>,
}

impl RepositoryAccessor {
    pub fn new<F>(entity: impl Into<EntityName>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<RepositoryHandle> + Send + Sync + 'static,
    {
        Self {
            entity: entity.into(),
            factory: Box::new(factory),
            instance: OnceLock::new(),
            repository_type: OnceLock::new(),
        }
    }

    /// An accessor around an already created repository.
    pub fn from_handle(entity: impl Into<EntityName>, handle: RepositoryHandle) -> Self {
        let accessor = Self::new(entity, {
            let handle = handle.clone();
            move || Ok(handle.clone())
        });
        let _ = accessor.instance.set(handle);
        accessor
    }

    /// The repository instance, created by the factory on first call.
    pub fn repository(&self) -> Result<&RepositoryHandle> {
        if let Some(handle) = self.instance.get() {
            return Ok(handle);
        }
        let handle = (self.factory)().map_err(|e| DispatchError::RepositoryUnavailable {
            entity: self.entity.to_string(),
            source: e.into(),
        })?;
        Ok(self.instance.get_or_init(|| {
            debug!(
                entity = %self.entity,
                repository = handle.descriptor().name(),
                "Repository instance created"
            );
            handle
        }))
    }

    /// The method table of the repository's concrete type.
    pub fn repository_type(&self) -> Result<Arc<RepositoryType>> {
        if let Some(ty) = self.repository_type.get() {
            return Ok(Arc::clone(ty));
        }
        let ty = Arc::new(self.repository()?.repository_type());
        let cached = self.repository_type.get_or_init(|| {
            debug!(
                entity = %self.entity,
                repository = ty.descriptor().name(),
                methods = ty.methods().len(),
                "Repository type derived"
            );
            ty
        });
        Ok(Arc::clone(cached))
    }
}

impl fmt::Debug for RepositoryAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryAccessor")
            .field("entity", &self.entity)
            .field("instance", &self.instance.get())
            .finish_non_exhaustive()
    }
}
