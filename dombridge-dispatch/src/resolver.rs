//! Cached resolution of an entity name to its registered type.

use crate::catalog::TypeCatalog;
use crate::entity::{EntityShapes, EntityTypeInfo};
use crate::error::{DispatchError, Result};
use crate::object::Upcaster;
use dombridge_model::{EntityName, TypeDescriptor};
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Resolves one entity name to its concrete type, checked against the
/// caller's capability interface `I`.
///
/// Every result is computed at most once per resolver and reused for the
/// resolver's lifetime. Failures are not cached; the catalog is consulted
/// again on the next call.
pub struct EntityTypeResolver<I: ?Sized + 'static> {
    entity: EntityName,
    catalog: Arc<dyn TypeCatalog>,
    entity_type: OnceLock<Arc<EntityTypeInfo>>,
    shapes: OnceLock<EntityShapes>,
    upcaster: OnceLock<Upcaster<I>>,
    _capability: PhantomData<fn() -> Box<I>>,
}

impl<I: ?Sized + 'static> EntityTypeResolver<I> {
    pub fn new(entity: impl Into<EntityName>, catalog: Arc<dyn TypeCatalog>) -> Self {
        Self {
            entity: entity.into(),
            catalog,
            entity_type: OnceLock::new(),
            shapes: OnceLock::new(),
            upcaster: OnceLock::new(),
            _capability: PhantomData,
        }
    }

    pub fn entity_name(&self) -> &EntityName {
        &self.entity
    }

    /// The capability interface callers see entities through.
    pub fn capability(&self) -> TypeDescriptor {
        TypeDescriptor::of::<I>()
    }

    /// Looks the entity type up in the catalog and checks it implements `I`.
    pub fn resolve_entity_type(&self) -> Result<Arc<EntityTypeInfo>> {
        if let Some(info) = self.entity_type.get() {
            return Ok(Arc::clone(info));
        }

        let info = self.catalog.get_type(self.entity.as_str())?;
        if !info.implements::<I>() {
            return Err(capability_mismatch::<I>(&info));
        }

        let cached = self.entity_type.get_or_init(|| {
            debug!(
                entity = %self.entity,
                entity_type = info.descriptor().name(),
                capability = TypeDescriptor::of::<I>().name(),
                "Entity type resolved"
            );
            info
        });
        Ok(Arc::clone(cached))
    }

    fn resolve_shapes(&self) -> Result<&EntityShapes> {
        if let Some(shapes) = self.shapes.get() {
            return Ok(shapes);
        }
        let shapes = self.resolve_entity_type()?.shapes();
        Ok(self.shapes.get_or_init(|| shapes))
    }

    /// `Vec<E>` for the resolved entity type `E`.
    pub fn resolve_sequence_shape(&self) -> Result<TypeDescriptor> {
        Ok(self.resolve_shapes()?.sequence)
    }

    /// `[E]` for the resolved entity type `E`.
    pub fn resolve_list_shape(&self) -> Result<TypeDescriptor> {
        Ok(self.resolve_shapes()?.list)
    }

    /// `Queryable<E>` for the resolved entity type `E`.
    pub fn resolve_queryable_shape(&self) -> Result<TypeDescriptor> {
        Ok(self.resolve_shapes()?.queryable)
    }

    /// Every derived shape at once.
    pub fn resolve_all_shapes(&self) -> Result<EntityShapes> {
        self.resolve_shapes().copied()
    }

    pub(crate) fn upcaster(&self) -> Result<Upcaster<I>> {
        if let Some(upcaster) = self.upcaster.get() {
            return Ok(upcaster.clone());
        }
        let info = self.resolve_entity_type()?;
        let upcaster = info
            .upcaster::<I>()
            .ok_or_else(|| capability_mismatch::<I>(&info))?;
        Ok(self.upcaster.get_or_init(|| upcaster).clone())
    }
}

fn capability_mismatch<I: ?Sized + 'static>(info: &EntityTypeInfo) -> DispatchError {
    let implemented: Vec<_> = info.capabilities().map(|c| c.name()).collect();
    DispatchError::CapabilityMismatch {
        entity_type: info.descriptor().name().to_string(),
        implemented: if implemented.is_empty() {
            "nothing".to_string()
        } else {
            implemented.join(", ")
        },
        expected: TypeDescriptor::of::<I>().name().to_string(),
    }
}
