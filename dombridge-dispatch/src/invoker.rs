//! Calls bound methods and converts between the caller's view and the
//! type-erased values bound methods work with.

use crate::entity::{DynEntity, EntityTypeInfo};
use crate::error::{DispatchError, Result};
use crate::object::{EntityObject, Upcaster};
use crate::repository::{MethodInfo, RepositoryHandle};
use crate::value::Value;
use dombridge_model::{EntityName, OperationKind, TypeDescriptor};
use tracing::debug;

/// Identifies one invocation in error messages and logs.
pub(crate) struct InvocationContext<'a> {
    pub(crate) entity: &'a EntityName,
    pub(crate) operation: OperationKind,
    pub(crate) parameter: Option<TypeDescriptor>,
}

impl InvocationContext<'_> {
    pub(crate) fn wrap(&self, source: impl Into<crate::error::BoxError>) -> DispatchError {
        DispatchError::Invocation {
            entity: self.entity.to_string(),
            operation: self.operation,
            parameter_type: self.parameter.map(|p| p.name().to_string()),
            source: source.into(),
        }
    }
}

/// Runs `binding` on the repository instance. Failures come back wrapped
/// with the invocation context; nothing is retried.
pub(crate) fn invoke(
    binding: &MethodInfo,
    repository: &RepositoryHandle,
    args: Vec<Value>,
    context: &InvocationContext<'_>,
) -> Result<Value> {
    binding.call(repository.instance(), args).map_err(|e| {
        debug!(
            entity = %context.entity,
            operation = %context.operation,
            error = %e,
            "Repository operation failed"
        );
        context.wrap(e)
    })
}

/// Converts caller objects into an entity sequence, rejecting objects of
/// another entity type before anything is called.
pub(crate) fn to_sequence<I: ?Sized>(
    items: Vec<EntityObject<I>>,
    entity_type: &EntityTypeInfo,
    position: usize,
) -> Result<Vec<DynEntity>> {
    if items.iter().any(|item| !entity_type.is_instance(item.concrete())) {
        return Err(DispatchError::ArgumentType {
            position,
            expected: entity_type.descriptor().name(),
        });
    }
    Ok(items.into_iter().map(EntityObject::into_concrete).collect())
}

/// Views every entity of a result sequence through the caller's interface.
pub(crate) fn to_objects<I: ?Sized + 'static>(
    items: Vec<DynEntity>,
    upcaster: &Upcaster<I>,
    entity_type: &EntityTypeInfo,
    context: &InvocationContext<'_>,
) -> Result<Vec<EntityObject<I>>> {
    items
        .into_iter()
        .map(|item| to_object(item, upcaster, entity_type, context))
        .collect()
}

pub(crate) fn to_object<I: ?Sized + 'static>(
    item: DynEntity,
    upcaster: &Upcaster<I>,
    entity_type: &EntityTypeInfo,
    context: &InvocationContext<'_>,
) -> Result<EntityObject<I>> {
    upcaster.view(item).ok_or_else(|| {
        context.wrap(anyhow::anyhow!(
            "result item is not a {}",
            entity_type.descriptor().name()
        ))
    })
}
