//! Cached binding of operation kinds to repository methods.

use crate::entity::EntityShapes;
use crate::error::{DispatchError, Result};
use crate::repository::{MethodInfo, RepositoryType};
use dombridge_model::{EntityName, OperationKind, QueryDescriptor, TypeDescriptor};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// A resolved reference to one operation implementation on one repository type.
///
/// Two bindings are the same binding when `Arc::ptr_eq` holds.
pub type OperationBinding = Arc<MethodInfo>;

/// Everything a binding is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct BindingTarget<'a> {
    pub entity: &'a EntityName,
    pub shapes: &'a EntityShapes,
    pub repository: &'a RepositoryType,
}

/// The parameter and return shapes an operation must have on a repository
/// of an entity with `shapes`.
///
/// Parameterized operations without a `parameter` get a signature no
/// repository method can match.
pub fn expected_signature(
    kind: OperationKind,
    parameter: Option<TypeDescriptor>,
    shapes: &EntityShapes,
) -> (Vec<TypeDescriptor>, TypeDescriptor) {
    match kind {
        OperationKind::Load => (Vec::new(), shapes.sequence),
        OperationKind::Query => (Vec::new(), shapes.queryable),
        OperationKind::Filter => (parameter.into_iter().collect(), shapes.sequence),
        OperationKind::FilterQueryable => (
            std::iter::once(shapes.queryable).chain(parameter).collect(),
            shapes.queryable,
        ),
        OperationKind::Save => (
            vec![
                shapes.list,
                shapes.list,
                shapes.list,
                TypeDescriptor::of::<bool>(),
            ],
            TypeDescriptor::of::<()>(),
        ),
        OperationKind::QueryData => (
            vec![TypeDescriptor::of::<QueryDescriptor>()],
            shapes.query_result,
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BindingKey {
    repository: TypeDescriptor,
    /// `Vec<E>` of the entity type the binding serves.
    entity: TypeDescriptor,
    kind: OperationKind,
    parameter: Option<TypeDescriptor>,
}

/// Outcome of one binding attempt. Both outcomes are cached.
#[derive(Debug, Clone)]
enum Resolution {
    Bound(OperationBinding),
    Missing,
}

/// Resolves and caches operation bindings, keyed by repository type, entity
/// type, operation kind and, for the overloaded filter operations, by the
/// runtime parameter type.
///
/// Each key is resolved once. Concurrent first resolution of a key may run
/// the lookup more than once; the first stored outcome wins and every
/// caller gets it.
#[derive(Debug, Default)]
pub struct OperationBinder {
    bindings: RwLock<HashMap<BindingKey, Resolution>>,
}

impl OperationBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the binding for `kind` (and `parameter` when overloaded).
    ///
    /// Fails with [`DispatchError::OperationNotSupported`] when the
    /// repository has no method of the expected shape.
    pub fn bind(
        &self,
        kind: OperationKind,
        parameter: Option<TypeDescriptor>,
        target: &BindingTarget<'_>,
    ) -> Result<OperationBinding> {
        let key = BindingKey {
            repository: target.repository.descriptor(),
            entity: target.shapes.sequence,
            kind,
            parameter: parameter.filter(|_| kind.is_parameterized()),
        };

        let cached = self
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        let resolution = match cached {
            Some(resolution) => resolution,
            None => {
                let resolved = resolve(key, target);
                self.bindings
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(key)
                    .or_insert(resolved)
                    .clone()
            }
        };

        match resolution {
            Resolution::Bound(binding) => Ok(binding),
            Resolution::Missing => {
                let (parameters, _) =
                    expected_signature(kind, key.parameter, target.shapes);
                Err(DispatchError::OperationNotSupported {
                    entity: target.entity.to_string(),
                    repository: target.repository.descriptor().name().to_string(),
                    operation: kind,
                    parameters: describe_parameters(kind, &parameters),
                })
            }
        }
    }

    /// Number of cached outcomes, found or missing.
    pub fn cached_bindings(&self) -> usize {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn resolve(key: BindingKey, target: &BindingTarget<'_>) -> Resolution {
    let (parameters, returns) =
        expected_signature(key.kind, key.parameter, target.shapes);
    match target.repository.find_method(key.kind, &parameters, returns) {
        Some(method) => {
            debug!(
                entity = %target.entity,
                operation = %key.kind,
                parameter = key.parameter.map(|p| p.name()).unwrap_or("none"),
                repository = target.repository.descriptor().name(),
                "Operation bound"
            );
            Resolution::Bound(method)
        }
        None => {
            warn!(
                entity = %target.entity,
                operation = %key.kind,
                parameter = key.parameter.map(|p| p.name()).unwrap_or("none"),
                repository = target.repository.descriptor().name(),
                "Repository does not support operation"
            );
            Resolution::Missing
        }
    }
}

fn describe_parameters(kind: OperationKind, parameters: &[TypeDescriptor]) -> String {
    if kind.is_parameterized() && parameters.len() < kind_arity(kind) {
        let mut described = TypeDescriptor::join(parameters);
        if !described.is_empty() {
            described.push_str(", ");
        }
        described.push_str("<missing parameter>");
        return described;
    }
    TypeDescriptor::join(parameters)
}

fn kind_arity(kind: OperationKind) -> usize {
    match kind {
        OperationKind::Load | OperationKind::Query => 0,
        OperationKind::Filter | OperationKind::QueryData => 1,
        OperationKind::FilterQueryable => 2,
        OperationKind::Save => 4,
    }
}
