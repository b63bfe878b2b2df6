//! The facade generic callers use to run repository operations on an
//! entity known only by name.

use crate::accessor::RepositoryAccessor;
use crate::binder::{BindingTarget, OperationBinder, OperationBinding};
use crate::catalog::TypeCatalog;
use crate::entity::{DynEntity, EntityTypeInfo};
use crate::error::{DispatchError, Result};
use crate::invoker::{self, InvocationContext};
use crate::object::{EntityObject, EntityQuery, ErasedQueryable};
use crate::repository::RepositoryHandle;
use crate::resolver::EntityTypeResolver;
use crate::value::Value;
use dombridge_model::{
    EntityName, OperationKind, QueryDataResult, QueryDescriptor, Queryable, TypeDescriptor,
};
use std::sync::Arc;

/// Runs repository operations for one entity, seen through capability `I`.
///
/// Combines an [`EntityTypeResolver`], a [`RepositoryAccessor`] and an
/// [`OperationBinder`]; all three fill their caches on first use. Create one
/// per request or session: the repository instance is not assumed safe for
/// concurrent calls and no locking is added around them.
///
/// ```ignore
/// let customers: EntityAccess<dyn Named> =
///     EntityAccess::new("Customer", catalog, move || Ok(RepositoryHandle::new(repo.clone())));
/// let acme = customers.filter(CustomerQuery { name: "Acme".into() })?;
/// ```
pub struct EntityAccess<I: ?Sized + 'static> {
    resolver: EntityTypeResolver<I>,
    repository: RepositoryAccessor,
    binder: OperationBinder,
}

impl<I: ?Sized + 'static> EntityAccess<I> {
    /// `factory` is called lazily, the first time an operation needs the repository.
    pub fn new<F>(
        entity: impl Into<EntityName>,
        catalog: Arc<dyn TypeCatalog>,
        factory: F,
    ) -> Self
    where
        F: Fn() -> anyhow::Result<RepositoryHandle> + Send + Sync + 'static,
    {
        let entity = entity.into();
        Self {
            resolver: EntityTypeResolver::new(entity.clone(), catalog),
            repository: RepositoryAccessor::new(entity, factory),
            binder: OperationBinder::new(),
        }
    }

    /// Assembles the facade from separately built components.
    pub fn from_parts(
        resolver: EntityTypeResolver<I>,
        repository: RepositoryAccessor,
        binder: OperationBinder,
    ) -> Self {
        Self {
            resolver,
            repository,
            binder,
        }
    }

    pub fn entity_name(&self) -> &EntityName {
        self.resolver.entity_name()
    }

    pub fn resolver(&self) -> &EntityTypeResolver<I> {
        &self.resolver
    }

    pub fn repository(&self) -> &RepositoryAccessor {
        &self.repository
    }

    pub fn binder(&self) -> &OperationBinder {
        &self.binder
    }

    /// Resolves (or reuses) the binding for `kind` and the optional filter
    /// parameter type.
    pub fn binding(
        &self,
        kind: OperationKind,
        parameter: Option<TypeDescriptor>,
    ) -> Result<OperationBinding> {
        let shapes = self.resolver.resolve_all_shapes()?;
        let repository = self.repository.repository_type()?;
        self.binder.bind(
            kind,
            parameter,
            &BindingTarget {
                entity: self.resolver.entity_name(),
                shapes: &shapes,
                repository: &repository,
            },
        )
    }

    fn context(
        &self,
        operation: OperationKind,
        parameter: Option<TypeDescriptor>,
    ) -> InvocationContext<'_> {
        InvocationContext {
            entity: self.resolver.entity_name(),
            operation,
            parameter,
        }
    }

    fn call(
        &self,
        kind: OperationKind,
        parameter: Option<TypeDescriptor>,
        args: Vec<Value>,
    ) -> Result<Value> {
        let binding = self.binding(kind, parameter)?;
        self.call_bound(&binding, kind, parameter, args)
    }

    fn call_bound(
        &self,
        binding: &OperationBinding,
        kind: OperationKind,
        parameter: Option<TypeDescriptor>,
        args: Vec<Value>,
    ) -> Result<Value> {
        let repository = self.repository.repository()?;
        invoker::invoke(binding, repository, args, &self.context(kind, parameter))
    }

    fn entity_type(&self) -> Result<Arc<EntityTypeInfo>> {
        self.resolver.resolve_entity_type()
    }

    fn sequence_result(
        &self,
        value: Value,
        kind: OperationKind,
        parameter: Option<TypeDescriptor>,
    ) -> Result<Vec<EntityObject<I>>> {
        let context = self.context(kind, parameter);
        let items = value.into_sequence(0).map_err(|e| context.wrap(e))?;
        let info = self.entity_type()?;
        invoker::to_objects(items, &self.resolver.upcaster()?, &info, &context)
    }

    fn query_result(
        &self,
        value: Value,
        kind: OperationKind,
        parameter: Option<TypeDescriptor>,
    ) -> Result<EntityQuery<I>> {
        let context = self.context(kind, parameter);
        let query = value.into_queryable(0).map_err(|e| context.wrap(e))?;
        Ok(EntityQuery::new(query, self.resolver.upcaster()?))
    }

    /// Loads every entity.
    pub fn load(&self) -> Result<Vec<EntityObject<I>>> {
        let value = self.call(OperationKind::Load, None, Vec::new())?;
        self.sequence_result(value, OperationKind::Load, None)
    }

    /// Opens a lazy query over every entity.
    pub fn query(&self) -> Result<EntityQuery<I>> {
        let value = self.call(OperationKind::Query, None, Vec::new())?;
        self.query_result(value, OperationKind::Query, None)
    }

    /// Loads the entities matching `parameter`, using the `filter` overload
    /// declared for exactly `P`.
    pub fn filter<P: Send + 'static>(&self, parameter: P) -> Result<Vec<EntityObject<I>>> {
        let parameter_type = Some(TypeDescriptor::of::<P>());
        let value = self.call(
            OperationKind::Filter,
            parameter_type,
            vec![Value::Parameter(Box::new(parameter))],
        )?;
        self.sequence_result(value, OperationKind::Filter, parameter_type)
    }

    /// Narrows `query` with the `filter_queryable` overload declared for `P`.
    pub fn filter_queryable<P: Send + 'static>(
        &self,
        query: EntityQuery<I>,
        parameter: P,
    ) -> Result<EntityQuery<I>> {
        let parameter_type = Some(TypeDescriptor::of::<P>());
        let value = self.call(
            OperationKind::FilterQueryable,
            parameter_type,
            vec![
                Value::Queryable(query.into_erased()),
                Value::Parameter(Box::new(parameter)),
            ],
        )?;
        self.query_result(value, OperationKind::FilterQueryable, parameter_type)
    }

    /// Persists the three batches. The arguments reach the repository in
    /// this order, unmodified apart from the conversion to the entity type.
    ///
    /// A repository without `save` fails with
    /// [`DispatchError::OperationNotSupported`] before any batch is checked.
    pub fn save(
        &self,
        insert: Vec<EntityObject<I>>,
        update: Vec<EntityObject<I>>,
        delete: Vec<EntityObject<I>>,
        check_permissions: bool,
    ) -> Result<()> {
        let binding = self.binding(OperationKind::Save, None)?;
        let info = self.entity_type()?;
        let context = self.context(OperationKind::Save, None);
        let sequence = |items: Vec<EntityObject<I>>, position: usize| {
            invoker::to_sequence(items, &info, position)
                .map(Value::Sequence)
                .map_err(|e| context.wrap(e))
        };
        let args = vec![
            sequence(insert, 0)?,
            sequence(update, 1)?,
            sequence(delete, 2)?,
            Value::Bool(check_permissions),
        ];
        self.call_bound(&binding, OperationKind::Save, None, args)?;
        Ok(())
    }

    /// Runs an opaque query command; `descriptor` is passed on unmodified.
    pub fn query_data(
        &self,
        descriptor: QueryDescriptor,
    ) -> Result<QueryDataResult<EntityObject<I>>> {
        let value = self.call(OperationKind::QueryData, None, vec![Value::Query(descriptor)])?;
        let context = self.context(OperationKind::QueryData, None);
        let result = value.into_query_result().map_err(|e| context.wrap(e))?;
        let info = self.entity_type()?;
        let upcaster = self.resolver.upcaster()?;
        result.try_map(|item| invoker::to_object(item, &upcaster, &info, &context))
    }

    /// Wraps already loaded objects in a query that can be composed and
    /// passed to [`EntityAccess::filter_queryable`].
    pub fn as_queryable(&self, items: Vec<EntityObject<I>>) -> Result<EntityQuery<I>> {
        let info = self.entity_type()?;
        let items = invoker::to_sequence(items, &info, 0)?;
        let inner = ErasedQueryable {
            element: info.descriptor(),
            items: Queryable::new(items),
        };
        Ok(EntityQuery::new(inner, self.resolver.upcaster()?))
    }

    /// Views type-erased entity instances through `I`.
    ///
    /// Fails with [`DispatchError::ArgumentType`] naming the first item that
    /// is not an instance of the resolved entity type.
    pub fn cast_entities(&self, items: Vec<DynEntity>) -> Result<Vec<EntityObject<I>>> {
        let info = self.entity_type()?;
        let upcaster = self.resolver.upcaster()?;
        items
            .into_iter()
            .enumerate()
            .map(|(position, item)| {
                upcaster.view(item).ok_or(DispatchError::ArgumentType {
                    position,
                    expected: info.descriptor().name(),
                })
            })
            .collect()
    }

    /// Views one concrete entity through `I`, e.g. a freshly created record
    /// to pass to [`EntityAccess::save`].
    pub fn wrap<E: Send + Sync + 'static>(&self, entity: E) -> Result<EntityObject<I>> {
        let mut objects = self.cast_entities(vec![Arc::new(entity) as DynEntity])?;
        Ok(objects.remove(0))
    }
}
