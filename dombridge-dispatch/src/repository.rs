//! Repository method tables.
//!
//! A repository declares the operations it supports once, through
//! [`Repository::describe`]. Each declaration becomes a [`MethodInfo`]: the
//! operation kind, its parameter and return shapes, and a type-erased
//! callable that converts between [`Value`]s and the repository's own
//! entity-specific types.

use crate::entity::{DynEntity, EntityShapes};
use crate::object::ErasedQueryable;
use crate::value::{Arguments, Value, argument_error};
use dombridge_model::{OperationKind, QueryDataResult, QueryDescriptor, Queryable, TypeDescriptor};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

type ErasedCall =
    dyn Fn(&(dyn Any + Send + Sync), Arguments) -> anyhow::Result<Value> + Send + Sync;

/// A data-access object for one entity type of the domain object model.
///
/// Implementations declare which operations they expose; any operation left
/// out is reported as unsupported when a caller asks for it.
pub trait Repository: Send + Sync + 'static {
    /// The concrete entity type this repository loads and saves.
    type Entity: Clone + Send + Sync + 'static;

    /// Declares the supported operations on `methods` and returns it.
    fn describe(methods: RepositoryBuilder<Self>) -> RepositoryBuilder<Self>
    where
        Self: Sized;
}

/// One operation implementation on a repository type.
pub struct MethodInfo {
    kind: OperationKind,
    parameters: Vec<TypeDescriptor>,
    returns: TypeDescriptor,
    call: Box<ErasedCall>,
}

impl MethodInfo {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn parameters(&self) -> &[TypeDescriptor] {
        &self.parameters
    }

    pub fn returns(&self) -> TypeDescriptor {
        self.returns
    }

    pub(crate) fn call(
        &self,
        repository: &(dyn Any + Send + Sync),
        args: Vec<Value>,
    ) -> anyhow::Result<Value> {
        (self.call)(repository, Arguments::new(args))
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) -> {}",
            self.kind,
            TypeDescriptor::join(&self.parameters),
            self.returns
        )
    }
}

/// The method table of one repository type.
#[derive(Debug)]
pub struct RepositoryType {
    descriptor: TypeDescriptor,
    entity: TypeDescriptor,
    methods: Vec<Arc<MethodInfo>>,
}

impl RepositoryType {
    /// Builds the method table of `R`.
    pub fn of<R: Repository>() -> Self {
        R::describe(RepositoryBuilder::new()).build()
    }

    /// The concrete repository type.
    pub fn descriptor(&self) -> TypeDescriptor {
        self.descriptor
    }

    /// The entity type the repository declares.
    pub fn entity(&self) -> TypeDescriptor {
        self.entity
    }

    pub fn methods(&self) -> &[Arc<MethodInfo>] {
        &self.methods
    }

    /// Finds the method of `kind` whose parameters and return shape match exactly.
    pub fn find_method(
        &self,
        kind: OperationKind,
        parameters: &[TypeDescriptor],
        returns: TypeDescriptor,
    ) -> Option<Arc<MethodInfo>> {
        self.methods
            .iter()
            .find(|m| m.kind == kind && m.parameters == parameters && m.returns == returns)
            .cloned()
    }
}

/// Collects the operation declarations of repository `R`.
pub struct RepositoryBuilder<R: Repository> {
    methods: Vec<Arc<MethodInfo>>,
    _repository: PhantomData<fn() -> R>,
}

impl<R: Repository> RepositoryBuilder<R> {
    fn new() -> Self {
        Self {
            methods: Vec::new(),
            _repository: PhantomData,
        }
    }

    fn shapes() -> EntityShapes {
        EntityShapes::of::<R::Entity>()
    }

    fn push<F>(
        mut self,
        kind: OperationKind,
        parameters: Vec<TypeDescriptor>,
        returns: TypeDescriptor,
        call: F,
    ) -> Self
    where
        F: Fn(&R, Arguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let erased = move |instance: &(dyn Any + Send + Sync), args: Arguments| {
            let repository = instance
                .downcast_ref::<R>()
                .ok_or_else(|| argument_error::<R>(0))?;
            call(repository, args)
        };
        // A later declaration of the same shape replaces the earlier one.
        self.methods
            .retain(|m| !(m.kind == kind && m.parameters == parameters));
        self.methods.push(Arc::new(MethodInfo {
            kind,
            parameters,
            returns,
            call: Box::new(erased),
        }));
        self
    }

    /// Declares `load`: every entity of the repository.
    pub fn load<F>(self, load: F) -> Self
    where
        F: Fn(&R) -> anyhow::Result<Vec<R::Entity>> + Send + Sync + 'static,
    {
        let returns = Self::shapes().sequence;
        self.push(OperationKind::Load, Vec::new(), returns, move |repo, _| {
            Ok(Value::Sequence(erase_all(load(repo)?)))
        })
    }

    /// Declares `query`: a lazy query over every entity.
    pub fn query<F>(self, query: F) -> Self
    where
        F: Fn(&R) -> anyhow::Result<Queryable<R::Entity>> + Send + Sync + 'static,
    {
        let returns = Self::shapes().queryable;
        self.push(OperationKind::Query, Vec::new(), returns, move |repo, _| {
            Ok(Value::Queryable(erase_query(query(repo)?)))
        })
    }

    /// Declares a `filter` overload for parameter type `P`.
    pub fn filter<P, F>(self, filter: F) -> Self
    where
        P: Send + 'static,
        F: Fn(&R, P) -> anyhow::Result<Vec<R::Entity>> + Send + Sync + 'static,
    {
        let returns = Self::shapes().sequence;
        self.push(
            OperationKind::Filter,
            vec![TypeDescriptor::of::<P>()],
            returns,
            move |repo, mut args| {
                let parameter = args.parameter::<P>()?;
                Ok(Value::Sequence(erase_all(filter(repo, parameter)?)))
            },
        )
    }

    /// Declares a `filter_queryable` overload for parameter type `P`.
    pub fn filter_queryable<P, F>(self, filter: F) -> Self
    where
        P: Send + 'static,
        F: Fn(&R, Queryable<R::Entity>, P) -> anyhow::Result<Queryable<R::Entity>>
            + Send
            + Sync
            + 'static,
    {
        let shapes = Self::shapes();
        self.push(
            OperationKind::FilterQueryable,
            vec![shapes.queryable, TypeDescriptor::of::<P>()],
            shapes.queryable,
            move |repo, mut args| {
                let (source, position) = args.queryable()?;
                let source = restore_query::<R::Entity>(source, position)?;
                let parameter = args.parameter::<P>()?;
                Ok(Value::Queryable(erase_query(filter(repo, source, parameter)?)))
            },
        )
    }

    /// Declares `save` for inserted, updated and deleted entities.
    pub fn save<F>(self, save: F) -> Self
    where
        F: Fn(&R, &[R::Entity], &[R::Entity], &[R::Entity], bool) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        let list = Self::shapes().list;
        self.push(
            OperationKind::Save,
            vec![list, list, list, TypeDescriptor::of::<bool>()],
            TypeDescriptor::of::<()>(),
            move |repo, mut args| {
                let (insert, position) = args.sequence()?;
                let insert = restore_all::<R::Entity>(insert, position)?;
                let (update, position) = args.sequence()?;
                let update = restore_all::<R::Entity>(update, position)?;
                let (delete, position) = args.sequence()?;
                let delete = restore_all::<R::Entity>(delete, position)?;
                let check_permissions = args.bool()?;
                save(repo, &insert, &update, &delete, check_permissions)?;
                Ok(Value::Unit)
            },
        )
    }

    /// Declares `query_data` for opaque query commands.
    pub fn query_data<F>(self, query_data: F) -> Self
    where
        F: Fn(&R, QueryDescriptor) -> anyhow::Result<QueryDataResult<R::Entity>>
            + Send
            + Sync
            + 'static,
    {
        let returns = Self::shapes().query_result;
        self.push(
            OperationKind::QueryData,
            vec![TypeDescriptor::of::<QueryDescriptor>()],
            returns,
            move |repo, mut args| {
                let descriptor = args.query()?;
                let result = query_data(repo, descriptor)?;
                Ok(Value::QueryResult(result.map(erase)))
            },
        )
    }

    fn build(self) -> RepositoryType {
        RepositoryType {
            descriptor: TypeDescriptor::of::<R>(),
            entity: TypeDescriptor::of::<R::Entity>(),
            methods: self.methods,
        }
    }
}

fn erase<E: Send + Sync + 'static>(entity: E) -> DynEntity {
    Arc::new(entity)
}

fn erase_all<E: Send + Sync + 'static>(entities: Vec<E>) -> Vec<DynEntity> {
    entities.into_iter().map(erase).collect()
}

fn erase_query<E: Send + Sync + 'static>(query: Queryable<E>) -> ErasedQueryable {
    ErasedQueryable {
        element: TypeDescriptor::of::<E>(),
        items: query.map(erase),
    }
}

fn restore<E: Clone + Send + Sync + 'static>(entity: DynEntity) -> Option<E> {
    entity.downcast::<E>().ok().map(Arc::unwrap_or_clone)
}

fn restore_all<E: Clone + Send + Sync + 'static>(
    entities: Vec<DynEntity>,
    position: usize,
) -> anyhow::Result<Vec<E>> {
    entities
        .into_iter()
        .map(|entity| restore::<E>(entity).ok_or_else(|| argument_error::<E>(position)))
        .collect()
}

fn restore_query<E: Clone + Send + Sync + 'static>(
    query: ErasedQueryable,
    position: usize,
) -> anyhow::Result<Queryable<E>> {
    if !query.element.is::<E>() {
        return Err(argument_error::<Queryable<E>>(position));
    }
    // The element check above guarantees every item downcasts.
    Ok(query.items.filter_map(restore::<E>))
}

/// A repository instance with its concrete type erased.
///
/// This is what the external repository factory hands to a
/// [`RepositoryAccessor`](crate::RepositoryAccessor).
#[derive(Clone)]
pub struct RepositoryHandle {
    instance: Arc<dyn Any + Send + Sync>,
    descriptor: TypeDescriptor,
    describe: fn() -> RepositoryType,
}

impl RepositoryHandle {
    pub fn new<R: Repository>(repository: Arc<R>) -> Self {
        Self {
            instance: repository,
            descriptor: TypeDescriptor::of::<R>(),
            describe: RepositoryType::of::<R>,
        }
    }

    /// The concrete repository type of the instance.
    pub fn descriptor(&self) -> TypeDescriptor {
        self.descriptor
    }

    /// Derives the method table of the instance's type.
    pub fn repository_type(&self) -> RepositoryType {
        (self.describe)()
    }

    pub(crate) fn instance(&self) -> &(dyn Any + Send + Sync) {
        &*self.instance
    }
}

impl fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("type", &self.descriptor)
            .finish_non_exhaustive()
    }
}
