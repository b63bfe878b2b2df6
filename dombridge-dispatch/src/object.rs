//! The caller's view of entities: objects and queries seen through a
//! capability interface `I`.

use crate::entity::DynEntity;
use dombridge_model::{Queryable, TypeDescriptor};
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

type UpcastFn<I> = dyn Fn(DynEntity) -> Option<Arc<I>> + Send + Sync;

/// Turns a type-erased entity into its capability-interface view.
pub(crate) struct Upcaster<I: ?Sized>(Arc<UpcastFn<I>>);

impl<I: ?Sized> Clone for Upcaster<I> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<I: ?Sized + 'static> Upcaster<I> {
    pub(crate) fn for_entity<E>(upcast: fn(Arc<E>) -> Arc<I>) -> Self
    where
        E: Send + Sync + 'static,
    {
        Self(Arc::new(move |entity: DynEntity| {
            entity.downcast::<E>().ok().map(upcast)
        }))
    }

    /// Returns `None` when `entity` is not of the registered entity type.
    pub(crate) fn view(&self, entity: DynEntity) -> Option<EntityObject<I>> {
        let view = (self.0)(Arc::clone(&entity))?;
        Some(EntityObject {
            concrete: entity,
            view,
        })
    }
}

/// One entity seen through capability interface `I`.
///
/// Dereferences to `I`. The concrete instance is kept alongside the view so
/// the object can be handed back to repository operations such as `save`.
pub struct EntityObject<I: ?Sized> {
    concrete: DynEntity,
    view: Arc<I>,
}

impl<I: ?Sized> EntityObject<I> {
    /// The capability view, shareable on its own.
    pub fn view(&self) -> &Arc<I> {
        &self.view
    }

    /// Borrows the concrete entity when it is an `E`.
    pub fn downcast_ref<E: Any>(&self) -> Option<&E> {
        self.concrete.downcast_ref::<E>()
    }

    /// Returns true when both objects refer to the same entity instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.concrete, &other.concrete)
    }

    pub(crate) fn concrete(&self) -> &DynEntity {
        &self.concrete
    }

    pub(crate) fn into_concrete(self) -> DynEntity {
        self.concrete
    }
}

impl<I: ?Sized> Clone for EntityObject<I> {
    fn clone(&self) -> Self {
        Self {
            concrete: Arc::clone(&self.concrete),
            view: Arc::clone(&self.view),
        }
    }
}

impl<I: ?Sized> Deref for EntityObject<I> {
    type Target = I;

    fn deref(&self) -> &I {
        &self.view
    }
}

impl<I: ?Sized + fmt::Debug> fmt::Debug for EntityObject<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.view, f)
    }
}

/// A queryable of type-erased entities that all share one concrete type.
pub(crate) struct ErasedQueryable {
    pub(crate) element: TypeDescriptor,
    pub(crate) items: Queryable<DynEntity>,
}

/// A lazy query over entities, seen through capability interface `I`.
///
/// Produced by `query` and `as_queryable`, and accepted back by
/// `filter_queryable`. Nothing runs until the query is iterated.
pub struct EntityQuery<I: ?Sized> {
    inner: ErasedQueryable,
    upcaster: Upcaster<I>,
}

impl<I: ?Sized + 'static> EntityQuery<I> {
    pub(crate) fn new(inner: ErasedQueryable, upcaster: Upcaster<I>) -> Self {
        Self { inner, upcaster }
    }

    pub(crate) fn into_erased(self) -> ErasedQueryable {
        self.inner
    }

    /// The concrete entity type the query yields.
    pub fn element_type(&self) -> TypeDescriptor {
        self.inner.element
    }

    /// Keeps the entities whose capability view matches `predicate`.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&I) -> bool + Send + 'static,
    {
        let upcaster = self.upcaster.clone();
        let matcher = self.upcaster.clone();
        let items = self.inner.items.filter(move |entity| {
            matcher
                .view(Arc::clone(entity))
                .is_some_and(|object| predicate(&*object))
        });
        Self {
            inner: ErasedQueryable {
                element: self.inner.element,
                items,
            },
            upcaster,
        }
    }

    pub fn skip(self, n: usize) -> Self {
        Self {
            inner: ErasedQueryable {
                element: self.inner.element,
                items: self.inner.items.skip(n),
            },
            upcaster: self.upcaster,
        }
    }

    pub fn take(self, n: usize) -> Self {
        Self {
            inner: ErasedQueryable {
                element: self.inner.element,
                items: self.inner.items.take(n),
            },
            upcaster: self.upcaster,
        }
    }

    /// Evaluates the query.
    pub fn to_list(self) -> Vec<EntityObject<I>> {
        self.into_iter().collect()
    }
}

impl<I: ?Sized + 'static> IntoIterator for EntityQuery<I> {
    type Item = EntityObject<I>;
    type IntoIter = Box<dyn Iterator<Item = EntityObject<I>>>;

    fn into_iter(self) -> Self::IntoIter {
        let upcaster = self.upcaster;
        // Every item was erased from the element type, so the view always exists.
        Box::new(
            self.inner
                .items
                .into_iter()
                .filter_map(move |entity| upcaster.view(entity)),
        )
    }
}

impl<I: ?Sized> fmt::Debug for EntityQuery<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityQuery")
            .field("element", &self.inner.element)
            .finish_non_exhaustive()
    }
}
