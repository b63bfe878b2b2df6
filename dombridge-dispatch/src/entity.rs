//! Registered entity types and the capability interfaces they implement.

use crate::object::Upcaster;
use dombridge_model::{EntityName, QueryDataResult, Queryable, TypeDescriptor};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A type-erased entity instance as it crosses the dispatch boundary.
pub type DynEntity = Arc<dyn Any + Send + Sync>;

/// Entity-specific collection shapes derived from an entity type `E`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityShapes {
    /// `Vec<E>`: what `load` and `filter` return.
    pub sequence: TypeDescriptor,
    /// `[E]`: what `save` receives for each of its three batches.
    pub list: TypeDescriptor,
    /// `Queryable<E>`: what `query` returns and `filter_queryable` narrows.
    pub queryable: TypeDescriptor,
    /// `QueryDataResult<E>`: what `query_data` returns.
    pub query_result: TypeDescriptor,
}

impl EntityShapes {
    #[must_use]
    pub fn of<E: 'static>() -> Self {
        Self {
            sequence: TypeDescriptor::of::<Vec<E>>(),
            list: TypeDescriptor::of::<[E]>(),
            queryable: TypeDescriptor::of::<Queryable<E>>(),
            query_result: TypeDescriptor::of::<QueryDataResult<E>>(),
        }
    }
}

struct CapabilityEntry {
    interface: TypeDescriptor,
    /// Holds an `Upcaster<I>` for the interface above.
    upcaster: Box<dyn Any + Send + Sync>,
}

/// A concrete entity type registered in the domain object model.
pub struct EntityTypeInfo {
    name: EntityName,
    descriptor: TypeDescriptor,
    derive_shapes: fn() -> EntityShapes,
    capabilities: Vec<CapabilityEntry>,
}

impl EntityTypeInfo {
    /// Starts describing entity type `E` registered under `name`.
    pub fn builder<E>(name: impl Into<EntityName>) -> EntityTypeBuilder<E>
    where
        E: Clone + Send + Sync + 'static,
    {
        EntityTypeBuilder {
            info: EntityTypeInfo {
                name: name.into(),
                descriptor: TypeDescriptor::of::<E>(),
                derive_shapes: EntityShapes::of::<E>,
                capabilities: Vec::new(),
            },
            _entity: std::marker::PhantomData,
        }
    }

    pub fn name(&self) -> &EntityName {
        &self.name
    }

    /// The concrete Rust type of the entity.
    pub fn descriptor(&self) -> TypeDescriptor {
        self.descriptor
    }

    /// Derives the collection shapes of this entity type.
    pub fn shapes(&self) -> EntityShapes {
        (self.derive_shapes)()
    }

    /// Returns true when the entity type declares capability `I`.
    pub fn implements<I: ?Sized + 'static>(&self) -> bool {
        let wanted = TypeDescriptor::of::<I>();
        self.capabilities.iter().any(|c| c.interface == wanted)
    }

    /// All declared capability interfaces, in registration order.
    pub fn capabilities(&self) -> impl Iterator<Item = TypeDescriptor> + '_ {
        self.capabilities.iter().map(|c| c.interface)
    }

    /// Returns true when `item` is an instance of this entity type.
    pub fn is_instance(&self, item: &DynEntity) -> bool {
        let concrete: &dyn Any = &**item;
        concrete.type_id() == self.descriptor.id()
    }

    pub(crate) fn upcaster<I: ?Sized + 'static>(&self) -> Option<Upcaster<I>> {
        let wanted = TypeDescriptor::of::<I>();
        self.capabilities
            .iter()
            .find(|c| c.interface == wanted)
            .and_then(|c| c.upcaster.downcast_ref::<Upcaster<I>>())
            .cloned()
    }
}

impl fmt::Debug for EntityTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityTypeInfo")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .field("capabilities", &self.capabilities().collect::<Vec<_>>())
            .finish()
    }
}

/// Declares the capability interfaces of an entity type before registration.
pub struct EntityTypeBuilder<E> {
    info: EntityTypeInfo,
    _entity: std::marker::PhantomData<fn() -> E>,
}

impl<E> EntityTypeBuilder<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Declares that `E` implements capability interface `I`.
    ///
    /// `upcast` turns a shared entity into the interface view, usually just
    /// an unsizing coercion: `|c| c as Arc<dyn Named>`. Declaring the same
    /// interface twice keeps the last upcast.
    pub fn implements<I>(mut self, upcast: fn(Arc<E>) -> Arc<I>) -> Self
    where
        I: ?Sized + 'static,
    {
        let interface = TypeDescriptor::of::<I>();
        self.info.capabilities.retain(|c| c.interface != interface);
        self.info.capabilities.push(CapabilityEntry {
            interface,
            upcaster: Box::new(Upcaster::<I>::for_entity(upcast)),
        });
        self
    }

    pub fn build(self) -> EntityTypeInfo {
        self.info
    }
}
