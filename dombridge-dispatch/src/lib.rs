//! Dispatch bridge between generic callers and a runtime-assembled domain
//! object model.
//!
//! Generic code is written against a capability interface (a trait such as
//! `dyn Named`) and an entity name. The concrete entity types and their
//! repositories are registered later, when the domain object model is
//! assembled. This crate resolves the name to the registered type, checks
//! that it implements the caller's capability, binds the requested
//! repository operation by signature shape, and invokes it while converting
//! between the caller's view ([`EntityObject`], [`EntityQuery`]) and the
//! entity-specific types the repository works with.
//!
//! # Components
//!
//! - [`TypeCatalog`] / [`DomainCatalog`]: name to [`EntityTypeInfo`] registry
//! - [`EntityTypeResolver`]: cached, capability-checked type resolution
//! - [`RepositoryAccessor`]: lazily created repository instance and its method table
//! - [`OperationBinder`]: cached `(operation, parameter type)` to method bindings
//! - [`EntityAccess`]: the facade that invokes bound operations
//!
//! Every cache is filled on first use and is safe to fill concurrently:
//! each fill is a pure function of its key, and the first stored value wins.

mod access;
mod accessor;
mod binder;
mod catalog;
mod entity;
mod error;
mod invoker;
mod object;
mod repository;
mod resolver;
mod value;

pub use access::EntityAccess;
pub use accessor::RepositoryAccessor;
pub use binder::{BindingTarget, OperationBinder, OperationBinding, expected_signature};
pub use catalog::{DomainCatalog, TypeCatalog};
pub use entity::{DynEntity, EntityShapes, EntityTypeBuilder, EntityTypeInfo};
pub use error::{BoxError, DispatchError, Result};
pub use object::{EntityObject, EntityQuery};
pub use repository::{MethodInfo, Repository, RepositoryBuilder, RepositoryHandle, RepositoryType};
pub use resolver::EntityTypeResolver;

pub use dombridge_model::{
    EntityName, OperationKind, QueryDataResult, QueryDescriptor, Queryable, TypeDescriptor,
};
