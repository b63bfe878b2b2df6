//! Shared types for the dombridge dispatch layer.
//!
//! Defines the plain data types that both the dispatch bridge and the
//! dynamically assembled domain object model depend on:
//! - [`EntityName`]: the stable name an entity type is registered under
//! - [`TypeDescriptor`]: a named runtime type identity used for signature matching
//! - [`Queryable`]: a lazily evaluated, composable sequence of entities
//! - [`QueryDescriptor`] / [`QueryDataResult`]: the opaque query command and its result
//! - [`OperationKind`]: the fixed set of repository operations the bridge can bind
//!
//! None of these types know anything about concrete entities; they form the
//! contract between generic callers and the runtime-assembled model.

mod descriptor;
mod name;
mod operation;
mod query;
mod queryable;

pub use descriptor::TypeDescriptor;
pub use name::EntityName;
pub use operation::OperationKind;
pub use query::{QueryDataResult, QueryDescriptor, SortKey};
pub use queryable::Queryable;
