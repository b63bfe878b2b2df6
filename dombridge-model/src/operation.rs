use serde::{Deserialize, Serialize};
use std::fmt;

/// The repository operations the dispatch bridge knows how to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Load every entity: `() -> Vec<E>`.
    Load,
    /// Open a lazy query over all entities: `() -> Queryable<E>`.
    Query,
    /// Load the entities matching a filter parameter: `(P) -> Vec<E>`.
    Filter,
    /// Narrow an existing query by a filter parameter:
    /// `(Queryable<E>, P) -> Queryable<E>`.
    FilterQueryable,
    /// Persist inserted, updated and deleted entities:
    /// `(&[E], &[E], &[E], bool) -> ()`.
    Save,
    /// Run an opaque query command: `(QueryDescriptor) -> QueryDataResult<E>`.
    QueryData,
}

impl OperationKind {
    /// All operation kinds, in declaration order.
    pub const ALL: [OperationKind; 6] = [
        OperationKind::Load,
        OperationKind::Query,
        OperationKind::Filter,
        OperationKind::FilterQueryable,
        OperationKind::Save,
        OperationKind::QueryData,
    ];

    /// Returns true for operations overloaded by filter parameter type.
    #[must_use]
    pub const fn is_parameterized(self) -> bool {
        matches!(self, OperationKind::Filter | OperationKind::FilterQueryable)
    }

    /// Stable name used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OperationKind::Load => "load",
            OperationKind::Query => "query",
            OperationKind::Filter => "filter",
            OperationKind::FilterQueryable => "filter_queryable",
            OperationKind::Save => "save",
            OperationKind::QueryData => "query_data",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
