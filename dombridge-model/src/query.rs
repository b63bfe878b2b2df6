use serde::{Deserialize, Serialize};

/// A query command passed unmodified to a repository's `query_data` operation.
///
/// The dispatch layer never interprets these fields; they belong to the
/// query execution subsystem that builds them and the repository that runs
/// them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// Repository-specific filter expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<SortKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<usize>,
    /// Ask the repository to count all matching records, ignoring paging.
    #[serde(default)]
    pub read_total_count: bool,
}

impl QueryDescriptor {
    /// Shorthand for a descriptor carrying only a filter expression.
    pub fn with_filter(filter: serde_json::Value) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }
}

/// One ordering term of a [`QueryDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub property: String,
    #[serde(default)]
    pub descending: bool,
}

/// Records returned by a `query_data` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDataResult<T> {
    pub records: Vec<T>,
    /// Present only when the descriptor asked for `read_total_count`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
}

impl<T> QueryDataResult<T> {
    pub fn new(records: Vec<T>, total_count: Option<usize>) -> Self {
        Self {
            records,
            total_count,
        }
    }

    /// Converts every record, keeping the total count.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryDataResult<U> {
        QueryDataResult {
            records: self.records.into_iter().map(f).collect(),
            total_count: self.total_count,
        }
    }

    /// Converts every record with a fallible function, stopping at the first error.
    pub fn try_map<U, Err>(
        self,
        f: impl FnMut(T) -> Result<U, Err>,
    ) -> Result<QueryDataResult<U>, Err> {
        Ok(QueryDataResult {
            records: self
                .records
                .into_iter()
                .map(f)
                .collect::<Result<Vec<_>, _>>()?,
            total_count: self.total_count,
        })
    }
}
