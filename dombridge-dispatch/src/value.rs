//! Type-erased arguments and results passed through bound methods.

use crate::entity::DynEntity;
use crate::error::DispatchError;
use crate::object::ErasedQueryable;
use dombridge_model::{QueryDataResult, QueryDescriptor};
use std::any::{Any, type_name};

/// One argument or result of a bound repository method.
///
/// Entity collections travel as [`DynEntity`] items; the repository's own
/// registration code converts them to and from the concrete entity type.
pub(crate) enum Value {
    Unit,
    Bool(bool),
    Sequence(Vec<DynEntity>),
    Queryable(ErasedQueryable),
    Parameter(Box<dyn Any + Send>),
    Query(QueryDescriptor),
    QueryResult(QueryDataResult<DynEntity>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Sequence(_) => "entity sequence",
            Value::Queryable(_) => "entity queryable",
            Value::Parameter(_) => "filter parameter",
            Value::Query(_) => "query descriptor",
            Value::QueryResult(_) => "query result",
        }
    }

    pub(crate) fn into_bool(self, position: usize) -> anyhow::Result<bool> {
        match self {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(position, "bool", &other)),
        }
    }

    pub(crate) fn into_sequence(self, position: usize) -> anyhow::Result<Vec<DynEntity>> {
        match self {
            Value::Sequence(items) => Ok(items),
            other => Err(mismatch(position, "entity sequence", &other)),
        }
    }

    pub(crate) fn into_queryable(self, position: usize) -> anyhow::Result<ErasedQueryable> {
        match self {
            Value::Queryable(query) => Ok(query),
            other => Err(mismatch(position, "entity queryable", &other)),
        }
    }

    pub(crate) fn into_parameter<P: Any>(self, position: usize) -> anyhow::Result<P> {
        match self {
            Value::Parameter(boxed) => boxed
                .downcast::<P>()
                .map(|p| *p)
                .map_err(|_| argument_error::<P>(position)),
            other => Err(mismatch(position, type_name::<P>(), &other)),
        }
    }

    pub(crate) fn into_query(self, position: usize) -> anyhow::Result<QueryDescriptor> {
        match self {
            Value::Query(descriptor) => Ok(descriptor),
            other => Err(mismatch(position, "query descriptor", &other)),
        }
    }

    pub(crate) fn into_query_result(self) -> anyhow::Result<QueryDataResult<DynEntity>> {
        match self {
            Value::QueryResult(result) => Ok(result),
            other => Err(mismatch(0, "query result", &other)),
        }
    }
}

/// Error for an argument at `position` that is not a `T`.
pub(crate) fn argument_error<T: ?Sized>(position: usize) -> anyhow::Error {
    DispatchError::ArgumentType {
        position,
        expected: type_name::<T>(),
    }
    .into()
}

fn mismatch(position: usize, expected: &'static str, found: &Value) -> anyhow::Error {
    anyhow::anyhow!(
        "argument {position} should be a {expected}, found {}",
        found.kind()
    )
}

/// Pops bound-method arguments in declaration order.
pub(crate) struct Arguments {
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl Arguments {
    pub(crate) fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
        }
    }

    fn take(&mut self) -> anyhow::Result<(Value, usize)> {
        let position = self.position;
        self.position += 1;
        self.values
            .next()
            .map(|value| (value, position))
            .ok_or_else(|| anyhow::anyhow!("missing argument {position}"))
    }

    pub(crate) fn bool(&mut self) -> anyhow::Result<bool> {
        let (value, position) = self.take()?;
        value.into_bool(position)
    }

    pub(crate) fn sequence(&mut self) -> anyhow::Result<(Vec<DynEntity>, usize)> {
        let (value, position) = self.take()?;
        Ok((value.into_sequence(position)?, position))
    }

    pub(crate) fn queryable(&mut self) -> anyhow::Result<(ErasedQueryable, usize)> {
        let (value, position) = self.take()?;
        Ok((value.into_queryable(position)?, position))
    }

    pub(crate) fn parameter<P: Any>(&mut self) -> anyhow::Result<P> {
        let (value, position) = self.take()?;
        value.into_parameter(position)
    }

    pub(crate) fn query(&mut self) -> anyhow::Result<QueryDescriptor> {
        let (value, position) = self.take()?;
        value.into_query(position)
    }
}
