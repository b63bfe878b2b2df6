//! Error types for the dispatch bridge.

use dombridge_model::OperationKind;
use thiserror::Error;

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Boxed source error carried by invocation and factory failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the dispatch bridge. None of them are retried here.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The entity name is not registered in the type catalog.
    #[error("unknown entity type: {0}")]
    UnknownType(String),

    /// An entity type was registered twice under the same name.
    #[error("entity type already registered: {0}")]
    DuplicateEntityType(String),

    /// The registered type does not implement the caller's capability interface.
    #[error(
        "entity type {entity_type} does not implement {expected} (implements: {implemented})"
    )]
    CapabilityMismatch {
        entity_type: String,
        implemented: String,
        expected: String,
    },

    /// The repository exposes no method with the expected operation shape.
    #[error(
        "repository {repository} for entity '{entity}' does not support {operation}({parameters})"
    )]
    OperationNotSupported {
        entity: String,
        repository: String,
        operation: OperationKind,
        parameters: String,
    },

    /// The repository factory failed to produce an instance.
    #[error("repository for entity '{entity}' is unavailable: {source}")]
    RepositoryUnavailable {
        entity: String,
        #[source]
        source: BoxError,
    },

    /// A bound operation was called and failed.
    #[error(
        "{operation} on entity '{entity}' failed (parameter: {}): {source}",
        describe_parameter(.parameter_type)
    )]
    Invocation {
        entity: String,
        operation: OperationKind,
        parameter_type: Option<String>,
        #[source]
        source: BoxError,
    },

    /// An argument handed to a bound operation is not of the declared type.
    #[error("argument {position} is not a {expected}")]
    ArgumentType {
        position: usize,
        expected: &'static str,
    },
}

fn describe_parameter(parameter_type: &Option<String>) -> &str {
    parameter_type.as_deref().unwrap_or("none")
}
