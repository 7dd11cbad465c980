//! Engine error types.

use thiserror::Error;

/// Errors produced by the engine and passed through from backends.
#[derive(Debug, Error)]
pub enum Error {
    /// A filter, order, or projection referenced a field the entity does not
    /// declare.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A logical combinator or operator map had the wrong shape.
    #[error("malformed filter: {0}")]
    MalformedFilter(String),

    /// An operator operand had the wrong type.
    #[error("filter value for {op} on field {field} has the wrong type")]
    FilterValueType { field: String, op: String },

    /// BETWEEN received something other than exactly two elements.
    #[error("filter value for BETWEEN on field {field} must have 2 elements, got {len}")]
    FilterValueSize { field: String, len: usize },

    /// A cursor value cannot be represented in the token encoding.
    #[error("cannot encode cursor: {0}")]
    CursorEncode(String),

    /// A cursor token failed to decode.
    #[error("cannot decode cursor: {0}")]
    CursorDecode(String),

    /// A decoded cursor tuple does not match the active orders.
    #[error("cursor has {actual} values but {expected} orders are active")]
    CursorShape { expected: usize, actual: usize },

    /// Invalid `first`/`last` connection arguments.
    #[error("invalid pagination arguments: {0}")]
    InvalidPaginationArgs(String),

    /// The entity declares no identity fields, so no total order exists.
    #[error("entity {0} declares no identity fields")]
    MissingIdentity(String),

    /// The caller's context was cancelled or its deadline passed.
    #[error("operation cancelled")]
    Cancelled,

    /// Opaque backend failure, passed through unchanged.
    #[error("backend error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap a backend failure for passthrough.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Backend(err.into())
    }
}
