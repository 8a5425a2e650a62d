//! Error types for the relation engine.
//!
//! These are local invariant violations raised at the boundaries of
//! [`Connection`](crate::connection::Connection) construction, relation
//! lookup, and selector resolution. Absent weights, missing connections,
//! and short selections are not errors.

/// Connection and selection errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelationError {
    #[error("a connection needs exactly two fragments, got {0}")]
    InvalidArity(usize),

    #[error("fragment {fragment} is not part of the connection")]
    NotInConnection { fragment: String },

    #[error("a connection needs at least one shared term")]
    EmptySimilarity,

    #[error("fragment {fragment} has an empty term vector")]
    DegenerateVector { fragment: String },

    #[error("unknown selector: '{0}'")]
    UnknownSelector(String),
}

/// Term vector arithmetic errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VectorError {
    #[error("no term vectors supplied")]
    NoVectors,

    #[error("term vector magnitude product is zero")]
    ZeroMagnitude,
}
