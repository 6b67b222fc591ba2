//! Error types for inbound message validation.

use thiserror::Error;

/// Reasons an inbound message is rejected before any engine call is made.
///
/// Validation failures are never retried by the router: the same bytes would
/// fail the same way on redelivery.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// The message name is missing or blank after trimming.
    #[error("message name is required")]
    MissingName,

    /// A correlation entry carried an object or array instead of a scalar.
    #[error("correlation key '{0}' must be a scalar value")]
    NonScalarCorrelation(String),

    /// The wire payload could not be decoded or encoded.
    #[error("malformed message: {0}")]
    Malformed(String),
}
