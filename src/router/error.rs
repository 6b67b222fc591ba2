//! Error types for routing.

use crate::engine::{EngineError, InstanceId};
use crate::message::ValidationError;
use thiserror::Error;

/// Errors that can occur while routing a message.
///
/// `NoMatch` is not an error; it is a [`RouteOutcome`](super::RouteOutcome).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RouteError {
    /// The message was rejected before any engine call.
    #[error("Invalid message: {0}")]
    Validation(#[from] ValidationError),

    /// A catalog read or a start call failed.
    #[error("Engine call failed: {0}")]
    Engine(#[from] EngineError),

    /// Signalling stopped at `instance_id` after `delivered` instances had
    /// already been signalled.
    #[error("Signal to instance {instance_id} failed after {delivered} delivered: {source}")]
    SignalFailed {
        instance_id: InstanceId,
        delivered: usize,
        #[source]
        source: EngineError,
    },
}

impl RouteError {
    /// The engine error underneath, if any.
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            RouteError::Validation(_) => None,
            RouteError::Engine(e) | RouteError::SignalFailed { source: e, .. } => Some(e),
        }
    }
}
