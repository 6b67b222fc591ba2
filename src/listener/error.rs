//! Error types for the message queue.

use crate::message::ValidationError;
use crate::router::RouteError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ListenerError {
    /// The queue no longer accepts messages.
    #[error("Message queue is closed")]
    Closed,

    /// A worker stopped before answering a delivery.
    #[error("Worker dropped the delivery")]
    Dropped,

    /// The outbound message could not be encoded.
    #[error("Cannot encode message: {0}")]
    Encode(#[from] ValidationError),

    /// The message was received but routing failed.
    #[error(transparent)]
    Route(#[from] RouteError),
}
