//! Engine call failures.

use super::InstanceId;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Connectivity failure, timeout, or a closed engine channel.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The target definition does not exist (or vanished after resolution).
    #[error("process not found: {0}")]
    ProcessNotFound(String),

    /// The target instance does not exist or is no longer active.
    #[error("instance not found: {0}")]
    InstanceNotFound(InstanceId),

    /// The container is not deployed on the engine.
    #[error("container not found: {0}")]
    ContainerNotFound(String),
}
