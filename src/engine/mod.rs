//! # Engine Client
//!
//! The orchestration engine is a remote collaborator. The router never talks
//! to it directly; it only sees the [`EngineClient`] trait, which makes every
//! routing decision testable against an in-memory stand-in.
//!
//! ## Implementations
//!
//! - [`memory`]: an in-memory engine run as an actor task. Its
//!   [`EngineHandle`] is cheap to clone and implements [`EngineClient`].
//! - [`mock`]: an expectation-driven engine for asserting exactly which calls
//!   the router makes and for injecting failures.
//!
//! ## Errors
//!
//! All calls fail with [`EngineError`]. Timeouts and lost connections surface
//! as [`EngineError::Unavailable`]; there is no separate timeout state.

pub mod error;
pub mod handle;
pub mod memory;
pub mod request;
pub mod mock;

pub use error::EngineError;
pub use handle::EngineHandle;
pub use memory::{EngineActor, InstanceRecord, ReceivedSignal};
pub use request::{EngineRequest, Response};

use crate::message::Variables;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque identifier of a running process instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

impl From<u64> for InstanceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A deployed process definition as listed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDefinitionRef {
    pub id: String,
    pub name: String,
}

impl ProcessDefinitionRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    Active,
    Completed,
    Aborted,
    Suspended,
}

/// Snapshot of a process instance taken at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInstanceRef {
    pub id: InstanceId,
    pub process_id: String,
    pub variables: Variables,
    pub status: InstanceStatus,
}

impl ProcessInstanceRef {
    pub fn active(id: impl Into<InstanceId>, process_id: impl Into<String>, variables: Variables) -> Self {
        Self {
            id: id.into(),
            process_id: process_id.into(),
            variables,
            status: InstanceStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == InstanceStatus::Active
    }
}

/// Operations the router needs from the orchestration engine.
///
/// Pages are zero-based. A page shorter than `page_size` is the last one.
#[async_trait]
pub trait EngineClient: Send + Sync {
    async fn list_process_definitions(
        &self,
        container_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<ProcessDefinitionRef>, EngineError>;

    /// Lists instances in the `Active` state only.
    async fn list_active_instances(
        &self,
        container_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<ProcessInstanceRef>, EngineError>;

    async fn start_process(
        &self,
        container_id: &str,
        process_id: &str,
        variables: Variables,
    ) -> Result<InstanceId, EngineError>;

    async fn signal_instance(
        &self,
        container_id: &str,
        instance_id: InstanceId,
        signal_name: &str,
        event_data: Variables,
    ) -> Result<(), EngineError>;
}
