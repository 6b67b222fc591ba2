//! # Engine Requests
//!
//! Messages sent from an [`EngineHandle`](super::EngineHandle) to whatever
//! answers on the other end of its channel: the in-memory
//! [`EngineActor`](super::EngineActor) or a [`MockEngine`](super::mock::MockEngine).
//!
//! The first four variants mirror [`EngineClient`](super::EngineClient). The
//! rest administer the in-memory engine (deploying definitions, inspecting or
//! completing instances, simulating an outage) and are not part of what the
//! router consumes.

use super::{EngineError, InstanceId, ProcessDefinitionRef, ProcessInstanceRef};
use super::memory::InstanceRecord;
use crate::message::Variables;
use tokio::sync::oneshot;

/// One-shot reply channel carried by every request.
pub type Response<T> = oneshot::Sender<Result<T, EngineError>>;

#[derive(Debug)]
pub enum EngineRequest {
    ListDefinitions {
        container_id: String,
        page: u32,
        page_size: u32,
        respond_to: Response<Vec<ProcessDefinitionRef>>,
    },
    ListActiveInstances {
        container_id: String,
        page: u32,
        page_size: u32,
        respond_to: Response<Vec<ProcessInstanceRef>>,
    },
    Start {
        container_id: String,
        process_id: String,
        variables: Variables,
        respond_to: Response<InstanceId>,
    },
    Signal {
        container_id: String,
        instance_id: InstanceId,
        signal_name: String,
        event_data: Variables,
        respond_to: Response<()>,
    },
    Deploy {
        definition: ProcessDefinitionRef,
        respond_to: Response<()>,
    },
    GetInstance {
        instance_id: InstanceId,
        respond_to: Response<Option<InstanceRecord>>,
    },
    Complete {
        instance_id: InstanceId,
        respond_to: Response<()>,
    },
    SetAvailable {
        available: bool,
        respond_to: Response<()>,
    },
}
