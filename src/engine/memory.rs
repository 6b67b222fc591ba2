//! # In-Memory Engine
//!
//! An orchestration engine that lives in a single Tokio task. It owns the
//! definition catalog and every instance, and processes [`EngineRequest`]s one
//! at a time, so its state needs no locks.
//!
//! # Usage Pattern
//!
//! ```rust
//! use process_router::engine::{EngineActor, EngineClient, ProcessDefinitionRef};
//! use process_router::message::Variables;
//!
//! #[tokio::main]
//! async fn main() {
//!     // 1. Create
//!     let (actor, handle) = EngineActor::new("orders_1.0.0", 16);
//!
//!     // 2. Run
//!     tokio::spawn(actor.run());
//!
//!     // 3. Use
//!     handle.deploy(ProcessDefinitionRef::new("orderProcess", "Order Process")).await.unwrap();
//!     let id = handle
//!         .start_process("orders_1.0.0", "orderProcess", Variables::new())
//!         .await
//!         .unwrap();
//!     assert!(handle.instance(id).await.unwrap().is_some());
//! }
//! ```
//!
//! # Behaviour
//!
//! * Definitions are listed in deployment order; instances in id order.
//! * Instance ids are allocated from a counter starting at 1.
//! * Signals are recorded on the instance (see [`InstanceRecord::signals`]);
//!   signalling a non-active instance fails with `InstanceNotFound`.
//! * Requests naming another container fail with `ContainerNotFound`.
//! * While marked unavailable, every client operation fails with `Unavailable`.

use super::handle::EngineHandle;
use super::request::EngineRequest;
use super::{EngineError, InstanceId, InstanceStatus, ProcessDefinitionRef, ProcessInstanceRef};
use crate::message::Variables;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A signal delivered to an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedSignal {
    pub name: String,
    pub event_data: Variables,
}

/// Full state of an instance held by the in-memory engine.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    pub instance: ProcessInstanceRef,
    pub signals: Vec<ReceivedSignal>,
}

pub struct EngineActor {
    receiver: mpsc::Receiver<EngineRequest>,
    container_id: String,
    definitions: Vec<ProcessDefinitionRef>,
    instances: BTreeMap<InstanceId, InstanceRecord>,
    next_id: u64,
    available: bool,
}

impl EngineActor {
    /// Creates the engine and a handle to it.
    ///
    /// `buffer_size` is the capacity of the request channel; callers wait for
    /// space when it is full.
    pub fn new(container_id: impl Into<String>, buffer_size: usize) -> (Self, EngineHandle) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            container_id: container_id.into(),
            definitions: Vec::new(),
            instances: BTreeMap::new(),
            next_id: 1,
            available: true,
        };
        (actor, EngineHandle::new(sender))
    }

    /// Adds a definition before the actor starts running.
    pub fn with_definition(mut self, definition: ProcessDefinitionRef) -> Self {
        self.deploy(definition);
        self
    }

    /// Adds an active instance before the actor starts running.
    pub fn with_instance(mut self, process_id: impl Into<String>, variables: Variables) -> Self {
        let id = self.allocate_id();
        self.instances.insert(
            id,
            InstanceRecord {
                instance: ProcessInstanceRef::active(id, process_id, variables),
                signals: Vec::new(),
            },
        );
        self
    }

    /// Runs the request loop until every handle is dropped.
    pub async fn run(mut self) {
        info!(container = %self.container_id, "Engine started");

        while let Some(request) = self.receiver.recv().await {
            match request {
                EngineRequest::ListDefinitions {
                    container_id,
                    page,
                    page_size,
                    respond_to,
                } => {
                    let result = self.check(&container_id).map(|_| {
                        page_of(&self.definitions, page, page_size).to_vec()
                    });
                    debug!(page, page_size, ok = result.is_ok(), "ListDefinitions");
                    let _ = respond_to.send(result);
                }
                EngineRequest::ListActiveInstances {
                    container_id,
                    page,
                    page_size,
                    respond_to,
                } => {
                    let result = self.check(&container_id).map(|_| {
                        let active: Vec<ProcessInstanceRef> = self
                            .instances
                            .values()
                            .filter(|r| r.instance.is_active())
                            .map(|r| r.instance.clone())
                            .collect();
                        page_of(&active, page, page_size).to_vec()
                    });
                    debug!(page, page_size, ok = result.is_ok(), "ListActiveInstances");
                    let _ = respond_to.send(result);
                }
                EngineRequest::Start {
                    container_id,
                    process_id,
                    variables,
                    respond_to,
                } => {
                    let result = self.start(&container_id, process_id, variables);
                    let _ = respond_to.send(result);
                }
                EngineRequest::Signal {
                    container_id,
                    instance_id,
                    signal_name,
                    event_data,
                    respond_to,
                } => {
                    let result = self.signal(&container_id, instance_id, signal_name, event_data);
                    let _ = respond_to.send(result);
                }
                EngineRequest::Deploy {
                    definition,
                    respond_to,
                } => {
                    self.deploy(definition);
                    let _ = respond_to.send(Ok(()));
                }
                EngineRequest::GetInstance {
                    instance_id,
                    respond_to,
                } => {
                    let record = self.instances.get(&instance_id).cloned();
                    debug!(%instance_id, found = record.is_some(), "GetInstance");
                    let _ = respond_to.send(Ok(record));
                }
                EngineRequest::Complete {
                    instance_id,
                    respond_to,
                } => {
                    let result = match self.instances.get_mut(&instance_id) {
                        Some(record) => {
                            record.instance.status = InstanceStatus::Completed;
                            info!(%instance_id, "Completed");
                            Ok(())
                        }
                        None => Err(EngineError::InstanceNotFound(instance_id)),
                    };
                    let _ = respond_to.send(result);
                }
                EngineRequest::SetAvailable {
                    available,
                    respond_to,
                } => {
                    self.available = available;
                    info!(available, "Availability changed");
                    let _ = respond_to.send(Ok(()));
                }
            }
        }

        info!(instances = self.instances.len(), "Engine shutdown");
    }

    fn allocate_id(&mut self) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        id
    }

    fn deploy(&mut self, definition: ProcessDefinitionRef) {
        info!(process_id = %definition.id, "Deployed");
        match self.definitions.iter_mut().find(|d| d.id == definition.id) {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
    }

    fn check(&self, container_id: &str) -> Result<(), EngineError> {
        if !self.available {
            return Err(EngineError::Unavailable("engine offline".to_string()));
        }
        if container_id != self.container_id {
            return Err(EngineError::ContainerNotFound(container_id.to_string()));
        }
        Ok(())
    }

    fn start(
        &mut self,
        container_id: &str,
        process_id: String,
        variables: Variables,
    ) -> Result<InstanceId, EngineError> {
        self.check(container_id)?;
        if !self.definitions.iter().any(|d| d.id == process_id) {
            warn!(%process_id, "Start failed: unknown process");
            return Err(EngineError::ProcessNotFound(process_id));
        }

        let id = self.allocate_id();
        self.instances.insert(
            id,
            InstanceRecord {
                instance: ProcessInstanceRef::active(id, process_id.clone(), variables),
                signals: Vec::new(),
            },
        );
        info!(%process_id, instance_id = %id, size = self.instances.len(), "Started");
        Ok(id)
    }

    fn signal(
        &mut self,
        container_id: &str,
        instance_id: InstanceId,
        signal_name: String,
        event_data: Variables,
    ) -> Result<(), EngineError> {
        self.check(container_id)?;
        match self.instances.get_mut(&instance_id) {
            Some(record) if record.instance.is_active() => {
                info!(%instance_id, signal = %signal_name, "Signaled");
                record.signals.push(ReceivedSignal {
                    name: signal_name,
                    event_data,
                });
                Ok(())
            }
            _ => {
                warn!(%instance_id, signal = %signal_name, "Signal failed: no active instance");
                Err(EngineError::InstanceNotFound(instance_id))
            }
        }
    }
}

fn page_of<T>(items: &[T], page: u32, page_size: u32) -> &[T] {
    let start = (page as usize).saturating_mul(page_size as usize);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size as usize).min(items.len());
    &items[start..end]
}
