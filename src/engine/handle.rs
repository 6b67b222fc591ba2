//! # Engine Handle
//!
//! The client half of the engine channel. It forwards each call as an
//! [`EngineRequest`] over a Tokio `mpsc` channel and waits for the reply on a
//! `oneshot`, bounded by a per-call timeout.
//!
//! * **Cloneable**: holds only a sender and a duration.
//! * **Bounded**: a call that does not complete within the timeout fails with
//!   [`EngineError::Unavailable`].

use super::request::{EngineRequest, Response};
use super::{
    EngineClient, EngineError, InstanceId, InstanceRecord, ProcessDefinitionRef,
    ProcessInstanceRef,
};
use crate::message::Variables;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineRequest>,
    timeout: Duration,
}

impl EngineHandle {
    pub fn new(sender: mpsc::Sender<EngineRequest>) -> Self {
        Self {
            sender,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(Response<T>) -> EngineRequest,
    ) -> Result<T, EngineError> {
        let (respond_to, response) = oneshot::channel();
        let request = build(respond_to);
        let exchange = async {
            self.sender
                .send(request)
                .await
                .map_err(|_| EngineError::Unavailable("engine closed".to_string()))?;
            response
                .await
                .map_err(|_| EngineError::Unavailable("engine dropped response channel".to_string()))?
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Unavailable(format!(
                "engine call timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    // --- Administration (in-memory engine) ---

    /// Deploys a process definition.
    pub async fn deploy(&self, definition: ProcessDefinitionRef) -> Result<(), EngineError> {
        self.call(|respond_to| EngineRequest::Deploy {
            definition,
            respond_to,
        })
        .await
    }

    /// Returns the full record of an instance, including delivered signals.
    pub async fn instance(&self, instance_id: InstanceId) -> Result<Option<InstanceRecord>, EngineError> {
        self.call(|respond_to| EngineRequest::GetInstance {
            instance_id,
            respond_to,
        })
        .await
    }

    /// Moves an instance to the `Completed` state.
    pub async fn complete(&self, instance_id: InstanceId) -> Result<(), EngineError> {
        self.call(|respond_to| EngineRequest::Complete {
            instance_id,
            respond_to,
        })
        .await
    }

    /// Toggles a simulated outage.
    pub async fn set_available(&self, available: bool) -> Result<(), EngineError> {
        self.call(|respond_to| EngineRequest::SetAvailable {
            available,
            respond_to,
        })
        .await
    }
}

#[async_trait]
impl EngineClient for EngineHandle {
    #[instrument(skip(self))]
    async fn list_process_definitions(
        &self,
        container_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<ProcessDefinitionRef>, EngineError> {
        debug!("Sending request");
        self.call(|respond_to| EngineRequest::ListDefinitions {
            container_id: container_id.to_string(),
            page,
            page_size,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_active_instances(
        &self,
        container_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<ProcessInstanceRef>, EngineError> {
        debug!("Sending request");
        self.call(|respond_to| EngineRequest::ListActiveInstances {
            container_id: container_id.to_string(),
            page,
            page_size,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self, variables))]
    async fn start_process(
        &self,
        container_id: &str,
        process_id: &str,
        variables: Variables,
    ) -> Result<InstanceId, EngineError> {
        debug!(?variables, "Sending request");
        self.call(|respond_to| EngineRequest::Start {
            container_id: container_id.to_string(),
            process_id: process_id.to_string(),
            variables,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self, event_data))]
    async fn signal_instance(
        &self,
        container_id: &str,
        instance_id: InstanceId,
        signal_name: &str,
        event_data: Variables,
    ) -> Result<(), EngineError> {
        debug!(?event_data, "Sending request");
        self.call(|respond_to| EngineRequest::Signal {
            container_id: container_id.to_string(),
            instance_id,
            signal_name: signal_name.to_string(),
            event_data,
            respond_to,
        })
        .await
    }
}
