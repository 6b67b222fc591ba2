//! # Mock Engine & Testing Guide
//!
//! [`MockEngine`] answers on the same channel an [`EngineHandle`] talks to,
//! but instead of keeping state it replays a queue of expectations. Use it to
//! assert the exact sequence of engine calls a routing decision makes and to
//! inject failures that are awkward to produce with the in-memory engine.
//!
//! ## When to use the Mock vs the In-Memory Engine
//!
//! | Feature | MockEngine | EngineActor |
//! |---------|------------|-------------|
//! | **State** | None (scripted replies) | Real catalog and instances |
//! | **Call assertions** | Exact order, recorded in [`MockEngine::calls`] | Indirect, via resulting state |
//! | **Error Injection** | Any error on any call (`return_err`) | Outage toggle, missing ids |
//! | **Use Case** | Decision logic, error propagation | End-to-end flows, concurrency |
//!
//! ## Fluent expectations
//!
//! ```rust
//! use process_router::engine::mock::MockEngine;
//! use process_router::engine::{EngineClient, EngineError, ProcessDefinitionRef};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockEngine::new();
//!     mock.expect_list_definitions()
//!         .return_ok(vec![ProcessDefinitionRef::new("orderProcess", "Order Process")]);
//!     mock.expect_start("orderProcess")
//!         .return_err(EngineError::Unavailable("down".into()));
//!
//!     let engine = mock.client();
//!     let defs = engine.list_process_definitions("c", 0, 100).await.unwrap();
//!     assert_eq!(defs.len(), 1);
//!     assert!(engine.start_process("c", "orderProcess", Default::default()).await.is_err());
//!
//!     mock.verify();
//! }
//! ```
//!
//! ## Raw channel helpers
//!
//! [`create_mock_engine`] hands back the request receiver itself; the
//! `expect_*` functions pull the next request and give you its fields plus
//! the responder, so a test can inspect arguments before replying.

use super::handle::EngineHandle;
use super::request::{EngineRequest, Response};
use super::{EngineError, InstanceId, ProcessDefinitionRef, ProcessInstanceRef};
use crate::message::Variables;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

enum Expectation {
    ListDefinitions {
        response: Result<Vec<ProcessDefinitionRef>, EngineError>,
    },
    ListActiveInstances {
        response: Result<Vec<ProcessInstanceRef>, EngineError>,
    },
    Start {
        process_id: String,
        response: Result<InstanceId, EngineError>,
    },
    Signal {
        instance_id: InstanceId,
        response: Result<(), EngineError>,
    },
}

/// A call observed by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    ListDefinitions {
        container_id: String,
        page: u32,
        page_size: u32,
    },
    ListActiveInstances {
        container_id: String,
        page: u32,
        page_size: u32,
    },
    Start {
        container_id: String,
        process_id: String,
        variables: Variables,
    },
    Signal {
        container_id: String,
        instance_id: InstanceId,
        signal_name: String,
        event_data: Variables,
    },
}

type Shared<T> = Arc<Mutex<T>>;

pub struct MockEngine {
    client: EngineHandle,
    expectations: Shared<VecDeque<Expectation>>,
    calls: Shared<Vec<EngineCall>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockEngine {
    /// Creates a mock with no expectations. Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<EngineRequest>(100);
        let expectations: Shared<VecDeque<Expectation>> = Arc::new(Mutex::new(VecDeque::new()));
        let calls: Shared<Vec<EngineCall>> = Arc::new(Mutex::new(Vec::new()));
        let expectations_clone = expectations.clone();
        let calls_clone = calls.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = expectations_clone.lock().unwrap().pop_front();
                let mut calls = calls_clone.lock().unwrap();

                match (request, expectation) {
                    (
                        EngineRequest::ListDefinitions { container_id, page, page_size, respond_to },
                        Some(Expectation::ListDefinitions { response }),
                    ) => {
                        calls.push(EngineCall::ListDefinitions { container_id, page, page_size });
                        let _ = respond_to.send(response);
                    }
                    (
                        EngineRequest::ListActiveInstances { container_id, page, page_size, respond_to },
                        Some(Expectation::ListActiveInstances { response }),
                    ) => {
                        calls.push(EngineCall::ListActiveInstances { container_id, page, page_size });
                        let _ = respond_to.send(response);
                    }
                    (
                        EngineRequest::Start { container_id, process_id, variables, respond_to },
                        Some(Expectation::Start { process_id: expected, response }),
                    ) => {
                        assert_eq!(process_id, expected, "Unexpected process id in start");
                        calls.push(EngineCall::Start { container_id, process_id, variables });
                        let _ = respond_to.send(response);
                    }
                    (
                        EngineRequest::Signal { container_id, instance_id, signal_name, event_data, respond_to },
                        Some(Expectation::Signal { instance_id: expected, response }),
                    ) => {
                        assert_eq!(instance_id, expected, "Unexpected instance id in signal");
                        calls.push(EngineCall::Signal { container_id, instance_id, signal_name, event_data });
                        let _ = respond_to.send(response);
                    }
                    (request, _) => {
                        panic!("Unexpected request or expectation mismatch: {:?}", request);
                    }
                }
            }
        });

        Self {
            client: EngineHandle::new(sender),
            expectations,
            calls,
            _handle: handle,
        }
    }

    /// Returns a handle wired to this mock.
    pub fn client(&self) -> EngineHandle {
        self.client.clone()
    }

    pub fn expect_list_definitions(&mut self) -> ExpectationBuilder<Vec<ProcessDefinitionRef>> {
        ExpectationBuilder::new(self.expectations.clone(), |response| {
            Expectation::ListDefinitions { response }
        })
    }

    pub fn expect_list_instances(&mut self) -> ExpectationBuilder<Vec<ProcessInstanceRef>> {
        ExpectationBuilder::new(self.expectations.clone(), |response| {
            Expectation::ListActiveInstances { response }
        })
    }

    pub fn expect_start(&mut self, process_id: impl Into<String>) -> ExpectationBuilder<InstanceId> {
        let process_id = process_id.into();
        ExpectationBuilder::new(self.expectations.clone(), move |response| Expectation::Start {
            process_id,
            response,
        })
    }

    pub fn expect_signal(&mut self, instance_id: impl Into<InstanceId>) -> ExpectationBuilder<()> {
        let instance_id = instance_id.into();
        ExpectationBuilder::new(self.expectations.clone(), move |response| Expectation::Signal {
            instance_id,
            response,
        })
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Panics unless every expectation was consumed.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Queues the reply for one expected call.
pub struct ExpectationBuilder<T> {
    expectations: Shared<VecDeque<Expectation>>,
    build: Box<dyn FnOnce(Result<T, EngineError>) -> Expectation + Send>,
}

impl<T> ExpectationBuilder<T> {
    fn new(
        expectations: Shared<VecDeque<Expectation>>,
        build: impl FnOnce(Result<T, EngineError>) -> Expectation + Send + 'static,
    ) -> Self {
        Self {
            expectations,
            build: Box::new(build),
        }
    }

    pub fn return_ok(self, value: T) {
        self.push(Ok(value));
    }

    pub fn return_err(self, error: EngineError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<T, EngineError>) {
        let expectation = (self.build)(response);
        self.expectations.lock().unwrap().push_back(expectation);
    }
}

// =============================================================================
// RAW CHANNEL HELPERS
// =============================================================================

/// Creates a handle and the receiver its requests arrive on.
pub fn create_mock_engine(buffer_size: usize) -> (EngineHandle, mpsc::Receiver<EngineRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (EngineHandle::new(sender), receiver)
}

/// Next request, if it is a definitions listing: `(page, page_size, responder)`.
pub async fn expect_list_definitions(
    receiver: &mut mpsc::Receiver<EngineRequest>,
) -> Option<(u32, u32, Response<Vec<ProcessDefinitionRef>>)> {
    match receiver.recv().await {
        Some(EngineRequest::ListDefinitions { page, page_size, respond_to, .. }) => {
            Some((page, page_size, respond_to))
        }
        _ => None,
    }
}

/// Next request, if it is an active-instance listing: `(page, page_size, responder)`.
pub async fn expect_list_instances(
    receiver: &mut mpsc::Receiver<EngineRequest>,
) -> Option<(u32, u32, Response<Vec<ProcessInstanceRef>>)> {
    match receiver.recv().await {
        Some(EngineRequest::ListActiveInstances { page, page_size, respond_to, .. }) => {
            Some((page, page_size, respond_to))
        }
        _ => None,
    }
}

/// Next request, if it is a start: `(process_id, variables, responder)`.
pub async fn expect_start(
    receiver: &mut mpsc::Receiver<EngineRequest>,
) -> Option<(String, Variables, Response<InstanceId>)> {
    match receiver.recv().await {
        Some(EngineRequest::Start { process_id, variables, respond_to, .. }) => {
            Some((process_id, variables, respond_to))
        }
        _ => None,
    }
}

/// Next request, if it is a signal: `(instance_id, signal_name, event_data, responder)`.
pub async fn expect_signal(
    receiver: &mut mpsc::Receiver<EngineRequest>,
) -> Option<(InstanceId, String, Variables, Response<()>)> {
    match receiver.recv().await {
        Some(EngineRequest::Signal { instance_id, signal_name, event_data, respond_to, .. }) => {
            Some((instance_id, signal_name, event_data, respond_to))
        }
        _ => None,
    }
}
