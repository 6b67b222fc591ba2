//! # Router
//!
//! Decides what an inbound message means for the engine and then does it.
//!
//! ## Decision cascade
//!
//! 1. **Explicit target**: `target_process_id` is set → start that process
//!    with the payload as variables. Correlation keys are ignored (a warning
//!    is logged when both are present).
//! 2. **Correlation**: correlation keys are present → signal every active
//!    instance they resolve to. The signal name is the message name and the
//!    event data is the payload.
//! 3. **Name lookup**: otherwise an operator override, checked against the
//!    current catalog, and then the definition matcher pick a process to start.
//!
//! A message nothing resolves becomes [`RoutingDecision::NoMatch`]. That is a
//! normal outcome, logged at warn level, not a [`RouteError`].
//!
//! ## Snapshots
//!
//! Each decision reads the catalog it needs afresh and keeps nothing
//! afterwards. Two messages routed in parallel may act on the same snapshot;
//! the router neither deduplicates nor retries.
//!
//! ```rust
//! use process_router::engine::{EngineActor, ProcessDefinitionRef};
//! use process_router::message::decode;
//! use process_router::router::{RouteOutcome, Router};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (engine, handle) = EngineActor::new("default", 16);
//!     let engine = engine.with_definition(ProcessDefinitionRef::new("orderProc", "Orders"));
//!     tokio::spawn(engine.run());
//!
//!     let router = Router::new(handle, "default");
//!     let message = decode(r#"{"name": "orderShipped"}"#).unwrap();
//!     let outcome = router.route(&message).await.unwrap();
//!     assert!(matches!(outcome, RouteOutcome::Started { ref process_id, .. } if process_id == "orderProc"));
//! }
//! ```

pub mod error;

pub use error::RouteError;

use crate::config::{OverrideResolver, RouterSettings};
use crate::engine::{EngineClient, EngineError, InstanceId, ProcessDefinitionRef, ProcessInstanceRef};
use crate::matching::{correlation, definitions};
use crate::message::{self, InboundMessage, RawMessage, Variables};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Reason given when correlation keys resolve to no active instance.
pub const NO_CORRELATED_INSTANCE: &str = "no active instance satisfies correlation";

/// Reason given when no process definition fits the message name.
pub const NO_DEFINITION: &str = "no process definition resolves this message name";

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// What the router intends to do with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingDecision {
    StartProcess {
        process_id: String,
        variables: Variables,
    },
    SignalInstances {
        instance_ids: BTreeSet<InstanceId>,
        signal_name: String,
        event_data: Variables,
    },
    NoMatch {
        reason: String,
    },
}

/// What the router actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Started {
        process_id: String,
        instance_id: InstanceId,
    },
    Signaled {
        signal_name: String,
        instance_ids: BTreeSet<InstanceId>,
    },
    NoMatch {
        reason: String,
    },
}

impl RoutingDecision {
    fn no_match(reason: &str) -> Self {
        RoutingDecision::NoMatch {
            reason: reason.to_string(),
        }
    }
}

/// Stateless message router over an [`EngineClient`].
///
/// Cloning is cheap; every clone talks to the same engine.
pub struct Router<C> {
    engine: Arc<C>,
    overrides: OverrideResolver,
    container_id: String,
    page_size: u32,
    max_pages: Option<u32>,
}

impl<C> Clone for Router<C> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            overrides: self.overrides.clone(),
            container_id: self.container_id.clone(),
            page_size: self.page_size,
            max_pages: self.max_pages,
        }
    }
}

impl<C> std::fmt::Debug for Router<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("container_id", &self.container_id)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .finish_non_exhaustive()
    }
}

impl<C: EngineClient> Router<C> {
    /// A router without overrides, reading catalogs in pages of
    /// [`DEFAULT_PAGE_SIZE`] until exhausted.
    pub fn new(engine: C, container_id: impl Into<String>) -> Self {
        Self {
            engine: Arc::new(engine),
            overrides: OverrideResolver::disabled(),
            container_id: container_id.into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: None,
        }
    }

    /// A router configured from `settings`, with the `[routing]` table layered
    /// over the process environment as its override source.
    pub fn from_settings(engine: C, settings: &RouterSettings) -> Self {
        Self::new(engine, settings.container_id.clone())
            .with_overrides(OverrideResolver::new(settings.override_source()))
            .with_page_size(settings.page_size)
            .with_max_pages(settings.max_pages)
    }

    pub fn with_overrides(mut self, overrides: OverrideResolver) -> Self {
        self.overrides = overrides;
        self
    }

    /// Zero is clamped to one.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Caps how many pages a single catalog read may fetch.
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn engine(&self) -> &C {
        &self.engine
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Decodes a JSON payload and routes it.
    pub async fn route_json(&self, input: &str) -> Result<RouteOutcome, RouteError> {
        let message = message::decode(input)?;
        self.route(&message).await
    }

    /// Validates raw wire fields and routes the result.
    ///
    /// An invalid message fails with [`RouteError::Validation`] before any
    /// engine call.
    pub async fn route_raw(&self, raw: RawMessage) -> Result<RouteOutcome, RouteError> {
        let message = InboundMessage::parse(raw)?;
        self.route(&message).await
    }

    /// Decides and dispatches in one pass.
    #[instrument(skip(self, message), fields(message = %message.name()))]
    pub async fn route(&self, message: &InboundMessage) -> Result<RouteOutcome, RouteError> {
        let decision = self.decide(message).await?;
        self.dispatch(decision).await
    }

    /// Works out what `message` should do without changing engine state.
    pub async fn decide(&self, message: &InboundMessage) -> Result<RoutingDecision, RouteError> {
        debug!(payload = ?message.payload(), "Deciding route");

        if let Some(process_id) = message.target_process_id() {
            if message.has_correlation() {
                warn!(
                    process_id,
                    keys = ?message.correlation_keys(),
                    "Explicit target given, ignoring correlation keys"
                );
            }
            return Ok(RoutingDecision::StartProcess {
                process_id: process_id.to_string(),
                variables: message.payload().clone(),
            });
        }

        if message.has_correlation() {
            return self.decide_by_correlation(message).await;
        }

        self.decide_by_name(message).await
    }

    async fn decide_by_correlation(
        &self,
        message: &InboundMessage,
    ) -> Result<RoutingDecision, RouteError> {
        let instances = self.active_instances().await?;
        let matches = correlation::find_matches(message.correlation_keys(), &instances);

        for m in &matches {
            debug!(instance_id = %m.instance_id, matched_by = ?m.matched_by, "Correlated");
        }
        let instance_ids: BTreeSet<InstanceId> = matches.into_iter().map(|m| m.instance_id).collect();

        if instance_ids.is_empty() {
            return Ok(RoutingDecision::no_match(NO_CORRELATED_INSTANCE));
        }
        Ok(RoutingDecision::SignalInstances {
            instance_ids,
            signal_name: message.name().to_string(),
            event_data: message.payload().clone(),
        })
    }

    async fn decide_by_name(&self, message: &InboundMessage) -> Result<RoutingDecision, RouteError> {
        let name = message.name();
        let configured = self.overrides.resolve(name);
        let catalog = self.definitions().await?;

        if let Some(process_id) = configured {
            if catalog.iter().any(|d| d.id == process_id) {
                info!(process_id = %process_id, "Using configured override");
                return Ok(self.start(process_id, message));
            }
            warn!(process_id = %process_id, "Configured override names an unknown process, ignoring");
        }

        match definitions::match_definition(name, &catalog) {
            Some(found) => {
                info!(process_id = %found.process_id, strategy = ?found.strategy, "Matched definition");
                Ok(self.start(found.process_id, message))
            }
            None => Ok(RoutingDecision::no_match(NO_DEFINITION)),
        }
    }

    fn start(&self, process_id: String, message: &InboundMessage) -> RoutingDecision {
        RoutingDecision::StartProcess {
            process_id,
            variables: message.payload().clone(),
        }
    }

    /// Carries out a decision against the engine.
    ///
    /// Signals go out in ascending id order. The first failure stops the
    /// fan-out; instances already signalled stay signalled.
    pub async fn dispatch(&self, decision: RoutingDecision) -> Result<RouteOutcome, RouteError> {
        match decision {
            RoutingDecision::StartProcess {
                process_id,
                variables,
            } => {
                let instance_id = self
                    .engine
                    .start_process(&self.container_id, &process_id, variables)
                    .await?;
                info!(process_id = %process_id, instance_id = %instance_id, "Process started");
                Ok(RouteOutcome::Started {
                    process_id,
                    instance_id,
                })
            }
            RoutingDecision::SignalInstances {
                instance_ids,
                signal_name,
                event_data,
            } => {
                for (delivered, instance_id) in instance_ids.iter().copied().enumerate() {
                    if let Err(source) = self
                        .engine
                        .signal_instance(&self.container_id, instance_id, &signal_name, event_data.clone())
                        .await
                    {
                        warn!(instance_id = %instance_id, delivered, error = %source, "Signal failed");
                        return Err(RouteError::SignalFailed {
                            instance_id,
                            delivered,
                            source,
                        });
                    }
                }
                info!(signal = %signal_name, count = instance_ids.len(), "Instances signalled");
                Ok(RouteOutcome::Signaled {
                    signal_name,
                    instance_ids,
                })
            }
            RoutingDecision::NoMatch { reason } => {
                warn!(%reason, "No route for message");
                Ok(RouteOutcome::NoMatch { reason })
            }
        }
    }

    /// The full definition catalog, read page by page.
    pub async fn definitions(&self) -> Result<Vec<ProcessDefinitionRef>, EngineError> {
        self.collect_pages("definitions", move |page| {
            self.engine
                .list_process_definitions(&self.container_id, page, self.page_size)
        })
        .await
    }

    /// Every active instance, read page by page.
    pub async fn active_instances(&self) -> Result<Vec<ProcessInstanceRef>, EngineError> {
        self.collect_pages("instances", move |page| {
            self.engine
                .list_active_instances(&self.container_id, page, self.page_size)
        })
        .await
    }

    /// Fetches pages from zero until one comes back short, until `max_pages`
    /// pages have been read, or until a page repeats the one before it.
    async fn collect_pages<T, F, Fut>(&self, what: &str, mut fetch: F) -> Result<Vec<T>, EngineError>
    where
        T: PartialEq,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Vec<T>, EngineError>>,
    {
        let mut items: Vec<T> = Vec::new();
        let mut page = 0;
        loop {
            let batch = fetch(page).await?;
            let short = batch.len() < self.page_size as usize;
            if page > 0 && !batch.is_empty() && items.ends_with(&batch) {
                warn!(what, page, "Engine repeated the previous page, stopping catalog read");
                break;
            }
            items.extend(batch);
            page += 1;
            if short {
                break;
            }
            if self.max_pages.is_some_and(|max| page >= max) {
                warn!(what, pages = page, "Catalog read stopped at page limit");
                break;
            }
        }
        debug!(what, pages = page, count = items.len(), "Catalog read");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapSource;
    use crate::engine::mock::{EngineCall, MockEngine};
    use crate::engine::EngineHandle;
    use serde_json::json;

    fn msg(value: serde_json::Value) -> InboundMessage {
        message::decode(&value.to_string()).unwrap()
    }

    fn router(mock: &MockEngine) -> Router<EngineHandle> {
        Router::new(mock.client(), "c1")
    }

    fn instance(id: u64, key: &str) -> ProcessInstanceRef {
        let mut vars = Variables::new();
        vars.insert("correlationKey".into(), json!(key));
        ProcessInstanceRef::active(id, "proc", vars)
    }

    #[tokio::test]
    async fn test_invalid_message_never_reaches_engine() {
        let mock = MockEngine::new();
        let raw = RawMessage {
            name: Some("   ".into()),
            ..Default::default()
        };

        let err = router(&mock).route_raw(raw).await.unwrap_err();
        assert!(matches!(err, RouteError::Validation(message::ValidationError::MissingName)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_target_starts_without_catalog_read() {
        let mut mock = MockEngine::new();
        mock.expect_start("billing").return_ok(InstanceId(5));

        let message = msg(json!({
            "name": "whatever",
            "targetProcessId": "billing",
            "correlationKeys": {"correlationKey": "ORD-1"},
            "payload": {"amount": 10}
        }));
        let outcome = router(&mock).route(&message).await.unwrap();

        assert_eq!(
            outcome,
            RouteOutcome::Started {
                process_id: "billing".into(),
                instance_id: InstanceId(5)
            }
        );
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            EngineCall::Start {
                container_id,
                variables,
                ..
            } => {
                assert_eq!(container_id, "c1");
                assert_eq!(variables.get("amount"), Some(&json!(10)));
            }
            other => panic!("unexpected call {other:?}"),
        }
        mock.verify();
    }

    #[tokio::test]
    async fn test_correlation_fans_out_signals() {
        let mut mock = MockEngine::new();
        mock.expect_list_instances()
            .return_ok(vec![instance(3, "X"), instance(1, "X"), instance(2, "Y")]);
        mock.expect_signal(1u64).return_ok(());
        mock.expect_signal(3u64).return_ok(());

        let message = msg(json!({
            "name": "paymentReceived",
            "correlationKeys": {"correlationKey": "X"},
            "payload": {"amount": 10}
        }));
        let outcome = router(&mock).route(&message).await.unwrap();

        assert_eq!(
            outcome,
            RouteOutcome::Signaled {
                signal_name: "paymentReceived".into(),
                instance_ids: [InstanceId(1), InstanceId(3)].into_iter().collect(),
            }
        );
        let signals: Vec<_> = mock
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Signal {
                    signal_name,
                    event_data,
                    ..
                } => Some((signal_name, event_data)),
                _ => None,
            })
            .collect();
        assert_eq!(signals.len(), 2);
        assert!(signals
            .iter()
            .all(|(name, data)| name == "paymentReceived" && data.get("amount") == Some(&json!(10))));
        mock.verify();
    }

    #[tokio::test]
    async fn test_correlation_without_match_is_no_match() {
        let mut mock = MockEngine::new();
        mock.expect_list_instances().return_ok(vec![instance(1, "Y")]);

        let message = msg(json!({"name": "paymentReceived", "correlationKeys": {"correlationKey": "X"}}));
        let outcome = router(&mock).route(&message).await.unwrap();

        assert_eq!(
            outcome,
            RouteOutcome::NoMatch {
                reason: NO_CORRELATED_INSTANCE.into()
            }
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_signal_failure_reports_progress() {
        let mut mock = MockEngine::new();
        mock.expect_list_instances()
            .return_ok(vec![instance(1, "X"), instance(2, "X"), instance(3, "X")]);
        mock.expect_signal(1u64).return_ok(());
        mock.expect_signal(2u64)
            .return_err(EngineError::InstanceNotFound(InstanceId(2)));

        let message = msg(json!({"name": "cancel", "correlationKeys": {"correlationKey": "X"}}));
        let err = router(&mock).route(&message).await.unwrap_err();

        assert_eq!(
            err,
            RouteError::SignalFailed {
                instance_id: InstanceId(2),
                delivered: 1,
                source: EngineError::InstanceNotFound(InstanceId(2)),
            }
        );
        // Instance 3 is never attempted.
        mock.verify();
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_name_match_starts_process() {
        let mut mock = MockEngine::new();
        mock.expect_list_definitions().return_ok(vec![
            ProcessDefinitionRef::new("orderProc", "Orders"),
            ProcessDefinitionRef::new("shipProc", "Shipping"),
        ]);
        mock.expect_start("orderProc").return_ok(InstanceId(9));

        let message = msg(json!({"name": "orderShipped", "payload": {"sku": "A1"}}));
        let outcome = router(&mock).route(&message).await.unwrap();

        assert_eq!(
            outcome,
            RouteOutcome::Started {
                process_id: "orderProc".into(),
                instance_id: InstanceId(9)
            }
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_unresolvable_name_is_no_match() {
        let mut mock = MockEngine::new();
        mock.expect_list_definitions()
            .return_ok(vec![ProcessDefinitionRef::new("billing", "Billing")]);

        let message = msg(json!({"name": "ok"}));
        let outcome = router(&mock).route(&message).await.unwrap();

        assert_eq!(
            outcome,
            RouteOutcome::NoMatch {
                reason: NO_DEFINITION.into()
            }
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_override_beats_matcher() {
        let mut mock = MockEngine::new();
        mock.expect_list_definitions().return_ok(vec![
            ProcessDefinitionRef::new("orderProc", "Orders"),
            ProcessDefinitionRef::new("fulfilment", "Fulfilment"),
        ]);
        mock.expect_start("fulfilment").return_ok(InstanceId(1));

        let overrides = OverrideResolver::new(
            MapSource::new().with("message.routing.orderShipped", "fulfilment"),
        );
        let router = router(&mock).with_overrides(overrides);
        let outcome = router.route(&msg(json!({"name": "orderShipped"}))).await.unwrap();

        assert!(matches!(outcome, RouteOutcome::Started { process_id, .. } if process_id == "fulfilment"));
        mock.verify();
    }

    #[tokio::test]
    async fn test_unknown_override_falls_through_to_matcher() {
        let mut mock = MockEngine::new();
        mock.expect_list_definitions()
            .return_ok(vec![ProcessDefinitionRef::new("orderProc", "Orders")]);
        mock.expect_start("orderProc").return_ok(InstanceId(1));

        let overrides =
            OverrideResolver::new(MapSource::new().with("MESSAGE_ROUTING_ORDERSHIPPED", "retired"));
        let router = router(&mock).with_overrides(overrides);
        let outcome = router.route(&msg(json!({"name": "orderShipped"}))).await.unwrap();

        assert!(matches!(outcome, RouteOutcome::Started { process_id, .. } if process_id == "orderProc"));
        mock.verify();
    }

    #[tokio::test]
    async fn test_engine_failure_surfaces() {
        let mut mock = MockEngine::new();
        mock.expect_list_definitions()
            .return_ok(vec![ProcessDefinitionRef::new("orderProc", "Orders")]);
        mock.expect_start("orderProc")
            .return_err(EngineError::Unavailable("down".into()));

        let err = router(&mock)
            .route(&msg(json!({"name": "orderShipped"})))
            .await
            .unwrap_err();
        assert_eq!(err, RouteError::Engine(EngineError::Unavailable("down".into())));

        let mut mock = MockEngine::new();
        mock.expect_list_instances()
            .return_err(EngineError::Unavailable("down".into()));
        let err = router(&mock)
            .route(&msg(json!({"name": "x", "correlationKeys": {"k": "v"}})))
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::Engine(EngineError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_catalog_is_read_until_short_page() {
        let mut mock = MockEngine::new();
        mock.expect_list_definitions().return_ok(vec![
            ProcessDefinitionRef::new("a", ""),
            ProcessDefinitionRef::new("b", ""),
        ]);
        mock.expect_list_definitions()
            .return_ok(vec![ProcessDefinitionRef::new("shippingFlow", "")]);
        mock.expect_start("shippingFlow").return_ok(InstanceId(4));

        let router = router(&mock).with_page_size(2);
        let outcome = router.route(&msg(json!({"name": "shipping"}))).await.unwrap();
        assert!(matches!(outcome, RouteOutcome::Started { process_id, .. } if process_id == "shippingFlow"));

        let pages: Vec<_> = mock
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::ListDefinitions { page, page_size, .. } => Some((page, page_size)),
                _ => None,
            })
            .collect();
        assert_eq!(pages, vec![(0, 2), (1, 2)]);
        mock.verify();
    }

    #[tokio::test]
    async fn test_page_limit_stops_reading() {
        let mut mock = MockEngine::new();
        mock.expect_list_instances()
            .return_ok(vec![instance(1, "A"), instance(2, "B")]);

        let router = router(&mock).with_page_size(2).with_max_pages(Some(1));
        let instances = router.active_instances().await.unwrap();
        assert_eq!(instances.len(), 2);
        mock.verify();
    }

    #[tokio::test]
    async fn test_repeated_page_ends_unbounded_read() {
        let mut mock = MockEngine::new();
        let page = vec![
            ProcessDefinitionRef::new("a", ""),
            ProcessDefinitionRef::new("b", ""),
        ];
        mock.expect_list_definitions().return_ok(page.clone());
        mock.expect_list_definitions().return_ok(page.clone());

        let router = router(&mock).with_page_size(2);
        let definitions = router.definitions().await.unwrap();
        assert_eq!(definitions, page);
        mock.verify();
    }

    #[tokio::test]
    async fn test_decide_has_no_side_effects() {
        let mut mock = MockEngine::new();
        mock.expect_list_definitions()
            .return_ok(vec![ProcessDefinitionRef::new("orderProc", "Orders")]);

        let decision = router(&mock)
            .decide(&msg(json!({"name": "orderShipped", "payload": {"a": 1}})))
            .await
            .unwrap();

        let mut variables = Variables::new();
        variables.insert("a".into(), json!(1));
        assert_eq!(
            decision,
            RoutingDecision::StartProcess {
                process_id: "orderProc".into(),
                variables
            }
        );
        assert!(mock
            .calls()
            .iter()
            .all(|c| matches!(c, EngineCall::ListDefinitions { .. })));
        mock.verify();
    }
}
