//! # Process Router demo
//!
//! Starts an in-memory engine with a small catalog, runs the router system on
//! top of it and sends three messages:
//!
//! 1. `orderPlaced` starts the order process by name.
//! 2. `paymentReceived`, correlated by order number, signals that instance.
//! 3. `inventoryChecked` resolves to nothing and is logged as a warning.
//!
//! An optional first argument names a TOML settings file.

use process_router::config::RouterSettings;
use process_router::engine::{EngineActor, ProcessDefinitionRef};
use process_router::listener::{setup_tracing, RouterSystem};
use process_router::message::OutboundMessage;
use process_router::router::{RouteOutcome, Router};
use std::path::PathBuf;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let path = std::env::args().nth(1).map(PathBuf::from);
    let settings = RouterSettings::load_or_default(path.as_deref()).map_err(|e| e.to_string())?;
    info!(container = %settings.container_id, workers = settings.workers, "Starting process router");

    let (engine, engine_handle) = EngineActor::new(settings.container_id.clone(), 32);
    let engine = engine
        .with_definition(ProcessDefinitionRef::new("orderProcess", "Order Fulfilment"))
        .with_definition(ProcessDefinitionRef::new("billingProcess", "Billing"));
    let engine_task = tokio::spawn(engine.run());
    let engine_handle = engine_handle.with_timeout(settings.request_timeout());

    let router = Router::from_settings(engine_handle.clone(), &settings);
    let system = RouterSystem::from_settings(router, &settings);
    let queue = system.queue();

    let span = tracing::info_span!("order_start");
    let started = async {
        let message = OutboundMessage::new("orderPlaced")
            .with_variable("orderNumber", "ORD-1")
            .with_variable("amount", 120);
        let payload = message.encode().map_err(|e| e.to_string())?;
        queue.deliver(payload).await.map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;

    let instance_id = match started {
        RouteOutcome::Started { instance_id, .. } => instance_id,
        other => return Err(format!("unexpected outcome: {other:?}")),
    };
    info!(instance_id = %instance_id, "Order process started");

    let span = tracing::info_span!("payment_signal");
    let signalled = async {
        let message = OutboundMessage::new("paymentReceived")
            .with_correlation("orderNumber", "ORD-1")
            .with_variable("paid", true);
        let payload = message.encode().map_err(|e| e.to_string())?;
        queue.deliver(payload).await.map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;
    info!(outcome = ?signalled, "Payment delivered");

    if let Err(e) = queue.send(&OutboundMessage::new("inventoryChecked")).await {
        error!(error = %e, "Publish failed");
    }

    system.shutdown().await?;

    match engine_handle.instance(instance_id).await {
        Ok(Some(record)) => info!(signals = record.signals.len(), "Order instance state"),
        Ok(None) => error!(instance_id = %instance_id, "Order instance vanished"),
        Err(e) => error!(error = %e, "Engine query failed"),
    }

    drop(queue);
    drop(engine_handle);
    if let Err(e) = engine_task.await {
        return Err(format!("Engine task failed: {:?}", e));
    }

    info!("Application completed successfully");
    Ok(())
}
