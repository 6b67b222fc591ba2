use super::error::ListenerError;
use crate::config::RouterSettings;
use crate::engine::EngineClient;
use crate::message::OutboundMessage;
use crate::router::{RouteError, RouteOutcome, Router};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

type Reply = oneshot::Sender<Result<RouteOutcome, RouteError>>;

/// One wire payload waiting for a worker.
#[derive(Debug)]
pub struct Delivery {
    pub payload: String,
    reply: Option<Reply>,
}

/// Producer side of the router's inbound queue.
///
/// Stands in for a transport consumer: whatever arrives here is routed by
/// the next free worker.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    sender: mpsc::Sender<Delivery>,
}

impl MessageQueue {
    /// Enqueues a JSON payload. The outcome is only logged.
    pub async fn publish(&self, payload: impl Into<String>) -> Result<(), ListenerError> {
        self.enqueue(Delivery {
            payload: payload.into(),
            reply: None,
        })
        .await
    }

    /// Encodes `message` and publishes it.
    pub async fn send(&self, message: &OutboundMessage) -> Result<(), ListenerError> {
        let payload = message.encode()?;
        self.publish(payload).await
    }

    /// Enqueues a JSON payload and waits until a worker has routed it.
    pub async fn deliver(&self, payload: impl Into<String>) -> Result<RouteOutcome, ListenerError> {
        let (reply, response) = oneshot::channel();
        self.enqueue(Delivery {
            payload: payload.into(),
            reply: Some(reply),
        })
        .await?;
        Ok(response.await.map_err(|_| ListenerError::Dropped)??)
    }

    async fn enqueue(&self, delivery: Delivery) -> Result<(), ListenerError> {
        self.sender
            .send(delivery)
            .await
            .map_err(|_| ListenerError::Closed)
    }
}

/// A pool of workers routing messages from one shared queue.
///
/// Each worker handles one message at a time to completion. Messages routed
/// by different workers are not ordered relative to each other.
///
/// # Example
///
/// ```ignore
/// let system = RouterSystem::start(router, 4, 64);
/// let queue = system.queue();
/// queue.publish(r#"{"name": "orderShipped"}"#).await?;
/// system.shutdown().await?;
/// ```
pub struct RouterSystem {
    queue: MessageQueue,
    stop: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl RouterSystem {
    /// Spawns `workers` tasks sharing a queue of `capacity` messages.
    ///
    /// Both values are raised to at least one.
    pub fn start<C>(router: Router<C>, workers: usize, capacity: usize) -> Self
    where
        C: EngineClient + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let (stop, stop_rx) = watch::channel(false);

        let handles = (0..workers.max(1))
            .map(|worker| {
                let span = tracing::info_span!("worker", id = worker);
                tokio::spawn(
                    run_worker(router.clone(), receiver.clone(), stop_rx.clone()).instrument(span),
                )
            })
            .collect::<Vec<_>>();

        info!(workers = handles.len(), container = %router.container_id(), "Router system started");

        Self {
            queue: MessageQueue { sender },
            stop,
            handles,
        }
    }

    pub fn from_settings<C>(router: Router<C>, settings: &RouterSettings) -> Self
    where
        C: EngineClient + 'static,
    {
        Self::start(router, settings.workers, settings.queue_capacity)
    }

    /// A producer handle for this system's queue.
    pub fn queue(&self) -> MessageQueue {
        self.queue.clone()
    }

    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Stops accepting messages, routes what is already queued, and waits for
    /// every worker to finish.
    ///
    /// Outstanding [`MessageQueue`] clones get [`ListenerError::Closed`] from
    /// then on.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down router system...");

        // Workers close the receiver once they observe the flag.
        let _ = self.stop.send(true);
        drop(self.queue);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Worker task failed: {:?}", e);
                return Err(format!("Worker task failed: {:?}", e));
            }
        }

        info!("Router system shutdown complete.");
        Ok(())
    }
}

async fn run_worker<C: EngineClient>(
    router: Router<C>,
    receiver: Arc<Mutex<mpsc::Receiver<Delivery>>>,
    mut stop: watch::Receiver<bool>,
) {
    debug!("Worker started");
    while let Some(delivery) = next_delivery(&receiver, &mut stop).await {
        let result = router.route_json(&delivery.payload).await;
        match &result {
            Ok(outcome) => debug!(?outcome, "Message routed"),
            Err(e) => warn!(error = %e, "Message routing failed"),
        }
        if let Some(reply) = delivery.reply {
            let _ = reply.send(result);
        }
    }
    debug!("Worker stopped");
}

/// The next queued delivery, or `None` once the queue is closed and drained.
async fn next_delivery(
    receiver: &Mutex<mpsc::Receiver<Delivery>>,
    stop: &mut watch::Receiver<bool>,
) -> Option<Delivery> {
    let mut rx = receiver.lock().await;
    if !*stop.borrow_and_update() {
        tokio::select! {
            delivery = rx.recv() => return delivery,
            _ = stop.changed() => {}
        }
    }
    rx.close();
    rx.recv().await
}
