//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter driven
//! by `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Routing**: one `route` span per message carrying the message name
//! - **Decisions**: the matched definition and strategy, overrides, correlation hits
//! - **Engine calls**: one span per client call on [`EngineHandle`](crate::engine::EngineHandle)
//! - **Workers**: a `worker` span per task, with start and stop events
//!
//! ## Usage
//!
//! ```bash
//! # Decisions and dispatches
//! RUST_LOG=info cargo run
//!
//! # Payloads, correlation details and catalog page counts
//! RUST_LOG=debug cargo run
//!
//! # Only the router
//! RUST_LOG=process_router::router=debug cargo run
//! ```
//!
//! With `RUST_LOG=info` a correlated message looks like:
//!
//! ```text
//! INFO worker:route: Instances signalled id=1 message="paymentReceived" signal="paymentReceived" count=2
//! ```
//!
//! and a message nothing resolves:
//!
//! ```text
//! WARN worker:route: No route for message id=0 message="ok" reason=no process definition resolves this message name
//! ```
//!
//! Payloads are only logged at `debug`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
