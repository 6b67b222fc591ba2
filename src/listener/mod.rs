//! Runtime around the router.
//!
//! - [`RouterSystem`] spins up a pool of workers behind a bounded queue and
//!   shuts them down gracefully.
//! - [`MessageQueue`] is the producer handle: fire-and-forget
//!   [`publish`](MessageQueue::publish) or [`deliver`](MessageQueue::deliver)
//!   to wait for the outcome.
//! - [`setup_tracing`] initializes logging.

pub mod error;
pub mod system;
pub mod tracing;

pub use error::ListenerError;
pub use system::{Delivery, MessageQueue, RouterSystem};
pub use tracing::setup_tracing;
