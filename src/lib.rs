#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Process Router
//!
//! > **Routes named messages between running workflow processes.**
//!
//! Processes talk to each other by sending named messages without knowing
//! which instance will receive them. This crate decides, for every inbound
//! message, whether it starts a new process instance or signals existing
//! ones, and then makes that call against the orchestration engine.
//!
//! ## 🧭 How a message is routed
//!
//! 1. An explicit `targetProcessId` always starts that process.
//! 2. Correlation keys signal every active instance whose variables match.
//! 3. Otherwise the message name picks a process: an operator override first,
//!    then the definition matcher (exact substring, then keyword).
//!
//! Anything that resolves to nothing is a `NoMatch` outcome, not an error.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! Each layer has its own error enum ([`ValidationError`](message::ValidationError),
//! [`EngineError`](engine::EngineError), [`RouteError`](router::RouteError)) and
//! `#[from]` conversions carry them upward.
//!
//! ### 2. The Engine Is an Actor
//! The in-memory engine owns its catalog inside one Tokio task and answers
//! requests over channels. The router only sees the
//! [`EngineClient`](engine::EngineClient) trait, so tests swap in
//! [`MockEngine`](engine::mock::MockEngine) without touching routing code.
//!
//! ### 3. Concurrency Model
//! The [`Router`](router::Router) keeps no state between messages. Many workers
//! share one router; each routes one message at a time against a freshly
//! read catalog. No deduplication happens here.
//!
//! ### 4. Observability
//! `tracing` everywhere with structured fields. See [`listener::tracing`].
//!
//! ## 🗺️ Module Tour
//!
//! - [`message`]: inbound/outbound message shape and wire decoding.
//! - [`config`]: operator overrides and router settings.
//! - [`matching`]: definition matcher and correlation resolver.
//! - [`router`]: the decision cascade and its dispatch.
//! - [`engine`]: the engine client trait, the in-memory engine, and the mock.
//! - [`listener`]: worker pool, queue, and tracing setup.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with info logs
//! RUST_LOG=info cargo run
//!
//! # With a settings file
//! RUST_LOG=debug cargo run -- router.toml
//! ```

pub mod config;
pub mod engine;
pub mod listener;
pub mod matching;
pub mod message;
pub mod router;
