//! botwire - Connection lifecycle and message pipelines for chat-bot clients.
//!
//! This library keeps a bot session attached to a WebSocket backend: it
//! connects with bounded retry, reconnects after link loss when allowed,
//! serializes outbound actions with a cooldown, and decodes inbound frames
//! for fire-and-forget dispatch.
//!
//! # Architecture
//!
//! The session follows a single-owner model:
//!
//! - **Connector**: owns the state machine, the transport and both pipelines
//! - **Outbound**: one FIFO queue, one sender loop per link
//! - **Inbound**: one receive loop per link, one task per decoded frame
//!
//! Key design principles:
//!
//! - At most one transport per session at any instant
//! - Outbound delivery order equals submission order
//! - Close is terminal, idempotent and never waits on the remote
//! - Collaborators and hooks are passed in explicitly (no globals)
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use botwire::{Action, Bindings, Connector, ConnectorOptions, Frame, FrameDispatcher, Result};
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl FrameDispatcher for Printer {
//!     async fn dispatch(&self, frame: Frame) {
//!         println!("{}: {}", frame.kind(), frame.raw());
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let options = ConnectorOptions::builder()
//!         .host("127.0.0.1")
//!         .port(6700)
//!         .allow_reconnect(true)
//!         .build()?;
//!
//!     let connector = Arc::new(Connector::new(
//!         options,
//!         Bindings::new(Arc::new(Printer), Arc::new(Printer)),
//!     ));
//!     let session = connector.start();
//!
//!     connector.wait_ready().await?;
//!     let action = Action::new("get_login_info", serde_json::json!({}))?;
//!     connector.submit(action).await?;
//!
//!     connector.close();
//!     session.await??;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`connector`] | [`Connector`], options and state machine |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`hooks`] | Lifecycle hook bus |
//! | [`identifiers`] | Action ids and the snowflake id generator |
//! | [`pipeline`] | Outbound queue and inbound receive loop |
//! | [`protocol`] | Actions, frames, decoder and dispatcher traits |
//! | [`sync`] | Concurrency primitives |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Session lifecycle: connector, configuration and state machine.
///
/// Use [`ConnectorOptions::builder()`] to configure a [`Connector`].
pub mod connector;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Lifecycle hook bus.
pub mod hooks;

/// Action identifiers and time-ordered id generation.
pub mod identifiers;

/// Outbound and inbound message pipelines.
pub mod pipeline;

/// Action/frame protocol types and collaborator traits.
pub mod protocol;

/// Concurrency primitives: guards, RW controller, signals, scheduling.
pub mod sync;

/// WebSocket transport layer.
///
/// Handles connect-with-retry and forced teardown.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Connector types
pub use connector::{
    Bindings, ConnectionState, Connector, ConnectorOptions, ConnectorOptionsBuilder, ReadyGate,
    RetryPolicy,
};

// Error types
pub use error::{Error, Result};

// Hook types
pub use hooks::{HookBus, HookPayload, LifecycleSignal};

// Identifier types
pub use identifiers::{ActionId, IdWorker, next_id};

// Pipeline types
pub use pipeline::Submission;

// Protocol types
pub use protocol::{
    Action, FlagStore, Frame, FrameDecoder, FrameDispatcher, FrameKind, JsonFrameDecoder,
};
