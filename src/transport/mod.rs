//! WebSocket transport layer.
//!
//! This module owns the raw WebSocket to the bot backend: opening it under a
//! retry budget and tearing it down without waiting on the remote.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Connector       │                              │  Bot backend    │
//! │                  │         WebSocket            │                 │
//! │  TransportSession│─────────────────────────────►│  WebSocket      │
//! │  → LinkWriter    │      ws://host:port          │  Server         │
//! │  → LinkReader    │◄─────────────────────────────│                 │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Link Lifecycle
//!
//! 1. `TransportSession::connect` - Open a link, retrying per policy
//! 2. `link::split` - Hand the writer to the sender, the reader to the receiver
//! 3. `LinkWriter::force_close` - Close with a short grace period
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `link` | Split link halves and forced close |
//! | `session` | Connect with bounded retry |

// ============================================================================
// Submodules
// ============================================================================

/// Split link halves.
pub mod link;

/// Connect with bounded retry.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use link::{CLOSE_GRACE, LinkReader, LinkWriter, WsStream};
pub use session::{OPEN_TIMEOUT, TransportSession};
