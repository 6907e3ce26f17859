//! Action/event protocol types.
//!
//! This module defines what travels over the connection and the
//! collaborator traits that interpret it.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Action` | Local → Remote | Command for the bot backend |
//! | `Frame` (response) | Remote → Local | Result of an action, matched by `echo` |
//! | `Frame` (event) | Remote → Local | Message, request, notice or meta event |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `action` | Outbound action envelope |
//! | `decoder` | Frame decoder trait and JSON decoder |
//! | `dispatch` | Frame dispatcher trait |
//! | `flags` | Write-once frame flags |
//! | `frame` | Inbound frame and kind discriminant |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound action envelope.
pub mod action;

/// Frame decoding collaborator.
pub mod decoder;

/// Frame dispatch collaborator.
pub mod dispatch;

/// Write-once flags.
pub mod flags;

/// Inbound frames.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use action::Action;
pub use decoder::{FrameDecoder, JsonFrameDecoder};
pub use dispatch::FrameDispatcher;
pub use flags::FlagStore;
pub use frame::{Frame, FrameKind};
