//! Outbound and inbound message pipelines.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `inbound` | Receive loop, decoding and fire-and-forget dispatch |
//! | `outbound` | FIFO queue, cooldown and pre-send hook |

// ============================================================================
// Submodules
// ============================================================================

/// Receive loop.
pub mod inbound;

/// Action queue and sender loop.
pub mod outbound;

// ============================================================================
// Re-exports
// ============================================================================

pub use inbound::{InboundPipeline, ReceiveExit};
pub use outbound::{OutboundPipeline, Submission};
