//! Session lifecycle.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent options builder with validation |
//! | `core` | [`Connector`]: connect, serve, reconnect, close |
//! | `options` | [`ConnectorOptions`] and [`RetryPolicy`] |
//! | `state` | [`ConnectionState`] and the [`ReadyGate`] |

// ============================================================================
// Submodules
// ============================================================================

/// Options builder.
pub mod builder;

/// Connector lifecycle.
pub mod core;

/// Connector configuration.
pub mod options;

/// State machine types.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ConnectorOptionsBuilder;
pub use core::{Bindings, Connector};
pub use options::{ConnectorOptions, RetryPolicy};
pub use state::{ConnectionState, ReadyGate};

pub(crate) use state::CloseSwitch;
