//! Error types for botwire.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use botwire::{Action, Connector, Result};
//!
//! async fn greet(connector: &Connector) -> Result<()> {
//!     let action = Action::new("send_private_msg", serde_json::json!({ "user_id": 1 }))?;
//!     connector.submit(action).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`], [`Error::Url`] |
//! | Connection | [`Error::ConnectFailed`], [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Lifecycle | [`Error::InvalidState`], [`Error::Cancelled`], [`Error::TaskFailed`] |
//! | Protocol | [`Error::Decode`], [`Error::DuplicateFlag`] |
//! | Identifiers | [`Error::ClockRollback`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::task::JoinError;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connector options are missing or invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument passed to a constructor or operation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Endpoint URL could not be built.
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connect retry budget exhausted.
    ///
    /// Fatal: the session never becomes ready.
    #[error("Failed to connect to {url} after {attempts} attempt(s)")]
    ConnectFailed {
        /// Endpoint that could not be reached.
        url: String,
        /// Number of connect attempts made.
        attempts: u64,
    },

    /// Transport-level failure on an established connection.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The session was closed and accepts no more work.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Operation not allowed in the current lifecycle state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state conflict.
        message: String,
    },

    /// A scheduled task was cancelled before completing.
    #[error("Task cancelled")]
    Cancelled,

    /// A spawned task panicked.
    #[error("Task failed: {message}")]
    TaskFailed {
        /// Panic or join failure description.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// An inbound unit could not be decoded into a frame.
    ///
    /// Recoverable: the receive loop logs it and continues.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    /// A write-once flag was marked twice.
    #[error("Flag {namespace}/{name} is already set")]
    DuplicateFlag {
        /// Flag namespace.
        namespace: String,
        /// Flag name.
        name: String,
    },

    // ========================================================================
    // Identifier Errors
    // ========================================================================
    /// The system clock moved backwards while generating ids.
    ///
    /// Fatal and never retried.
    #[error("Clock moved backwards: refusing to generate id before {last_ms}ms (now {now_ms}ms)")]
    ClockRollback {
        /// Timestamp of the last generated id.
        last_ms: u64,
        /// Timestamp observed now.
        now_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a connect failed error.
    #[inline]
    pub fn connect_failed(url: impl Into<String>, attempts: u64) -> Self {
        Self::ConnectFailed {
            url: url.into(),
            attempts,
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a duplicate flag error.
    #[inline]
    pub fn duplicate_flag(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DuplicateFlag {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Creates a clock rollback error.
    #[inline]
    pub fn clock_rollback(last_ms: u64, now_ms: u64) -> Self {
        Self::ClockRollback { last_ms, now_ms }
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::TaskFailed {
                message: err.to_string(),
            }
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed { .. }
                | Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error ends the session or the id generator.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed { .. } | Self::ClockRollback { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
