//! Outbound action envelope.
//!
//! An [`Action`] is built once, serialized at construction, queued once and
//! transmitted at most once.

// ============================================================================
// Imports
// ============================================================================

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{ActionId, next_id};

// ============================================================================
// Wire Envelope
// ============================================================================

/// Wire form of an action.
///
/// # Format
///
/// ```json
/// {
///   "action": "send_group_msg",
///   "params": { ... },
///   "echo": "8812519478591488"
/// }
/// ```
#[derive(Serialize)]
struct Envelope<'a> {
    action: &'a str,
    params: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    echo: Option<&'a str>,
}

// ============================================================================
// Action
// ============================================================================

/// An outbound command for the remote endpoint.
#[derive(Debug, Clone)]
pub struct Action {
    id: ActionId,
    name: String,
    echo: Option<String>,
    payload: String,
    created_at: Instant,
}

impl Action {
    /// Creates an action whose response is not awaited.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if `params` cannot be serialized.
    pub fn new(name: impl Into<String>, params: Value) -> Result<Self> {
        Self::build(name.into(), params, None)
    }

    /// Creates an action carrying a fresh `echo` id so its response frame
    /// can be correlated.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::ClockRollback`] if no id can be generated
    /// - [`crate::Error::Json`] if `params` cannot be serialized
    pub fn expecting_response(name: impl Into<String>, params: Value) -> Result<Self> {
        let echo = next_id()?.to_string();
        Self::build(name.into(), params, Some(echo))
    }

    /// Wraps an already serialized payload.
    #[must_use]
    pub fn from_payload(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: ActionId::next(),
            name: name.into(),
            echo: None,
            payload: payload.into(),
            created_at: Instant::now(),
        }
    }

    fn build(name: String, params: Value, echo: Option<String>) -> Result<Self> {
        let payload = serde_json::to_string(&Envelope {
            action: &name,
            params: &params,
            echo: echo.as_deref(),
        })?;

        Ok(Self {
            id: ActionId::next(),
            name,
            echo,
            payload,
            created_at: Instant::now(),
        })
    }

    /// Returns the local identity of this action.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ActionId {
        self.id
    }

    /// Returns the action name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the response correlation id, if any.
    #[inline]
    #[must_use]
    pub fn echo(&self) -> Option<&str> {
        self.echo.as_deref()
    }

    /// Returns the serialized payload sent over the wire.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Returns when the action was created.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

// ============================================================================
// Tests
// ============================================================================
