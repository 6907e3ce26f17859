//! Decoded inbound frames.
//!
//! A [`Frame`] is either a response to a previously sent action or an
//! independent occurrence (message, request, notice, meta event).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::Value;

use crate::error::Result;

use super::flags::FlagStore;

// ============================================================================
// FrameKind
// ============================================================================

/// Discriminant of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Chat message.
    Message,
    /// Friend or group request.
    Request,
    /// Notice (membership changes, recalls, ...).
    Notice,
    /// Meta event (heartbeat, lifecycle).
    Meta,
    /// Response correlated to an action.
    Response,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Message => "message",
            Self::Request => "request",
            Self::Notice => "notice",
            Self::Meta => "meta",
            Self::Response => "response",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A decoded inbound unit.
#[derive(Debug, Clone)]
pub struct Frame {
    kind: FrameKind,
    time: Option<i64>,
    raw: Value,
    flags: FlagStore,
}

impl Frame {
    /// Creates a frame of `kind` from its raw JSON.
    ///
    /// The timestamp is read from the `time` field when present.
    #[must_use]
    pub fn new(kind: FrameKind, raw: Value) -> Self {
        let time = raw.get("time").and_then(Value::as_i64);
        Self {
            kind,
            time,
            raw,
            flags: FlagStore::new(),
        }
    }

    /// Returns the frame discriminant.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Returns the unix timestamp reported by the remote end.
    #[inline]
    #[must_use]
    pub fn time(&self) -> Option<i64> {
        self.time
    }

    /// Returns the raw JSON of the frame.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Returns the `echo` of a response frame.
    #[must_use]
    pub fn echo(&self) -> Option<&str> {
        self.raw.get("echo").and_then(Value::as_str)
    }

    #[inline]
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.kind == FrameKind::Message
    }

    #[inline]
    #[must_use]
    pub fn is_request(&self) -> bool {
        self.kind == FrameKind::Request
    }

    #[inline]
    #[must_use]
    pub fn is_notice(&self) -> bool {
        self.kind == FrameKind::Notice
    }

    #[inline]
    #[must_use]
    pub fn is_meta(&self) -> bool {
        self.kind == FrameKind::Meta
    }

    #[inline]
    #[must_use]
    pub fn is_response(&self) -> bool {
        self.kind == FrameKind::Response
    }

    /// Marks the frame with a write-once flag.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DuplicateFlag`] if the flag already exists.
    pub fn mark(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: Option<Value>,
    ) -> Result<()> {
        self.flags.mark(namespace, name, value)
    }

    /// Returns `true` if the frame carries the given flag.
    #[must_use]
    pub fn has_flag(&self, namespace: &str, name: &str, expected: Option<&Value>) -> bool {
        self.flags.has_flag(namespace, name, expected)
    }
}

// ============================================================================
// Tests
// ============================================================================
