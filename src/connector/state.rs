//! Connection state machine types.
//!
//! ```text
//! Idle -> Connecting -> Ready -> Closing -> Closed
//!             ^                     |
//!             +---- Reconnecting <--+
//! ```
//!
//! `Closed` is terminal. The current state lives in a `watch` channel so the
//! ready gate can observe every transition.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a connector session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Constructed, not yet running.
    Idle,
    /// A connect attempt (with retries) is in progress.
    Connecting,
    /// A link is open; sends are allowed.
    Ready,
    /// The link is being torn down.
    Closing,
    /// The link was lost and a new connect cycle follows.
    Reconnecting,
    /// Terminal.
    Closed,
}

impl ConnectionState {
    /// Returns `true` for [`Self::Closed`].
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Closing => "closing",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// ReadyGate
// ============================================================================

/// Suspends callers until the session is ready to send.
///
/// The gate is open only while the state is [`ConnectionState::Ready`].
#[derive(Debug, Clone)]
pub struct ReadyGate {
    rx: watch::Receiver<ConnectionState>,
}

impl ReadyGate {
    pub(crate) fn new(rx: watch::Receiver<ConnectionState>) -> Self {
        Self { rx }
    }

    /// Returns `true` if the gate is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.rx.borrow() == ConnectionState::Ready
    }

    /// Returns the state last observed by the gate.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.rx.borrow()
    }

    /// Waits until the session is ready.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the session is closed.
    pub async fn wait(&mut self) -> Result<()> {
        let state = self
            .rx
            .wait_for(|state| matches!(state, ConnectionState::Ready | ConnectionState::Closed))
            .await
            .map(|state| *state)
            .map_err(|_| Error::ConnectionClosed)?;

        match state {
            ConnectionState::Ready => Ok(()),
            _ => Err(Error::ConnectionClosed),
        }
    }
}

// ============================================================================
// CloseSwitch
// ============================================================================

/// Shared reconnect flag and terminal-close latch.
///
/// Once closing, `allow_reconnect` stays false and the session token stays
/// cancelled.
#[derive(Debug)]
pub(crate) struct CloseSwitch {
    allow_reconnect: AtomicBool,
    closing: AtomicBool,
    token: CancellationToken,
}

impl CloseSwitch {
    pub(crate) fn new(allow_reconnect: bool) -> Self {
        Self {
            allow_reconnect: AtomicBool::new(allow_reconnect),
            closing: AtomicBool::new(false),
            token: CancellationToken::new(),
        }
    }

    /// Latches the terminal close; returns `true` on the first call only.
    pub(crate) fn request_close(&self) -> bool {
        // Reconnect must be off before any loop observes the cancellation.
        self.allow_reconnect.store(false, Ordering::SeqCst);
        let first = !self.closing.swap(true, Ordering::SeqCst);
        self.token.cancel();
        first
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    pub(crate) fn allow_reconnect(&self) -> bool {
        self.allow_reconnect.load(Ordering::SeqCst)
    }

    /// Session-wide cancellation token.
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

// ============================================================================
// Tests
// ============================================================================
