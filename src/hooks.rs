//! Lifecycle hook bus.
//!
//! A [`HookBus`] is created once per session by the owner and shared by
//! reference with every component that emits or subscribes. There is no
//! process-wide registry.
//!
//! # Signals
//!
//! | Signal | Emitted by | Payload |
//! |--------|------------|---------|
//! | [`LifecycleSignal::FirstConnected`] | receive loop, first link | none |
//! | [`LifecycleSignal::Reconnected`] | receive loop, later links | none |
//! | [`LifecycleSignal::ActionPresend`] | sender loop, before each transmission | the action |
//! | [`LifecycleSignal::Closed`] | lifecycle, after terminal teardown | none |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, join_all};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::Action;

// ============================================================================
// Types
// ============================================================================

/// Boxed hook callback.
type Hook = Arc<dyn Fn(HookPayload) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Lifecycle points hooks can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleSignal {
    /// The first link of the session became ready.
    FirstConnected,
    /// A link became ready after a reconnect.
    Reconnected,
    /// An action is about to be transmitted.
    ActionPresend,
    /// The session closed for good.
    Closed,
}

impl fmt::Display for LifecycleSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FirstConnected => "first_connected",
            Self::Reconnected => "reconnected",
            Self::ActionPresend => "action_presend",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Data handed to hook subscribers.
#[derive(Debug, Clone)]
pub enum HookPayload {
    /// No payload.
    Empty,
    /// The action about to be sent.
    Action(Action),
}

// ============================================================================
// HookBus
// ============================================================================

/// Registry of lifecycle hooks.
#[derive(Default)]
pub struct HookBus {
    hooks: RwLock<FxHashMap<LifecycleSignal, Vec<Hook>>>,
}

impl HookBus {
    /// Creates an empty bus.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `hook` to `signal`.
    ///
    /// Hooks run concurrently with the other subscribers of the same signal.
    pub fn on<F, Fut>(&self, signal: LifecycleSignal, callback: F)
    where
        F: Fn(HookPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let hook: Hook = Arc::new(move |payload| -> BoxFuture<'static, Result<()>> {
            Box::pin(callback(payload))
        });
        self.hooks.write().entry(signal).or_default().push(hook);
    }

    /// Returns the number of subscribers of `signal`.
    #[must_use]
    pub fn subscriber_count(&self, signal: LifecycleSignal) -> usize {
        self.hooks.read().get(&signal).map_or(0, Vec::len)
    }

    /// Runs every subscriber of `signal` and waits for all of them.
    ///
    /// A failing hook is logged; it does not affect the other hooks or the
    /// emitter.
    pub async fn emit(&self, signal: LifecycleSignal, payload: HookPayload) {
        let hooks = self.hooks.read().get(&signal).cloned().unwrap_or_default();
        if hooks.is_empty() {
            return;
        }

        let results = join_all(hooks.iter().map(|hook| hook(payload.clone()))).await;
        for err in results.into_iter().filter_map(|r| r.err()) {
            warn!(%signal, error = %err, "Lifecycle hook failed");
        }

        debug!(%signal, count = hooks.len(), "Lifecycle hooks completed");
    }

    /// Emits `signal` on a background task without waiting.
    pub fn emit_detached(self: &Arc<Self>, signal: LifecycleSignal, payload: HookPayload) {
        let bus = Arc::clone(self);
        tokio::spawn(async move {
            bus.emit(signal, payload).await;
        });
    }
}

impl fmt::Debug for HookBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.hooks.read();
        let mut map = f.debug_map();
        for (signal, list) in hooks.iter() {
            map.entry(signal, &list.len());
        }
        map.finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
