//! Connector lifecycle and reconnect loop.
//!
//! A [`Connector`] drives one session: it opens links through the
//! [`TransportSession`], runs a sender loop and the receive loop per link,
//! and decides after every link loss whether to reconnect or stop.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use botwire::{Action, Bindings, Connector, ConnectorOptions};
//!
//! let options = ConnectorOptions::builder().host("127.0.0.1").port(6700).build()?;
//! let connector = Arc::new(Connector::new(options, Bindings::new(responder, dispatcher)));
//!
//! let session = connector.start();
//! connector.wait_ready().await?;
//! connector.submit(Action::new("send_msg", params)?).await?;
//!
//! connector.close();
//! session.await??;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::hooks::{HookBus, HookPayload, LifecycleSignal};
use crate::pipeline::{InboundPipeline, OutboundPipeline, ReceiveExit, Submission};
use crate::protocol::{Action, FrameDecoder, FrameDispatcher, JsonFrameDecoder};
use crate::transport::{TransportSession, WsStream, link};

use super::options::ConnectorOptions;
use super::state::{CloseSwitch, ConnectionState, ReadyGate};

// ============================================================================
// Bindings
// ============================================================================

/// Collaborators a connector hands frames and lifecycle signals to.
#[derive(Clone)]
pub struct Bindings {
    decoder: Arc<dyn FrameDecoder>,
    responder: Arc<dyn FrameDispatcher>,
    dispatcher: Arc<dyn FrameDispatcher>,
    hooks: Arc<HookBus>,
}

impl Bindings {
    /// Creates bindings with the JSON decoder and an empty hook bus.
    ///
    /// # Arguments
    ///
    /// * `responder` - Receives response frames
    /// * `dispatcher` - Receives every other frame
    #[must_use]
    pub fn new(responder: Arc<dyn FrameDispatcher>, dispatcher: Arc<dyn FrameDispatcher>) -> Self {
        Self {
            decoder: Arc::new(JsonFrameDecoder),
            responder,
            dispatcher,
            hooks: Arc::new(HookBus::new()),
        }
    }

    /// Replaces the frame decoder.
    #[must_use]
    pub fn decoder(mut self, decoder: Arc<dyn FrameDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Uses an existing hook bus.
    #[must_use]
    pub fn hooks(mut self, hooks: Arc<HookBus>) -> Self {
        self.hooks = hooks;
        self
    }
}

impl std::fmt::Debug for Bindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bindings")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Connector
// ============================================================================

/// One bot session over a reconnecting WebSocket.
///
/// # Thread Safety
///
/// `Connector` is `Send + Sync`; share it behind an `Arc`.
#[derive(Debug)]
pub struct Connector {
    options: ConnectorOptions,
    transport: TransportSession,
    outbound: OutboundPipeline,
    inbound: InboundPipeline,
    hooks: Arc<HookBus>,
    state: watch::Sender<ConnectionState>,
    switch: CloseSwitch,
    /// Held for the duration of [`Self::run`].
    running: Mutex<()>,
}

impl Connector {
    /// Creates an idle connector.
    #[must_use]
    pub fn new(options: ConnectorOptions, bindings: Bindings) -> Self {
        let Bindings {
            decoder,
            responder,
            dispatcher,
            hooks,
        } = bindings;

        let (state, _) = watch::channel(ConnectionState::Idle);

        Self {
            transport: TransportSession::new(options.url().clone(), options.retry()),
            outbound: OutboundPipeline::new(options.cd_time()),
            inbound: InboundPipeline::new(decoder, responder, dispatcher, Arc::clone(&hooks)),
            switch: CloseSwitch::new(options.allow_reconnect()),
            hooks,
            state,
            running: Mutex::new(()),
            options,
        }
    }

    /// Spawns [`Self::run`] on the runtime.
    pub fn start(self: &Arc<Self>) -> JoinHandle<Result<()>> {
        let connector = Arc::clone(self);
        tokio::spawn(async move { connector.run().await })
    }

    /// Runs the session until it closes.
    ///
    /// Returns `Ok(())` after a requested or unrecoverable-but-expected close.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the session is already running
    /// - [`Error::ConnectionClosed`] if the session was closed before
    /// - [`Error::ConnectFailed`] if the retry budget ran out
    pub async fn run(&self) -> Result<()> {
        let Ok(_running) = self.running.try_lock() else {
            return Err(Error::invalid_state("connector is already running"));
        };
        if self.state().is_terminal() {
            return Err(Error::ConnectionClosed);
        }

        info!(url = %self.url(), "Connector starting");
        let result = self.connect_cycle().await;

        if let Err(e) = &result {
            warn!(url = %self.url(), error = %e, "Connector stopped with error");
        }
        if self.transition(ConnectionState::Closed) {
            self.hooks
                .emit_detached(LifecycleSignal::Closed, HookPayload::Empty);
        }
        info!(url = %self.url(), "Connector closed");

        result
    }

    /// Connect, serve, and reconnect while allowed.
    async fn connect_cycle(&self) -> Result<()> {
        let mut reconnected = false;

        loop {
            if self.switch.is_closing() {
                return Ok(());
            }

            self.transition(ConnectionState::Connecting);
            let Some(stream) = self.transport.connect(self.switch.token()).await? else {
                return Ok(());
            };

            match self.serve_link(stream, reconnected).await {
                ReceiveExit::Reconnect => {
                    self.transition(ConnectionState::Reconnecting);
                    reconnected = true;
                }
                ReceiveExit::Terminated => return Ok(()),
            }
        }
    }

    /// Runs the sender and receive loops for one link and tears it down.
    async fn serve_link(&self, stream: WsStream, reconnected: bool) -> ReceiveExit {
        let (writer, reader) = link::split(stream);
        let link_token = self.switch.token().child_token();

        self.transition(ConnectionState::Ready);
        let sender = self.outbound.spawn_sender(
            writer.clone(),
            self.ready_gate(),
            Arc::clone(&self.hooks),
            link_token.clone(),
        );

        let exit = self
            .inbound
            .run(reader, reconnected, &self.switch, &link_token)
            .await;

        self.transition(ConnectionState::Closing);
        link_token.cancel();
        if let Err(e) = sender.await {
            warn!(error = %e, "Sender loop ended abnormally");
        }
        writer.force_close().await;

        exit
    }

    /// Moves to `next` unless the session is already closed.
    ///
    /// Returns `true` if the state changed.
    fn transition(&self, next: ConnectionState) -> bool {
        let mut previous = next;
        let changed = self.state.send_if_modified(|state| {
            if state.is_terminal() || *state == next {
                return false;
            }
            previous = *state;
            *state = next;
            true
        });

        if changed {
            debug!(from = %previous, to = %next, "Connection state changed");
        }
        changed
    }

    /// Requests a terminal close.
    ///
    /// Disables reconnect, cancels every loop and closes the link. Calling
    /// this more than once has no further effect.
    pub fn close(&self) {
        if !self.switch.request_close() {
            debug!("Close already requested");
            return;
        }
        info!(url = %self.url(), "Close requested");

        // A session that never ran has no loop to finish the close.
        let was_idle = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Idle {
                *state = ConnectionState::Closed;
                true
            } else {
                false
            }
        });
        if was_idle {
            self.hooks
                .emit_detached(LifecycleSignal::Closed, HookPayload::Empty);
        }
    }

    /// Waits for the gate, then queues `action`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the session closes first.
    pub async fn submit(&self, action: Action) -> Result<Submission> {
        let mut gate = self.ready_gate();
        self.outbound.submit(action, &mut gate).await
    }

    /// Waits until a link is ready.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the session closes first.
    pub async fn wait_ready(&self) -> Result<()> {
        self.ready_gate().wait().await
    }

    /// Returns a gate observing this session.
    #[must_use]
    pub fn ready_gate(&self) -> ReadyGate {
        ReadyGate::new(self.state.subscribe())
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Enables or disables slack mode (submissions are dropped).
    pub fn set_slack(&self, slack: bool) {
        self.outbound.set_slack(slack);
    }

    #[inline]
    #[must_use]
    pub fn is_slack(&self) -> bool {
        self.outbound.is_slack()
    }

    /// Returns `true` once [`Self::close`] was requested.
    #[inline]
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.switch.is_closing()
    }

    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        self.options.url()
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &ConnectorOptions {
        &self.options
    }

    /// Returns the hook bus shared with the pipelines.
    #[inline]
    #[must_use]
    pub fn hooks(&self) -> &Arc<HookBus> {
        &self.hooks
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::protocol::Frame;

    struct Discard;

    #[async_trait]
    impl FrameDispatcher for Discard {
        async fn dispatch(&self, _frame: Frame) {}
    }

    fn connector() -> Connector {
        let options = ConnectorOptions::builder()
            .host("127.0.0.1")
            .port(1)
            .build()
            .unwrap();
        Connector::new(options, Bindings::new(Arc::new(Discard), Arc::new(Discard)))
    }

    #[test]
    fn test_new_is_idle() {
        let connector = connector();
        assert_eq!(connector.state(), ConnectionState::Idle);
        assert!(!connector.is_closing());
        assert!(!connector.ready_gate().is_open());
        assert_eq!(connector.url().as_str(), "ws://127.0.0.1:1/");
    }

    #[tokio::test]
    async fn test_close_before_run() {
        let connector = connector();
        let closed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closed);
        connector.hooks().on(LifecycleSignal::Closed, move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        connector.close();
        connector.close();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(connector.state(), ConnectionState::Closed);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(matches!(connector.run().await, Err(Error::ConnectionClosed)));
        assert!(matches!(connector.wait_ready().await, Err(Error::ConnectionClosed)));
    }

    #[test]
    fn test_transition_never_leaves_closed() {
        let connector = connector();
        assert!(connector.transition(ConnectionState::Connecting));
        assert!(!connector.transition(ConnectionState::Connecting));
        assert!(connector.transition(ConnectionState::Closed));
        assert!(!connector.transition(ConnectionState::Ready));
        assert_eq!(connector.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_slack_toggle() {
        let connector = connector();
        connector.set_slack(true);
        assert!(connector.is_slack());
        connector.set_slack(false);
        assert!(!connector.is_slack());
    }
}
