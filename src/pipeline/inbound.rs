//! Inbound receive loop.
//!
//! Reads text units from the link, decodes them and hands every frame to a
//! dispatcher on its own task. The loop never waits for dispatch, so frames
//! are issued in receive order while their handling may interleave.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::connector::CloseSwitch;
use crate::hooks::{HookBus, HookPayload, LifecycleSignal};
use crate::protocol::{Frame, FrameDecoder, FrameDispatcher};
use crate::transport::LinkReader;

// ============================================================================
// ReceiveExit
// ============================================================================

/// What the lifecycle should do after the receive loop returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveExit {
    /// The link was lost and reconnecting is allowed.
    Reconnect,
    /// The session is over.
    Terminated,
}

// ============================================================================
// InboundPipeline
// ============================================================================

/// Decoder and dispatch targets for incoming frames.
#[derive(Clone)]
pub struct InboundPipeline {
    decoder: Arc<dyn FrameDecoder>,
    /// Receives [`crate::FrameKind::Response`] frames.
    responder: Arc<dyn FrameDispatcher>,
    /// Receives every other frame.
    dispatcher: Arc<dyn FrameDispatcher>,
    hooks: Arc<HookBus>,
}

impl InboundPipeline {
    #[must_use]
    pub fn new(
        decoder: Arc<dyn FrameDecoder>,
        responder: Arc<dyn FrameDispatcher>,
        dispatcher: Arc<dyn FrameDispatcher>,
        hooks: Arc<HookBus>,
    ) -> Self {
        Self {
            decoder,
            responder,
            dispatcher,
            hooks,
        }
    }

    /// Serves one link until it closes or `token` is cancelled.
    pub(crate) async fn run(
        &self,
        mut reader: LinkReader,
        reconnected: bool,
        switch: &CloseSwitch,
        token: &CancellationToken,
    ) -> ReceiveExit {
        let signal = if reconnected {
            LifecycleSignal::Reconnected
        } else {
            LifecycleSignal::FirstConnected
        };

        tokio::select! {
            biased;
            () = token.cancelled() => return self.after_closure(switch),
            () = self.hooks.emit(signal, HookPayload::Empty) => {}
        }

        let mut received: u64 = 0;
        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => break,
                next = reader.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    received += 1;
                    self.handle_text(text.as_str(), received);
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Remote closed the link");
                    break;
                }
                Some(Ok(_)) => trace!("Non-text unit ignored"),
                Some(Err(e)) => {
                    warn!(error = %e, "Link read failed");
                    break;
                }
                None => {
                    debug!("Link stream ended");
                    break;
                }
            }
        }

        self.after_closure(switch)
    }

    /// Decodes one text unit and dispatches the result.
    fn handle_text(&self, text: &str, received: u64) {
        if text.is_empty() {
            trace!(received, "Empty unit skipped");
            return;
        }

        match self.decoder.decode(text) {
            Ok(frame) => self.dispatch(frame),
            Err(e) => {
                error!(error = %e, raw = text, received, "Failed to decode frame");
            }
        }
    }

    fn dispatch(&self, frame: Frame) {
        let target = if frame.is_response() {
            Arc::clone(&self.responder)
        } else {
            Arc::clone(&self.dispatcher)
        };

        trace!(kind = %frame.kind(), "Dispatching frame");
        tokio::spawn(async move {
            target.dispatch(frame).await;
        });
    }

    /// Decides between reconnecting and terminating after link loss.
    fn after_closure(&self, switch: &CloseSwitch) -> ReceiveExit {
        if switch.is_closing() {
            debug!("Link closed on request");
            return ReceiveExit::Terminated;
        }

        if switch.allow_reconnect() {
            info!("Link lost, reconnect allowed");
            return ReceiveExit::Reconnect;
        }

        info!("Link lost, reconnect disabled; closing");
        switch.request_close();
        ReceiveExit::Terminated
    }
}

impl std::fmt::Debug for InboundPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundPipeline")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use crate::protocol::{FrameKind, JsonFrameDecoder};

    struct Forward(mpsc::UnboundedSender<Frame>);

    #[async_trait]
    impl FrameDispatcher for Forward {
        async fn dispatch(&self, frame: Frame) {
            let _ = self.0.send(frame);
        }
    }

    struct Fixture {
        pipeline: InboundPipeline,
        responses: mpsc::UnboundedReceiver<Frame>,
        events: mpsc::UnboundedReceiver<Frame>,
    }

    fn fixture() -> Fixture {
        let (response_tx, responses) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let pipeline = InboundPipeline::new(
            Arc::new(JsonFrameDecoder),
            Arc::new(Forward(response_tx)),
            Arc::new(Forward(event_tx)),
            Arc::new(HookBus::new()),
        );
        Fixture {
            pipeline,
            responses,
            events,
        }
    }

    #[tokio::test]
    async fn test_routes_by_kind() {
        let mut fx = fixture();

        fx.pipeline
            .handle_text(r#"{"post_type":"notice","time":1}"#, 1);
        fx.pipeline
            .handle_text(r#"{"status":"ok","retcode":0,"echo":"7"}"#, 2);

        let event = timeout(Duration::from_secs(1), fx.events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind(), FrameKind::Notice);

        let response = timeout(Duration::from_secs(1), fx.responses.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(response.is_response());
        assert_eq!(response.echo(), Some("7"));
    }

    #[tokio::test]
    async fn test_skips_empty_and_undecodable_units() {
        let mut fx = fixture();

        fx.pipeline.handle_text("", 1);
        fx.pipeline.handle_text("not json", 2);
        fx.pipeline.handle_text(r#"{"post_type":"message"}"#, 3);

        let event = timeout(Duration::from_secs(1), fx.events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(event.is_message());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(fx.events.try_recv().is_err());
        assert!(fx.responses.try_recv().is_err());
    }

    #[test]
    fn test_after_closure_decisions() {
        let fx = fixture();

        let closing = CloseSwitch::new(true);
        closing.request_close();
        assert_eq!(fx.pipeline.after_closure(&closing), ReceiveExit::Terminated);

        let reconnecting = CloseSwitch::new(true);
        assert_eq!(fx.pipeline.after_closure(&reconnecting), ReceiveExit::Reconnect);
        assert!(!reconnecting.is_closing());

        let terminal = CloseSwitch::new(false);
        assert_eq!(fx.pipeline.after_closure(&terminal), ReceiveExit::Terminated);
        assert!(terminal.is_closing());
        assert!(terminal.token().is_cancelled());
    }
}
