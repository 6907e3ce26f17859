//! Outbound action queue and sender loop.
//!
//! Submitters enqueue into an unbounded FIFO; exactly one sender loop drains
//! it per link. Before each transmission the loop:
//!
//! 1. waits for the ready gate,
//! 2. awaits every `ActionPresend` hook,
//! 3. sleeps out the remaining cooldown.
//!
//! An action dequeued by a loop whose link went away stays pending and is
//! the first one the next loop sends, so submission order survives
//! reconnects. Its `ActionPresend` hooks are not run a second time.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::connector::ReadyGate;
use crate::error::{Error, Result};
use crate::hooks::{HookBus, HookPayload, LifecycleSignal};
use crate::identifiers::ActionId;
use crate::protocol::Action;
use crate::transport::LinkWriter;

// ============================================================================
// Submission
// ============================================================================

/// Outcome of [`OutboundPipeline::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The action is queued for transmission.
    Queued(ActionId),
    /// Slack mode is on; the action was discarded.
    Dropped(ActionId),
}

impl Submission {
    /// Returns the id of the submitted action.
    #[inline]
    #[must_use]
    pub fn action_id(&self) -> ActionId {
        match self {
            Self::Queued(id) | Self::Dropped(id) => *id,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }
}

// ============================================================================
// CooldownState
// ============================================================================

/// Minimum gap between consecutive transmissions.
#[derive(Debug, Clone, Copy)]
struct CooldownState {
    last_send_at: Option<Instant>,
    min_interval: Duration,
}

impl CooldownState {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_send_at: None,
            min_interval,
        }
    }

    /// Time left before the next send may go out.
    fn remaining(&self, now: Instant) -> Duration {
        self.last_send_at.map_or(Duration::ZERO, |last| {
            self.min_interval
                .saturating_sub(now.saturating_duration_since(last))
        })
    }

    fn record(&mut self, at: Instant) {
        self.last_send_at = Some(at);
    }
}

/// State owned by whichever sender loop currently runs.
#[derive(Debug)]
struct SenderState {
    queue_rx: mpsc::UnboundedReceiver<Action>,
    /// Dequeued but not yet transmitted.
    pending: Option<Action>,
    /// `ActionPresend` already ran for `pending`.
    announced: bool,
    cooldown: CooldownState,
}

// ============================================================================
// OutboundPipeline
// ============================================================================

/// FIFO command queue with cooldown and pre-send notification.
#[derive(Debug)]
pub struct OutboundPipeline {
    queue_tx: mpsc::UnboundedSender<Action>,
    sender: Arc<Mutex<SenderState>>,
    slack: AtomicBool,
}

impl OutboundPipeline {
    /// Creates a pipeline enforcing `min_interval` between transmissions.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            queue_tx,
            sender: Arc::new(Mutex::new(SenderState {
                queue_rx,
                pending: None,
                announced: false,
                cooldown: CooldownState::new(min_interval),
            })),
            slack: AtomicBool::new(false),
        }
    }

    /// Enables or disables slack mode.
    pub fn set_slack(&self, slack: bool) {
        self.slack.store(slack, Ordering::SeqCst);
        info!(slack, "Slack mode changed");
    }

    #[inline]
    #[must_use]
    pub fn is_slack(&self) -> bool {
        self.slack.load(Ordering::SeqCst)
    }

    /// Waits for `gate`, then queues `action` (or drops it in slack mode).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the session closes first.
    pub async fn submit(&self, action: Action, gate: &mut ReadyGate) -> Result<Submission> {
        gate.wait().await?;

        let id = action.id();
        if self.is_slack() {
            info!(action_id = %id, action = action.name(), "Slack mode, action dropped");
            return Ok(Submission::Dropped(id));
        }

        let name = action.name().to_owned();
        self.queue_tx
            .send(action)
            .map_err(|_| Error::ConnectionClosed)?;
        debug!(action_id = %id, action = %name, "Action queued");
        Ok(Submission::Queued(id))
    }

    /// Starts the sender loop for one link.
    ///
    /// The loop ends when `token` is cancelled, the gate reports the session
    /// closed, or a transmission fails.
    pub(crate) fn spawn_sender(
        &self,
        writer: LinkWriter,
        gate: ReadyGate,
        hooks: Arc<HookBus>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let sender = Arc::clone(&self.sender);

        tokio::spawn(async move {
            // A previous loop may still be winding down.
            let mut state = tokio::select! {
                biased;
                () = token.cancelled() => return,
                state = sender.lock_owned() => state,
            };

            let mut gate = gate;
            drain(&mut state, &writer, &mut gate, &hooks, &token).await;
            trace!("Sender loop stopped");
        })
    }
}

/// Sender loop body.
async fn drain(
    state: &mut SenderState,
    writer: &LinkWriter,
    gate: &mut ReadyGate,
    hooks: &HookBus,
    token: &CancellationToken,
) {
    loop {
        if state.pending.is_none() {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => return,
                next = state.queue_rx.recv() => next,
            };
            let Some(action) = next else {
                return;
            };
            state.pending = Some(action);
            state.announced = false;
        }

        let ready = tokio::select! {
            biased;
            () = token.cancelled() => return,
            ready = gate.wait() => ready,
        };
        if ready.is_err() {
            return;
        }

        let Some(action) = state.pending.clone() else {
            continue;
        };

        // Announced once per action, even if a link dies before the send.
        if !state.announced {
            state.announced = true;
            tokio::select! {
                biased;
                () = token.cancelled() => return,
                () = hooks.emit(LifecycleSignal::ActionPresend, HookPayload::Action(action.clone())) => {}
            }
        }

        let wait = state.cooldown.remaining(Instant::now());
        if !wait.is_zero() {
            trace!(action_id = %action.id(), wait = ?wait, "Cooling down");
            tokio::select! {
                biased;
                () = token.cancelled() => return,
                () = sleep(wait) => {}
            }
        }

        // Not reissued on failure.
        state.pending = None;
        state.announced = false;

        let sent = tokio::select! {
            biased;
            () = token.cancelled() => return,
            sent = writer.send_text(action.payload()) => sent,
        };

        match sent {
            Ok(()) => {
                state.cooldown.record(Instant::now());
                debug!(action_id = %action.id(), action = action.name(), "Action sent");
            }
            Err(e) => {
                error!(
                    action_id = %action.id(),
                    action = action.name(),
                    error = %e,
                    "Failed to send action"
                );
                return;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::sync::watch;

    use crate::connector::ConnectionState;

    fn gate(state: ConnectionState) -> (watch::Sender<ConnectionState>, ReadyGate) {
        let (tx, rx) = watch::channel(state);
        (tx, ReadyGate::new(rx))
    }

    #[test]
    fn test_cooldown_first_send_not_delayed() {
        let cooldown = CooldownState::new(Duration::from_secs(1));
        assert_eq!(cooldown.remaining(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn test_cooldown_remaining() {
        let mut cooldown = CooldownState::new(Duration::from_millis(200));
        let sent_at = Instant::now();
        cooldown.record(sent_at);

        assert_eq!(cooldown.remaining(sent_at), Duration::from_millis(200));
        assert_eq!(
            cooldown.remaining(sent_at + Duration::from_millis(150)),
            Duration::from_millis(50)
        );
        assert_eq!(
            cooldown.remaining(sent_at + Duration::from_millis(500)),
            Duration::ZERO
        );
    }

    #[tokio::test]
    async fn test_submit_queues_in_order() {
        let pipeline = OutboundPipeline::new(Duration::ZERO);
        let (_tx, mut gate) = gate(ConnectionState::Ready);

        let first = Action::new("first", json!({})).unwrap();
        let second = Action::new("second", json!({})).unwrap();
        let first_id = first.id();

        let submission = pipeline.submit(first, &mut gate).await.unwrap();
        assert_eq!(submission, Submission::Queued(first_id));
        pipeline.submit(second, &mut gate).await.unwrap();

        let mut state = pipeline.sender.try_lock().unwrap();
        assert_eq!(state.queue_rx.try_recv().unwrap().name(), "first");
        assert_eq!(state.queue_rx.try_recv().unwrap().name(), "second");
    }

    #[tokio::test]
    async fn test_submit_in_slack_mode_drops() {
        let pipeline = OutboundPipeline::new(Duration::ZERO);
        let (_tx, mut gate) = gate(ConnectionState::Ready);
        pipeline.set_slack(true);
        assert!(pipeline.is_slack());

        let submission = pipeline
            .submit(Action::from_payload("noop", "{}"), &mut gate)
            .await
            .unwrap();
        assert!(!submission.is_queued());

        let mut state = pipeline.sender.try_lock().unwrap();
        assert!(state.queue_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submit_waits_for_gate() {
        let pipeline = Arc::new(OutboundPipeline::new(Duration::ZERO));
        let (tx, gate) = gate(ConnectionState::Connecting);

        let submitter = tokio::spawn({
            let pipeline = Arc::clone(&pipeline);
            let mut gate = gate;
            async move {
                pipeline
                    .submit(Action::from_payload("late", "{}"), &mut gate)
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!submitter.is_finished());

        tx.send_replace(ConnectionState::Ready);
        let submission = submitter.await.unwrap().unwrap();
        assert!(submission.is_queued());
    }

    #[tokio::test]
    async fn test_submit_fails_after_close() {
        let pipeline = OutboundPipeline::new(Duration::ZERO);
        let (_tx, mut gate) = gate(ConnectionState::Closed);

        let result = pipeline
            .submit(Action::from_payload("noop", "{}"), &mut gate)
            .await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }
}
