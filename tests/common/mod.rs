//! Shared fixtures for integration tests.
//!
//! Provides a local WebSocket backend that reports what it receives and can
//! push frames or drop the link on demand.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use botwire::{Frame, FrameDispatcher};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test subscriber honouring `RUST_LOG`; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Backend
// ============================================================================

/// What the backend observed.
#[derive(Debug)]
pub enum ServerEvent {
    /// A client completed the handshake.
    Connected(ConnHandle),
    /// A text frame arrived.
    Received { text: String, at: Instant },
    /// The client link ended.
    Closed,
}

enum Control {
    Send(String),
    Drop,
}

/// Controls one accepted client link.
#[derive(Debug, Clone)]
pub struct ConnHandle {
    control: mpsc::UnboundedSender<Control>,
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send(text) => f.debug_tuple("Send").field(text).finish(),
            Self::Drop => f.write_str("Drop"),
        }
    }
}

impl ConnHandle {
    /// Pushes a text frame to the client.
    pub fn send(&self, text: impl Into<String>) {
        let _ = self.control.send(Control::Send(text.into()));
    }

    /// Drops the TCP link without a close handshake.
    pub fn drop_connection(&self) {
        let _ = self.control.send(Control::Drop);
    }
}

/// Local WebSocket backend.
pub struct TestServer {
    pub addr: SocketAddr,
    pub events: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestServer {
    /// Binds to an ephemeral localhost port and starts accepting.
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (events_tx, events) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let events_tx = events_tx.clone();
                tokio::spawn(async move {
                    let Ok(ws) = accept_async(stream).await else {
                        return;
                    };
                    let (mut write, mut read) = ws.split();
                    let (control, mut control_rx) = mpsc::unbounded_channel();
                    let _ = events_tx.send(ServerEvent::Connected(ConnHandle { control }));

                    loop {
                        tokio::select! {
                            msg = read.next() => match msg {
                                Some(Ok(Message::Text(text))) => {
                                    let _ = events_tx.send(ServerEvent::Received {
                                        text: text.to_string(),
                                        at: Instant::now(),
                                    });
                                }
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                Some(Ok(_)) => {}
                            },
                            Some(control) = control_rx.recv() => match control {
                                Control::Send(text) => {
                                    if write.send(Message::Text(text.into())).await.is_err() {
                                        break;
                                    }
                                }
                                Control::Drop => break,
                            },
                        }
                    }

                    let _ = events_tx.send(ServerEvent::Closed);
                });
            }
        });

        Ok(Self { addr, events })
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Waits for the next event.
    pub async fn next_event(&mut self) -> Result<ServerEvent> {
        timeout(Duration::from_secs(5), self.events.recv())
            .await
            .context("timed out waiting for server event")?
            .context("server stopped")
    }

    /// Waits for the next client handshake, skipping other events.
    pub async fn next_connection(&mut self) -> Result<ConnHandle> {
        loop {
            if let ServerEvent::Connected(handle) = self.next_event().await? {
                return Ok(handle);
            }
        }
    }

    /// Waits for the next received text frame, skipping other events.
    pub async fn next_text(&mut self) -> Result<(String, Instant)> {
        loop {
            if let ServerEvent::Received { text, at } = self.next_event().await? {
                return Ok((text, at));
            }
        }
    }

    /// Collects every event arriving within `window`.
    pub async fn drain_for(&mut self, window: Duration) -> Vec<ServerEvent> {
        let mut seen = Vec::new();
        let deadline = Instant::now() + window;
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, self.events.recv()).await {
            seen.push(event);
        }
        seen
    }
}

// ============================================================================
// Endpoints without a backend
// ============================================================================

/// Accepts TCP connections and drops them, counting each attempt.
pub async fn refusing_endpoint() -> Result<(u16, Arc<AtomicUsize>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    Ok((port, accepted))
}

/// Returns a localhost port nothing listens on.
pub async fn unused_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

// ============================================================================
// Dispatchers
// ============================================================================

/// Forwards every dispatched frame into a channel.
pub struct RecordingDispatcher {
    frames: mpsc::UnboundedSender<Frame>,
}

impl RecordingDispatcher {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Frame>) {
        let (frames, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { frames }), rx)
    }
}

#[async_trait]
impl FrameDispatcher for RecordingDispatcher {
    async fn dispatch(&self, frame: Frame) {
        let _ = self.frames.send(frame);
    }
}
