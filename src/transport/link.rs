//! Split halves of an open WebSocket link.
//!
//! The writer is shared between the sender loop and the teardown path; the
//! reader is moved into the receive loop.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Time granted to the close handshake before the link is dropped anyway.
pub const CLOSE_GRACE: Duration = Duration::from_millis(10);

// ============================================================================
// Types
// ============================================================================

/// Client WebSocket stream.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Receiving half of a link.
pub type LinkReader = SplitStream<WsStream>;

/// Splits an open stream into its writer and reader halves.
pub fn split(stream: WsStream) -> (LinkWriter, LinkReader) {
    let (sink, reader) = stream.split();
    let writer = LinkWriter {
        sink: Arc::new(Mutex::new(sink)),
        closed: Arc::new(AtomicBool::new(false)),
    };
    (writer, reader)
}

// ============================================================================
// LinkWriter
// ============================================================================

/// Sending half of a link.
#[derive(Clone)]
pub struct LinkWriter {
    sink: Arc<Mutex<SplitSink<WsStream, Message>>>,
    closed: Arc<AtomicBool>,
}

impl LinkWriter {
    /// Sends one text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the link was force-closed
    /// - [`Error::WebSocket`] if the transport rejects the frame
    pub async fn send_text(&self, text: &str) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.to_owned().into())).await?;
        trace!(len = text.len(), "Frame sent");
        Ok(())
    }

    /// Returns `true` once [`Self::force_close`] ran.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes the link without waiting on an unresponsive remote.
    ///
    /// The close handshake gets [`CLOSE_GRACE`]; after that the link is
    /// abandoned. Calling this again is a no-op.
    pub async fn force_close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let handshake = async {
            let mut sink = self.sink.lock().await;
            sink.close().await
        };

        match timeout(CLOSE_GRACE, handshake).await {
            Ok(Ok(())) => debug!("Link closed"),
            Ok(Err(e)) => debug!(error = %e, "Close handshake failed, closing anyway"),
            Err(_) => debug!(grace = ?CLOSE_GRACE, "Close handshake timed out, closing anyway"),
        }
    }
}

impl std::fmt::Debug for LinkWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkWriter")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
