//! Connect-with-retry over WebSocket.
//!
//! A [`TransportSession`] opens links to one endpoint under a
//! [`RetryPolicy`]. At most one connect sequence runs at a time.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::connector::RetryPolicy;
use crate::error::{Error, Result};

use super::link::WsStream;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for a single opening handshake.
pub const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// TransportSession
// ============================================================================

/// Opens WebSocket links to a fixed endpoint.
#[derive(Debug)]
pub struct TransportSession {
    url: Url,
    policy: RetryPolicy,
    /// Serializes connect sequences.
    run_lock: Mutex<()>,
}

impl TransportSession {
    /// Creates a session for `url`.
    #[must_use]
    pub fn new(url: Url, policy: RetryPolicy) -> Self {
        Self {
            url,
            policy,
            run_lock: Mutex::new(()),
        }
    }

    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Opens a link, retrying per the policy.
    ///
    /// Returns `Ok(None)` if `cancel` fires before a link opens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectFailed`] once the retry budget is exhausted.
    pub async fn connect(&self, cancel: &CancellationToken) -> Result<Option<WsStream>> {
        let _running = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(None),
            guard = self.run_lock.lock() => guard,
        };

        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            debug!(url = %self.url, attempt = attempts, "Opening transport");

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(url = %self.url, "Connect cancelled");
                    return Ok(None);
                }
                outcome = timeout(OPEN_TIMEOUT, connect_async(self.url.as_str())) => outcome,
            };

            let reason = match outcome {
                Ok(Ok((stream, _response))) => {
                    info!(url = %self.url, attempts, "Transport opened");
                    return Ok(Some(stream));
                }
                Ok(Err(e)) => Error::from(e),
                Err(_) => Error::connection(format!(
                    "opening handshake exceeded {OPEN_TIMEOUT:?}"
                )),
            };

            if !self.policy.allows_retry(attempts) {
                error!(url = %self.url, attempts, error = %reason, "Connect retries exhausted");
                return Err(Error::connect_failed(self.url.as_str(), attempts));
            }

            let delay = self.policy.retry_delay();
            warn!(
                url = %self.url,
                attempt = attempts,
                error = %reason,
                retry_in = ?delay,
                "Connect attempt failed"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(url = %self.url, "Connect cancelled during retry delay");
                    return Ok(None);
                }
                () = sleep(delay) => {}
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
