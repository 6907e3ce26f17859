//! Connector configuration.
//!
//! Provides a validated, immutable set of options describing the endpoint,
//! the retry policy and the outbound cooldown.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use botwire::ConnectorOptions;
//!
//! let options = ConnectorOptions::builder()
//!     .host("127.0.0.1")
//!     .port(8080)
//!     .max_retry(5)
//!     .retry_delay(Duration::from_secs(2))
//!     .allow_reconnect(true)
//!     .build()?;
//!
//! assert_eq!(options.url().as_str(), "ws://127.0.0.1:8080/");
//! ```
//!
//! # JSON
//!
//! ```json
//! {
//!   "connectHost": "127.0.0.1",
//!   "connectPort": 8080,
//!   "maxRetry": -1,
//!   "retryDelay": 4.0,
//!   "cdTime": 0.2,
//!   "allowReconnect": false
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::Result;

use super::builder::ConnectorOptionsBuilder;

// ============================================================================
// Constants
// ============================================================================

/// Default delay between connect attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(4);

/// Default minimum interval between two transmissions.
pub const DEFAULT_CD_TIME: Duration = Duration::from_millis(200);

/// Unbounded retry budget.
pub const UNLIMITED_RETRY: i32 = -1;

// ============================================================================
// RetryPolicy
// ============================================================================

/// Connect retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retry: i32,
    retry_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy; a negative `max_retry` retries forever.
    #[inline]
    #[must_use]
    pub const fn new(max_retry: i32, retry_delay: Duration) -> Self {
        Self {
            max_retry,
            retry_delay,
        }
    }

    /// Returns the configured retry count (negative = unbounded).
    #[inline]
    #[must_use]
    pub const fn max_retry(&self) -> i32 {
        self.max_retry
    }

    /// Returns the delay between attempts.
    #[inline]
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Returns the total number of attempts, `None` if unbounded.
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> Option<u64> {
        u64::try_from(self.max_retry).ok().map(|retries| retries + 1)
    }

    /// Returns `true` if another attempt may follow `attempts_made` failures.
    #[inline]
    #[must_use]
    pub fn allows_retry(&self, attempts_made: u64) -> bool {
        self.max_attempts()
            .is_none_or(|max_attempts| attempts_made < max_attempts)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(UNLIMITED_RETRY, DEFAULT_RETRY_DELAY)
    }
}

// ============================================================================
// ConnectorOptions
// ============================================================================

/// Validated connector configuration.
///
/// Built with [`ConnectorOptions::builder`] or [`ConnectorOptions::from_json`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorOptions {
    pub(crate) connect_host: String,
    pub(crate) connect_port: u16,
    pub(crate) url: Url,
    pub(crate) retry: RetryPolicy,
    pub(crate) cd_time: Duration,
    pub(crate) allow_reconnect: bool,
}

impl ConnectorOptions {
    /// Returns a builder with default settings.
    #[inline]
    #[must_use]
    pub fn builder() -> ConnectorOptionsBuilder {
        ConnectorOptionsBuilder::new()
    }

    /// Parses options from JSON using the camelCase keys shown above.
    ///
    /// Negative durations are clamped to zero.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Json`] if the document is malformed
    /// - [`crate::Error::Config`] if required values are missing or invalid
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawOptions = serde_json::from_str(json)?;

        let mut builder = Self::builder()
            .host(raw.connect_host)
            .port(raw.connect_port);
        if let Some(max_retry) = raw.max_retry {
            builder = builder.max_retry(max_retry);
        }
        if let Some(secs) = raw.retry_delay {
            builder = builder.retry_delay_secs(secs);
        }
        if let Some(secs) = raw.cd_time {
            builder = builder.cd_time_secs(secs);
        }
        if let Some(allow) = raw.allow_reconnect {
            builder = builder.allow_reconnect(allow);
        }

        builder.build()
    }

    #[inline]
    #[must_use]
    pub fn connect_host(&self) -> &str {
        &self.connect_host
    }

    #[inline]
    #[must_use]
    pub fn connect_port(&self) -> u16 {
        self.connect_port
    }

    /// Returns the endpoint URL (`ws://host:port/`).
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the connect retry policy.
    #[inline]
    #[must_use]
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Returns the minimum interval between transmissions.
    #[inline]
    #[must_use]
    pub fn cd_time(&self) -> Duration {
        self.cd_time
    }

    /// Returns whether transport loss triggers a reconnect.
    #[inline]
    #[must_use]
    pub fn allow_reconnect(&self) -> bool {
        self.allow_reconnect
    }
}

/// Serialized form accepted by [`ConnectorOptions::from_json`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawOptions {
    connect_host: String,
    connect_port: u16,
    max_retry: Option<i32>,
    retry_delay: Option<f64>,
    cd_time: Option<f64>,
    allow_reconnect: Option<bool>,
}

// ============================================================================
// Tests
// ============================================================================
