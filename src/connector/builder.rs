//! Builder pattern for connector configuration.
//!
//! Provides a fluent API for assembling validated [`ConnectorOptions`].
//!
//! # Example
//!
//! ```no_run
//! use botwire::ConnectorOptions;
//!
//! # fn example() -> botwire::Result<()> {
//! let options = ConnectorOptions::builder()
//!     .host("127.0.0.1")
//!     .port(6700)
//!     .cd_time_secs(0.5)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

use super::options::{
    ConnectorOptions, DEFAULT_CD_TIME, DEFAULT_RETRY_DELAY, RetryPolicy, UNLIMITED_RETRY,
};

// ============================================================================
// ConnectorOptionsBuilder
// ============================================================================

/// Builder for [`ConnectorOptions`].
///
/// Use [`ConnectorOptions::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct ConnectorOptionsBuilder {
    /// Remote host name or address.
    host: Option<String>,
    /// Remote port.
    port: Option<u16>,
    /// Retries after the first failed attempt; negative is unbounded.
    max_retry: i32,
    /// Pause between connect attempts.
    retry_delay: Duration,
    /// Minimum interval between transmissions.
    cd_time: Duration,
    /// Reconnect after an unrequested transport loss.
    allow_reconnect: bool,
}

impl Default for ConnectorOptionsBuilder {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            max_retry: UNLIMITED_RETRY,
            retry_delay: DEFAULT_RETRY_DELAY,
            cd_time: DEFAULT_CD_TIME,
            allow_reconnect: false,
        }
    }
}

// ============================================================================
// ConnectorOptionsBuilder Implementation
// ============================================================================

impl ConnectorOptionsBuilder {
    /// Creates a builder with default retry and cooldown settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the remote host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the remote port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the retry budget.
    ///
    /// # Arguments
    ///
    /// * `max_retry` - Retries after the first attempt; negative retries forever
    #[inline]
    #[must_use]
    pub fn max_retry(mut self, max_retry: i32) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Sets the pause between connect attempts.
    #[inline]
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the pause between connect attempts in seconds.
    ///
    /// Negative values are clamped to zero.
    #[inline]
    #[must_use]
    pub fn retry_delay_secs(self, secs: f64) -> Self {
        self.retry_delay(secs_to_duration(secs))
    }

    /// Sets the minimum interval between transmissions.
    #[inline]
    #[must_use]
    pub fn cd_time(mut self, cd_time: Duration) -> Self {
        self.cd_time = cd_time;
        self
    }

    /// Sets the minimum interval between transmissions in seconds.
    ///
    /// Negative values are clamped to zero.
    #[inline]
    #[must_use]
    pub fn cd_time_secs(self, secs: f64) -> Self {
        self.cd_time(secs_to_duration(secs))
    }

    /// Enables or disables automatic reconnect.
    #[inline]
    #[must_use]
    pub fn allow_reconnect(mut self, allow: bool) -> Self {
        self.allow_reconnect = allow;
        self
    }

    /// Builds the options with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if host or port is missing or invalid
    /// - [`Error::Url`] if host and port do not form a valid endpoint
    pub fn build(self) -> Result<ConnectorOptions> {
        let host = self.validate_host()?;
        let port = self.validate_port()?;
        let url = Self::endpoint(&host, port)?;

        Ok(ConnectorOptions {
            connect_host: host,
            connect_port: port,
            url,
            retry: RetryPolicy::new(self.max_retry, self.retry_delay),
            cd_time: self.cd_time,
            allow_reconnect: self.allow_reconnect,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ConnectorOptionsBuilder {
    fn validate_host(&self) -> Result<String> {
        let host = self.host.as_deref().map(str::trim).unwrap_or_default();
        if host.is_empty() {
            return Err(Error::config(
                "Connect host is required. Use .host() to set it.\n\
                 Example: ConnectorOptions::builder().host(\"127.0.0.1\")",
            ));
        }
        Ok(host.to_owned())
    }

    fn validate_port(&self) -> Result<u16> {
        match self.port {
            None => Err(Error::config(
                "Connect port is required. Use .port() to set it.\n\
                 Example: ConnectorOptions::builder().port(6700)",
            )),
            Some(0) => Err(Error::config("Connect port must be non-zero")),
            Some(port) => Ok(port),
        }
    }

    fn endpoint(host: &str, port: u16) -> Result<Url> {
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_owned()
        };

        Ok(Url::parse(&format!("ws://{host}:{port}"))?)
    }
}

/// Converts fractional seconds, clamping negatives and NaN to zero.
fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

// ============================================================================
// Tests
// ============================================================================
