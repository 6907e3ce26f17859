//! Deferred and periodic scheduling.
//!
//! Thin helpers over `tokio::spawn` that return handles for cancelling or
//! awaiting the scheduled work.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::Result;

// ============================================================================
// Scheduled
// ============================================================================

/// Handle to a one-shot scheduled callback.
#[derive(Debug)]
pub struct Scheduled<T> {
    handle: JoinHandle<T>,
}

impl<T> Scheduled<T> {
    /// Cancels the callback if it has not run yet.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Returns `true` once the callback ran or was cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the callback's output.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Cancelled`] if the callback was cancelled
    /// - [`crate::Error::TaskFailed`] if it panicked
    pub async fn join(self) -> Result<T> {
        Ok(self.handle.await?)
    }
}

/// Delay until `at`, zero if `at` is not in the future.
fn delay_until(at: SystemTime) -> Duration {
    at.duration_since(SystemTime::now())
        .unwrap_or(Duration::ZERO)
}

/// Runs `callback` after `delay`.
pub fn call_later<F>(delay: Duration, callback: F) -> Scheduled<()>
where
    F: FnOnce() + Send + 'static,
{
    Scheduled {
        handle: tokio::spawn(async move {
            time::sleep(delay).await;
            callback();
        }),
    }
}

/// Runs `callback` at wall-clock time `at`; immediately if `at` has passed.
pub fn call_at<F>(at: SystemTime, callback: F) -> Scheduled<()>
where
    F: FnOnce() + Send + 'static,
{
    call_later(delay_until(at), callback)
}

/// Awaits `future` after `delay` and yields its output through the handle.
pub fn async_later<Fut>(delay: Duration, future: Fut) -> Scheduled<Fut::Output>
where
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    Scheduled {
        handle: tokio::spawn(async move {
            time::sleep(delay).await;
            future.await
        }),
    }
}

/// Awaits `future` at wall-clock time `at`; immediately if `at` has passed.
pub fn async_at<Fut>(at: SystemTime, future: Fut) -> Scheduled<Fut::Output>
where
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    async_later(delay_until(at), future)
}

// ============================================================================
// Interval
// ============================================================================

/// Handle to a periodic callback.
///
/// Dropping the handle does not stop the callback; call [`Self::cancel`].
#[derive(Debug)]
pub struct IntervalHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl IntervalHandle {
    /// Stops future firings and cancels a firing in progress.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` if [`Self::cancel`] was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the periodic task to wind down after cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TaskFailed`] if a firing panicked.
    pub async fn join(self) -> Result<()> {
        Ok(self.handle.await?)
    }
}

/// Runs `callback` every `period`, first one period from now.
///
/// A firing that overruns the period delays the next one instead of
/// producing a burst.
pub fn async_interval<F, Fut>(period: Duration, mut callback: F) -> IntervalHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let token = CancellationToken::new();
    let cancelled = token.clone();

    let handle = tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => break,
                () = callback() => {}
            }
        }

        trace!("Interval task stopped");
    });

    IntervalHandle { token, handle }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;
    use tokio::time::Instant;

    use crate::error::Error;

    #[tokio::test(start_paused = true)]
    async fn test_call_later_fires_after_delay() {
        let (tx, rx) = oneshot::channel();
        let start = Instant::now();
        call_later(Duration::from_millis(250), move || {
            let _ = tx.send(Instant::now());
        });

        let fired_at = rx.await.unwrap();
        assert!(fired_at - start >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_call_at_past_fires_immediately() {
        let (tx, rx) = oneshot::channel();
        let past = SystemTime::now() - Duration::from_secs(60);
        call_at(past, move || {
            let _ = tx.send(());
        });

        tokio::time::timeout(Duration::from_millis(100), rx)
            .await
            .expect("past timestamp should fire at once")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_callback_never_runs() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let scheduled = call_later(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        scheduled.cancel();
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(matches!(scheduled.join().await, Err(Error::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_later_returns_output() {
        let scheduled = async_later(Duration::from_millis(100), async { 21 * 2 });
        assert_eq!(scheduled.join().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_async_at_future_timestamp() {
        let at = SystemTime::now() + Duration::from_millis(30);
        let start = std::time::Instant::now();
        let scheduled = async_at(at, async { "done" });
        assert_eq!(scheduled.join().await.unwrap(), "done");
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_fires_until_cancelled() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let handle = async_interval(Duration::from_millis(100), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);

        handle.cancel();
        assert!(handle.is_cancelled());
        handle.join().await.unwrap();

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }
}
