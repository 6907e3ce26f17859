//! Rate-limiting call guards.
//!
//! Each guard wraps an async operation and decides whether it may run now.
//! When it may not, a fallback runs instead and its output is returned to the
//! caller unchanged, errors included.
//!
//! | Guard | Contention rule |
//! |-------|-----------------|
//! | [`ExclusiveGuard`] | one run at a time, others fall back |
//! | [`CooldownGuard`] | one run at a time, and `interval` between completed runs |
//! | [`BoundedGuard`] | up to `limit` runs at a time |
//! | [`DeadlineGuard`] | run is cancelled after `timeout` and the fallback runs |

// ============================================================================
// Imports
// ============================================================================

use std::future::{self, Future, Ready};
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::{Instant, sleep, timeout};

// ============================================================================
// ExclusiveGuard
// ============================================================================

/// Runs at most one operation at a time; concurrent callers get the fallback.
#[derive(Debug, Default)]
pub struct ExclusiveGuard {
    lock: Mutex<()>,
}

impl ExclusiveGuard {
    /// Creates an idle guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while an operation runs.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Runs `op`, or `on_busy` if another operation is in progress.
    pub async fn run<T, Op, OpFut, Busy, BusyFut>(&self, op: Op, on_busy: Busy) -> T
    where
        Op: FnOnce() -> OpFut,
        OpFut: Future<Output = T>,
        Busy: FnOnce() -> BusyFut,
        BusyFut: Future<Output = T>,
    {
        let Ok(_running) = self.lock.try_lock() else {
            return on_busy().await;
        };
        op().await
    }
}

// ============================================================================
// CooldownGuard
// ============================================================================

/// Exclusive guard that also enforces `interval` between completed runs.
#[derive(Debug)]
pub struct CooldownGuard {
    interval: Duration,
    /// Completion time of the previous run; the lock marks a run in progress.
    last_finish: Mutex<Option<Instant>>,
}

impl CooldownGuard {
    /// Creates a guard whose first run is never delayed.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_finish: Mutex::new(None),
        }
    }

    /// Returns the configured interval.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs `op`, waiting out any remaining cooldown first.
    ///
    /// `on_busy` runs instead if another operation is in progress.
    pub async fn run<T, Op, OpFut, Busy, BusyFut>(&self, op: Op, on_busy: Busy) -> T
    where
        Op: FnOnce() -> OpFut,
        OpFut: Future<Output = T>,
        Busy: FnOnce() -> BusyFut,
        BusyFut: Future<Output = T>,
    {
        self.guarded(op, on_busy, None::<fn(Duration) -> Ready<T>>)
            .await
    }

    /// Runs `op`, or `on_cooldown(remaining)` if the cooldown has not elapsed.
    ///
    /// `on_busy` runs instead if another operation is in progress.
    pub async fn run_or<T, Op, OpFut, Busy, BusyFut, Cd, CdFut>(
        &self,
        op: Op,
        on_busy: Busy,
        on_cooldown: Cd,
    ) -> T
    where
        Op: FnOnce() -> OpFut,
        OpFut: Future<Output = T>,
        Busy: FnOnce() -> BusyFut,
        BusyFut: Future<Output = T>,
        Cd: FnOnce(Duration) -> CdFut,
        CdFut: Future<Output = T>,
    {
        self.guarded(op, on_busy, Some(on_cooldown)).await
    }

    async fn guarded<T, Op, OpFut, Busy, BusyFut, Cd, CdFut>(
        &self,
        op: Op,
        on_busy: Busy,
        on_cooldown: Option<Cd>,
    ) -> T
    where
        Op: FnOnce() -> OpFut,
        OpFut: Future<Output = T>,
        Busy: FnOnce() -> BusyFut,
        BusyFut: Future<Output = T>,
        Cd: FnOnce(Duration) -> CdFut,
        CdFut: Future<Output = T>,
    {
        let Ok(mut last_finish) = self.last_finish.try_lock() else {
            return on_busy().await;
        };

        let remaining = last_finish.map_or(Duration::ZERO, |at| {
            self.interval.saturating_sub(at.elapsed())
        });
        if !remaining.is_zero() {
            match on_cooldown {
                Some(on_cooldown) => return on_cooldown(remaining).await,
                None => sleep(remaining).await,
            }
        }

        let output = op().await;
        *last_finish = Some(Instant::now());
        output
    }
}

// ============================================================================
// BoundedGuard
// ============================================================================

/// Runs up to `limit` operations concurrently; extra callers get the fallback.
#[derive(Debug)]
pub struct BoundedGuard {
    permits: Semaphore,
}

impl BoundedGuard {
    /// Creates a guard admitting `limit` concurrent runs.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            permits: Semaphore::new(limit),
        }
    }

    /// Returns the number of free slots.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs `op`, or `on_busy` if every slot is taken.
    pub async fn run<T, Op, OpFut, Busy, BusyFut>(&self, op: Op, on_busy: Busy) -> T
    where
        Op: FnOnce() -> OpFut,
        OpFut: Future<Output = T>,
        Busy: FnOnce() -> BusyFut,
        BusyFut: Future<Output = T>,
    {
        let Ok(_slot) = self.permits.try_acquire() else {
            return on_busy().await;
        };
        op().await
    }
}

// ============================================================================
// DeadlineGuard
// ============================================================================

/// Cancels an operation that overruns its deadline and runs a fallback.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineGuard {
    timeout: Duration,
}

impl DeadlineGuard {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Runs `op` for at most the configured timeout.
    ///
    /// On expiry `op` is dropped (cancelled) and `on_timeout` runs.
    pub async fn run<T, OpFut, Late, LateFut>(&self, op: OpFut, on_timeout: Late) -> T
    where
        OpFut: Future<Output = T>,
        Late: FnOnce() -> LateFut,
        LateFut: Future<Output = T>,
    {
        match timeout(self.timeout, op).await {
            Ok(output) => output,
            Err(_) => on_timeout().await,
        }
    }
}

/// Fallback that resolves to `value`.
///
/// Handy for guards whose fallback needs no async work:
/// `guard.run(op, || fallback(None))`.
pub fn fallback<T>(value: T) -> Ready<T> {
    future::ready(value)
}

// ============================================================================
// Tests
// ============================================================================
