//! Async readers-writer controller.
//!
//! Readers share the controller (optionally up to `read_limit` at a time);
//! a writer excludes everyone. The first reader in takes the write slot on
//! behalf of all readers and the last reader out gives it back.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedSemaphorePermit, Semaphore};

// ============================================================================
// RwController
// ============================================================================

/// Readers held by the controller and the write slot they share.
#[derive(Default)]
struct Readers {
    active: usize,
    write_slot: Option<OwnedSemaphorePermit>,
}

/// Readers-writer controller with an optional reader bound.
pub struct RwController {
    read_slots: Option<Arc<Semaphore>>,
    write_slot: Arc<Semaphore>,
    /// Serializes reader entry so only one reader waits for the write slot.
    entry: AsyncMutex<()>,
    readers: Mutex<Readers>,
}

impl RwController {
    /// Creates a controller without a reader bound.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a controller admitting at most `read_limit` concurrent readers.
    ///
    /// A limit of zero means unbounded.
    #[must_use]
    pub fn with_read_limit(read_limit: usize) -> Self {
        Self::build((read_limit > 0).then_some(read_limit))
    }

    fn build(read_limit: Option<usize>) -> Self {
        Self {
            read_slots: read_limit.map(|limit| Arc::new(Semaphore::new(limit))),
            write_slot: Arc::new(Semaphore::new(1)),
            entry: AsyncMutex::new(()),
            readers: Mutex::new(Readers::default()),
        }
    }

    /// Enters as a reader.
    pub async fn read(&self) -> ReadGuard<'_> {
        let read_slot = match &self.read_slots {
            Some(slots) => Some(
                Arc::clone(slots)
                    .acquire_owned()
                    .await
                    .expect("read semaphore is never closed"),
            ),
            None => None,
        };

        let _entry = self.entry.lock().await;
        let first = {
            let mut readers = self.readers.lock();
            if readers.active > 0 {
                readers.active += 1;
                false
            } else {
                true
            }
        };

        if first {
            // Nobody else can enter while we hold `entry`, and with no active
            // readers nobody can leave either.
            let write_slot = Arc::clone(&self.write_slot)
                .acquire_owned()
                .await
                .expect("write semaphore is never closed");
            let mut readers = self.readers.lock();
            readers.write_slot = Some(write_slot);
            readers.active = 1;
        }

        ReadGuard {
            controller: self,
            _read_slot: read_slot,
        }
    }

    /// Enters as the exclusive writer.
    pub async fn write(&self) -> WriteGuard {
        let permit = Arc::clone(&self.write_slot)
            .acquire_owned()
            .await
            .expect("write semaphore is never closed");
        WriteGuard { _permit: permit }
    }

    /// Returns the number of readers inside.
    #[must_use]
    pub fn active_readers(&self) -> usize {
        self.readers.lock().active
    }

    fn leave_reader(&self) {
        let mut readers = self.readers.lock();
        readers.active -= 1;
        if readers.active == 0 {
            readers.write_slot = None;
        }
    }
}

impl Default for RwController {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Guards
// ============================================================================

/// Shared access; released on drop.
pub struct ReadGuard<'a> {
    controller: &'a RwController,
    _read_slot: Option<OwnedSemaphorePermit>,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.controller.leave_reader();
    }
}

/// Exclusive access; released on drop.
pub struct WriteGuard {
    _permit: OwnedSemaphorePermit,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::time::timeout;

    const BLOCKED: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_readers_share() {
        let rw = RwController::new();
        let a = rw.read().await;
        let b = rw.read().await;
        let c = rw.read().await;
        assert_eq!(rw.active_readers(), 3);
        drop((a, b, c));
        assert_eq!(rw.active_readers(), 0);
    }

    #[tokio::test]
    async fn test_read_limit_blocks_third_reader() {
        let rw = RwController::with_read_limit(2);
        let first = rw.read().await;
        let _second = rw.read().await;

        assert!(timeout(BLOCKED, rw.read()).await.is_err());

        drop(first);
        let third = timeout(BLOCKED, rw.read()).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_writer_waits_for_all_readers() {
        let rw = RwController::new();
        let a = rw.read().await;
        let b = rw.read().await;

        assert!(timeout(BLOCKED, rw.write()).await.is_err());
        drop(a);
        assert!(timeout(BLOCKED, rw.write()).await.is_err());
        drop(b);
        assert!(timeout(BLOCKED, rw.write()).await.is_ok());
    }

    #[tokio::test]
    async fn test_writer_blocks_readers_and_writers() {
        let rw = RwController::new();
        let writer = rw.write().await;

        assert!(timeout(BLOCKED, rw.read()).await.is_err());
        assert!(timeout(BLOCKED, rw.write()).await.is_err());
        assert_eq!(rw.active_readers(), 0);

        drop(writer);
        let reader = timeout(BLOCKED, rw.read()).await;
        assert!(reader.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_reader_leaves_no_trace() {
        let rw = RwController::new();
        let writer = rw.write().await;
        assert!(timeout(BLOCKED, rw.read()).await.is_err());
        drop(writer);

        // The abandoned reader must not have kept the write slot.
        assert!(timeout(BLOCKED, rw.write()).await.is_ok());
    }

    #[test]
    fn test_zero_limit_is_unbounded() {
        let rw = RwController::with_read_limit(0);
        assert!(rw.read_slots.is_none());
    }
}
