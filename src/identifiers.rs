//! Identifiers for actions and the snowflake-style id generator.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ActionId`] | Process-unique handle of an outbound action (logging, tracing) |
//! | [`IdWorker`] | Time-ordered 64-bit id generator used for response correlation |
//!
//! # Id Layout
//!
//! ```text
//! ┌──────────────────────────────┬────────────┬────────┬──────────┐
//! │ ms since epoch (remaining)   │ datacenter │ worker │ sequence │
//! │                              │   5 bits   │ 3 bits │  12 bits │
//! └──────────────────────────────┴────────────┴────────┴──────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Bits reserved for the per-millisecond sequence.
const SEQUENCE_BITS: u32 = 12;

/// Bits reserved for the worker id.
const WORKER_ID_BITS: u32 = 3;

/// Bits reserved for the datacenter id.
const DATACENTER_ID_BITS: u32 = 5;

/// Largest accepted worker id.
pub const MAX_WORKER_ID: u64 = (1 << WORKER_ID_BITS) - 1;

/// Largest accepted datacenter id.
pub const MAX_DATACENTER_ID: u64 = (1 << DATACENTER_ID_BITS) - 1;

const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;
const DATACENTER_ID_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Custom epoch (2003-10-01T04:00:00Z) in unix milliseconds.
pub const ID_EPOCH_MS: u64 = 1_064_980_800_000;

// ============================================================================
// ActionId
// ============================================================================

/// Process-unique identifier of an outbound action.
///
/// Only used to correlate log lines; never sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u64);

static NEXT_ACTION_ID: AtomicU64 = AtomicU64::new(1);

impl ActionId {
    /// Allocates the next action id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_ACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action-{}", self.0)
    }
}

// ============================================================================
// IdWorker
// ============================================================================

/// Millisecond clock used by [`IdWorker`].
type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

/// Snowflake-style id generator.
///
/// Ids from one worker are strictly increasing. A clock that moves backwards
/// is reported as [`Error::ClockRollback`]; when the 4096 sequence values of a
/// millisecond are used up the worker spins until the clock advances.
pub struct IdWorker {
    datacenter_id: u64,
    worker_id: u64,
    sequence: u64,
    last_timestamp: Option<u64>,
    clock: Clock,
}

impl IdWorker {
    /// Creates a worker reading the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an id is out of range.
    pub fn new(datacenter_id: u64, worker_id: u64) -> Result<Self> {
        Self::with_clock(datacenter_id, worker_id, system_millis)
    }

    /// Creates a worker reading milliseconds from `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an id is out of range.
    pub fn with_clock(
        datacenter_id: u64,
        worker_id: u64,
        clock: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Result<Self> {
        if worker_id > MAX_WORKER_ID {
            return Err(Error::invalid_argument(format!(
                "worker_id {worker_id} out of range 0..={MAX_WORKER_ID}"
            )));
        }
        if datacenter_id > MAX_DATACENTER_ID {
            return Err(Error::invalid_argument(format!(
                "datacenter_id {datacenter_id} out of range 0..={MAX_DATACENTER_ID}"
            )));
        }

        Ok(Self {
            datacenter_id,
            worker_id,
            sequence: 0,
            last_timestamp: None,
            clock: Box::new(clock),
        })
    }

    /// Generates the next id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockRollback`] if the clock reads earlier than the
    /// previous id's timestamp.
    pub fn next_id(&mut self) -> Result<u64> {
        let mut timestamp = (self.clock)();

        match self.last_timestamp {
            Some(last) if timestamp < last => {
                return Err(Error::clock_rollback(last, timestamp));
            }
            Some(last) if timestamp == last => {
                self.sequence = (self.sequence + 1) & SEQUENCE_MASK;
                if self.sequence == 0 {
                    timestamp = self.wait_next_millis(last);
                }
            }
            _ => self.sequence = 0,
        }

        self.last_timestamp = Some(timestamp);

        Ok((timestamp.saturating_sub(ID_EPOCH_MS) << TIMESTAMP_SHIFT)
            | (self.datacenter_id << DATACENTER_ID_SHIFT)
            | (self.worker_id << WORKER_ID_SHIFT)
            | self.sequence)
    }

    /// Spins until the clock passes `last`.
    fn wait_next_millis(&self, last: u64) -> u64 {
        let mut timestamp = (self.clock)();
        while timestamp <= last {
            std::hint::spin_loop();
            timestamp = (self.clock)();
        }
        timestamp
    }

    /// Extracts the unix millisecond timestamp encoded in `id`.
    #[inline]
    #[must_use]
    pub const fn timestamp_of(id: u64) -> u64 {
        (id >> TIMESTAMP_SHIFT) + ID_EPOCH_MS
    }

    /// Extracts the sequence number encoded in `id`.
    #[inline]
    #[must_use]
    pub const fn sequence_of(id: u64) -> u64 {
        id & SEQUENCE_MASK
    }
}

impl fmt::Debug for IdWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdWorker")
            .field("datacenter_id", &self.datacenter_id)
            .field("worker_id", &self.worker_id)
            .field("sequence", &self.sequence)
            .field("last_timestamp", &self.last_timestamp)
            .finish_non_exhaustive()
    }
}

fn system_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

// ============================================================================
// Process-wide Worker
// ============================================================================

static GLOBAL_WORKER: LazyLock<Mutex<IdWorker>> = LazyLock::new(|| {
    Mutex::new(IdWorker {
        datacenter_id: 1,
        worker_id: 1,
        sequence: 0,
        last_timestamp: None,
        clock: Box::new(system_millis),
    })
});

/// Generates an id from the process-wide worker (datacenter 1, worker 1).
///
/// # Errors
///
/// Returns [`Error::ClockRollback`] if the system clock moved backwards.
pub fn next_id() -> Result<u64> {
    GLOBAL_WORKER.lock().next_id()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    const BASE_MS: u64 = ID_EPOCH_MS + 1_000_000;

    #[test]
    fn test_action_ids_are_unique() {
        let a = ActionId::next();
        let b = ActionId::next();
        assert_ne!(a, b);
        assert!(b > a);
        assert!(a.to_string().starts_with("action-"));
    }

    #[test]
    fn test_rejects_out_of_range_ids() {
        assert!(IdWorker::new(MAX_DATACENTER_ID + 1, 0).is_err());
        assert!(IdWorker::new(0, MAX_WORKER_ID + 1).is_err());
        assert!(IdWorker::new(MAX_DATACENTER_ID, MAX_WORKER_ID).is_ok());
    }

    #[test]
    fn test_sequential_ids_strictly_increase() {
        let mut worker = IdWorker::new(1, 1).unwrap();
        let mut previous = worker.next_id().unwrap();

        for _ in 0..5000 {
            let id = worker.next_id().unwrap();
            assert!(id > previous, "{id} should be greater than {previous}");
            previous = id;
        }
    }

    #[test]
    fn test_layout_encodes_worker_fields() {
        let mut worker = IdWorker::with_clock(3, 5, || BASE_MS).unwrap();
        let id = worker.next_id().unwrap();

        assert_eq!(IdWorker::timestamp_of(id), BASE_MS);
        assert_eq!(IdWorker::sequence_of(id), 0);
        assert_eq!((id >> DATACENTER_ID_SHIFT) & MAX_DATACENTER_ID, 3);
        assert_eq!((id >> WORKER_ID_SHIFT) & MAX_WORKER_ID, 5);
    }

    #[test]
    fn test_sequence_exhaustion_advances_millisecond() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        // One full millisecond of sequence values, plus the call that wraps.
        let frozen_calls = SEQUENCE_MASK + 2;
        let mut worker = IdWorker::with_clock(1, 1, move || {
            if counter.fetch_add(1, Ordering::SeqCst) < frozen_calls {
                BASE_MS
            } else {
                BASE_MS + 1
            }
        })
        .unwrap();

        let batch: Vec<u64> = (0..=SEQUENCE_MASK)
            .map(|_| worker.next_id().unwrap())
            .collect();
        assert!(batch.iter().all(|id| IdWorker::timestamp_of(*id) == BASE_MS));
        assert_eq!(IdWorker::sequence_of(*batch.last().unwrap()), SEQUENCE_MASK);

        let next = worker.next_id().unwrap();
        assert!(IdWorker::timestamp_of(next) > BASE_MS);
        assert_eq!(IdWorker::sequence_of(next), 0);
        assert!(next > *batch.last().unwrap());
    }

    #[test]
    fn test_clock_rollback_fails_immediately() {
        let now = Arc::new(AtomicU64::new(BASE_MS));
        let clock = Arc::clone(&now);
        let mut worker =
            IdWorker::with_clock(1, 1, move || clock.load(Ordering::SeqCst)).unwrap();

        worker.next_id().unwrap();
        now.store(BASE_MS - 5, Ordering::SeqCst);

        let err = worker.next_id().unwrap_err();
        assert!(matches!(
            err,
            Error::ClockRollback {
                last_ms: BASE_MS,
                now_ms
            } if now_ms == BASE_MS - 5
        ));

        // The failed call leaves the worker usable once the clock recovers.
        now.store(BASE_MS + 1, Ordering::SeqCst);
        assert!(worker.next_id().is_ok());
    }

    #[test]
    fn test_global_next_id() {
        let a = next_id().unwrap();
        let b = next_id().unwrap();
        assert!(b > a);
    }
}
