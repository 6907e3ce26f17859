//! Concurrency primitives.
//!
//! Building blocks used by the connector and reusable by bot code.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `guards` | Exclusive, cooldown, bounded and deadline call guards |
//! | `rw` | Readers-writer controller with optional reader bound |
//! | `schedule` | Deferred, timestamped and periodic callbacks |
//! | `twin` | Paired complementary signals |

// ============================================================================
// Submodules
// ============================================================================

/// Rate-limiting call guards.
pub mod guards;

/// Readers-writer controller.
pub mod rw;

/// Deferred and periodic scheduling.
pub mod schedule;

/// Paired complementary signals.
pub mod twin;

// ============================================================================
// Re-exports
// ============================================================================

pub use guards::{BoundedGuard, CooldownGuard, DeadlineGuard, ExclusiveGuard, fallback};
pub use rw::{ReadGuard, RwController, WriteGuard};
pub use schedule::{
    IntervalHandle, Scheduled, async_at, async_interval, async_later, call_at, call_later,
};
pub use twin::{TwinSignal, twin_signals};
