//! Paired complementary signals.
//!
//! Two awaitable flags bound together so that exactly one of them is set at
//! any time. Setting one clears its partner and clearing one sets it.
//!
//! ```ignore
//! let (running, idle) = twin_signals();
//! assert!(idle.is_set());
//!
//! running.set();
//! assert!(!idle.is_set());
//! idle.wait().await; // suspends until `running` is cleared
//! ```

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::watch;

// ============================================================================
// TwinSignal
// ============================================================================

/// Which side of a pair a [`TwinSignal`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// One half of a complementary pair.
///
/// Both halves share a single cell holding "left is set", so the pair can
/// never be observed in an inconsistent state.
#[derive(Debug, Clone)]
pub struct TwinSignal {
    left_set: watch::Sender<bool>,
    side: Side,
}

/// Creates a bound pair: the first signal starts clear, the second set.
#[must_use]
pub fn twin_signals() -> (TwinSignal, TwinSignal) {
    let (left_set, _) = watch::channel(false);
    let left = TwinSignal {
        left_set: left_set.clone(),
        side: Side::Left,
    };
    let right = TwinSignal {
        left_set,
        side: Side::Right,
    };
    (left, right)
}

impl TwinSignal {
    /// Returns `true` if this signal is set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.holds(*self.left_set.borrow())
    }

    /// Sets this signal and clears its partner.
    pub fn set(&self) {
        self.left_set.send_replace(self.side == Side::Left);
    }

    /// Clears this signal and sets its partner.
    pub fn clear(&self) {
        self.left_set.send_replace(self.side == Side::Right);
    }

    /// Waits until this signal is set.
    ///
    /// Returns immediately if it already is.
    pub async fn wait(&self) {
        let mut rx = self.left_set.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|left_set| self.holds(*left_set)).await;
    }

    fn holds(&self, left_set: bool) -> bool {
        match self.side {
            Side::Left => left_set,
            Side::Right => !left_set,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
