//! Dispatch collaborators.
//!
//! The receive loop spawns one task per decoded frame and never waits for it,
//! so dispatch completions may interleave across frames.

use async_trait::async_trait;

use super::frame::Frame;

/// Consumer of decoded frames.
///
/// A connector holds two of these: one for response frames and one for
/// everything else.
#[async_trait]
pub trait FrameDispatcher: Send + Sync {
    /// Handles one frame.
    async fn dispatch(&self, frame: Frame);
}
