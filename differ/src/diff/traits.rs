use videodiff_common::frame::Frame;

/// Comparison between a frame and its predecessor.
///
/// Implementations are pure: both inputs are left untouched and a fresh
/// result frame of the same shape is returned.
pub trait FrameDiff: Send + Sync {
    /// Compute the result for `current` against `previous` (same shape).
    fn apply(&self, current: &Frame, previous: &Frame) -> Frame;

    /// The frame kept as `previous` for the next comparison.
    fn carry_forward(&self, current: Frame) -> Frame {
        current
    }

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
