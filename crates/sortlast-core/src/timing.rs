//! Timing marker hooks (§5, §6).
//!
//! The five paired begin/end markers (`compress`, `blend`, `render`,
//! `buffer_read`, `interlace`) are observational only. §5 requires they be
//! "balanced on every control-flow path, including error exits" — in
//! idiomatic Rust that's a job for RAII,
//! not for remembering to call `_end()` before every `return`/`?`, so
//! [`TimingScope`] calls `end` from its `Drop` impl rather than requiring a
//! matching call at every exit point.

use std::sync::Arc;

/// Which timed section a [`TimingScope`] brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingMarker {
    /// Sparse encode (§4.3).
    Compress,
    /// Compositing blend operators (§4.6).
    Blend,
    /// The draw callback (§6).
    Render,
    /// Reading back a rendered buffer (§4.7).
    BufferRead,
    /// Split/interlace transforms (§4.5).
    Interlace,
}

/// Receives begin/end notifications for a [`TimingMarker`].
pub trait TimingHooks: Send + Sync {
    /// Called when a timed section starts.
    fn begin(&self, marker: TimingMarker);
    /// Called when a timed section ends, including on early/error exits.
    fn end(&self, marker: TimingMarker);
}

/// A [`TimingHooks`] that does nothing; the default when no timing
/// collaborator is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTimingHooks;

impl TimingHooks for NoopTimingHooks {
    fn begin(&self, _marker: TimingMarker) {}
    fn end(&self, _marker: TimingMarker) {}
}

/// RAII guard that calls [`TimingHooks::begin`] on construction and
/// [`TimingHooks::end`] on drop, keeping the pair balanced across early
/// returns, `?`, and panics.
pub struct TimingScope {
    hooks: Arc<dyn TimingHooks>,
    marker: TimingMarker,
}

impl TimingScope {
    /// Begins timing `marker` and returns a guard that ends it on drop.
    pub fn start(hooks: Arc<dyn TimingHooks>, marker: TimingMarker) -> Self {
        hooks.begin(marker);
        Self { hooks, marker }
    }
}

impl Drop for TimingScope {
    fn drop(&mut self) {
        self.hooks.end(self.marker);
    }
}
