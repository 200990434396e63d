//! Frame scheduling for the playback clock.
//!
//! The engine asks its scheduler for one frame at a time and only runs a
//! frame whose handle matches the one it is waiting on. Cancelling is
//! synchronous: once `stop()` has cancelled the pending handle, a host that
//! still delivers it finds the engine ignoring it.
use std::collections::VecDeque;

/// Opaque identifier for one requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

/// Host-side source of animation frames.
pub trait FrameScheduler {
    /// Request a single callback on the next frame.
    fn request_frame(&mut self) -> FrameHandle;

    /// Cancel a previously requested frame. Unknown handles are ignored.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Queue-backed scheduler for headless playback and tests.
///
/// Requested frames accumulate in order; the driver pops them with
/// [`ManualScheduler::next_due`] and hands them to the engine together with
/// a synthetic timestamp.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    queued: VecDeque<FrameHandle>,
    cancelled: usize,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest outstanding frame request.
    pub fn next_due(&mut self) -> Option<FrameHandle> {
        self.queued.pop_front()
    }

    /// Frames requested and neither delivered nor cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queued.len()
    }

    /// Total number of frames cancelled over the scheduler's lifetime.
    #[must_use]
    pub const fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.queued.push_back(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let before = self.queued.len();
        self.queued.retain(|queued| *queued != handle);
        self.cancelled += before - self.queued.len();
    }
}
