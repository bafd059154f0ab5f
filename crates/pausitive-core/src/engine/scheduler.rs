use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Identifies one requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// Source of animation frames for the engine's tick loop.
///
/// The engine requests one frame at a time and cancels it on pause or stop.
/// Whoever owns the scheduler delivers due frames back to
/// [`BreathingEngine::tick`](super::BreathingEngine::tick).
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameId;
    fn cancel_frame(&mut self, frame: FrameId);
}

#[derive(Debug, Default)]
struct QueueInner {
    next_id: u64,
    pending: BTreeSet<FrameId>,
    cancelled: u64,
}

/// Queue of requested frames, drained by a driver loop.
///
/// Clones share the same queue, so a driver can hold one handle while the
/// engine owns another. Works with both a real-time loop and a simulated
/// clock; the queue itself has no notion of time.
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    inner: Rc<RefCell<QueueInner>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the oldest pending frame.
    pub fn next_frame(&self) -> Option<FrameId> {
        self.inner.borrow_mut().pending.pop_first()
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Number of frames cancelled before delivery.
    pub fn cancelled(&self) -> u64 {
        self.inner.borrow().cancelled
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameId {
        let mut inner = self.inner.borrow_mut();
        let id = FrameId(inner.next_id);
        inner.next_id += 1;
        inner.pending.insert(id);
        id
    }

    fn cancel_frame(&mut self, frame: FrameId) {
        let mut inner = self.inner.borrow_mut();
        if inner.pending.remove(&frame) {
            inner.cancelled += 1;
        }
    }
}
