//! Dispatch-cleanup queue.
//!
//! The real IPC dispatcher runs a batch of calls and then, at the batch
//! boundary, drains a set of one-shot deferred callbacks registered during
//! that batch. Pointer-motion coalescing (see the window stack) relies on
//! this to guarantee bounded flush latency without a dedicated timer. We
//! model the dispatcher's batch boundary as an explicit `drain()` call made
//! by whatever drives the main loop.

use std::sync::Mutex;

type Cleanup = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct DispatchCleanupQueue {
    pending: Mutex<Vec<Cleanup>>,
}

impl DispatchCleanupQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a one-shot cleanup to run at the next `drain()`. Calling
    /// this more than once before a drain just grows the queue; callers that
    /// need "at most one pending flush" semantics (the window stack) track
    /// that themselves and only register when nothing is already pending.
    pub fn register(&self, cleanup: impl FnOnce() + Send + 'static) {
        self.pending.lock().expect("cleanup queue poisoned").push(Box::new(cleanup));
    }

    /// Runs and clears every pending cleanup, in registration order.
    pub fn drain(&self) {
        let cleanups: Vec<Cleanup> = std::mem::take(&mut *self.pending.lock().expect("cleanup queue poisoned"));
        for cleanup in cleanups {
            cleanup();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().expect("cleanup queue poisoned").is_empty()
    }
}
