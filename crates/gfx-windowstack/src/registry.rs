//! Process-wide stack registry and layer-context refcounting (spec §4.4
//! "Created per display layer... stores a weak registry in a process-wide
//! list", and "Layer context reference counting around dispatch").

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

use crate::stack::WindowStack;

/// Refcounted handle to the layer a stack is attached to. The WM can
/// outlive the layer across a reaction callback chain, so every reaction
/// entry/exit pairs an increment/decrement against this count rather than
/// assuming the layer stays alive for the callback's duration.
#[derive(Debug, Default)]
pub struct LayerContext {
    refcount: AtomicI64,
}

impl LayerContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { refcount: AtomicI64::new(1) })
    }

    /// Increments the refcount and returns `true`, unless the context was
    /// already torn down (count at zero), in which case it returns `false`
    /// and the caller must treat this as "observer should remove itself".
    pub fn enter(&self) -> bool {
        if self.refcount.load(Ordering::SeqCst) == 0 {
            return false;
        }
        self.refcount.fetch_add(1, Ordering::SeqCst);
        true
    }

    pub fn exit(&self) {
        self.refcount.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn refcount(&self) -> i64 {
        self.refcount.load(Ordering::SeqCst)
    }

    /// Forces the context to the torn-down state; future `enter()` calls
    /// fail so in-flight reaction chains unregister themselves.
    pub fn mark_destroyed(&self) {
        self.refcount.store(0, Ordering::SeqCst);
    }
}

/// Weak, process-wide list of every live stack, so a newly enumerated
/// input device can be attached to all of them (spec §4.4 "Attach/detach
/// devices"). A real cross-process registry would be guarded by a
/// recursive skirmish; within one process a plain mutex over the list is
/// equivalent since no reaction here re-enters the registry itself.
#[derive(Default)]
pub struct StackRegistry {
    stacks: Mutex<Vec<Weak<Mutex<WindowStack>>>>,
}

impl StackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, stack: &Arc<Mutex<WindowStack>>) {
        self.stacks.lock().expect("stack registry poisoned").push(Arc::downgrade(stack));
    }

    /// Drops entries whose stack has already been dropped, returning the
    /// count of stacks still alive.
    pub fn live_count(&self) -> usize {
        let mut stacks = self.stacks.lock().expect("stack registry poisoned");
        stacks.retain(|weak| weak.strong_count() > 0);
        stacks.len()
    }

    /// Broadcasts a newly enumerated input device to every live stack.
    pub fn notify_device_attached(&self, device_id: u32) {
        let mut stacks = self.stacks.lock().expect("stack registry poisoned");
        stacks.retain(|weak| match weak.upgrade() {
            Some(stack) => {
                stack.lock().expect("window stack poisoned").attach_device(device_id);
                true
            }
            None => false,
        });
        debug!(device_id, "device attach broadcast to stack registry");
    }

    /// Broadcasts a device removal to every live stack.
    pub fn notify_device_detached(&self, device_id: u32) {
        let mut stacks = self.stacks.lock().expect("stack registry poisoned");
        stacks.retain(|weak| match weak.upgrade() {
            Some(stack) => {
                stack.lock().expect("window stack poisoned").detach_device(device_id);
                true
            }
            None => false,
        });
        debug!(device_id, "device detach broadcast to stack registry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_enter_fails_after_destroy() {
        let context = LayerContext::new();
        assert!(context.enter());
        assert_eq!(context.refcount(), 2);
        context.exit();
        context.exit();
        assert_eq!(context.refcount(), 0);
        context.mark_destroyed();
        assert!(!context.enter());
    }
}
