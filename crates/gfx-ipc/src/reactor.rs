//! Reaction (observer) registry.
//!
//! A reaction is a callback registered against a stream of events of type
//! `E`. The callback may return [`ReactionResult::Remove`] to unregister
//! itself; callers can also unregister explicitly via the [`ObjectId`]
//! returned by [`Reactor::attach`]. Dispatch snapshots the observer list
//! under a read lock before invoking any callback, so a callback that
//! attaches or detaches another observer (or itself, via a deferred detach)
//! cannot deadlock or corrupt iteration.

use std::sync::{Arc, RwLock};

use crate::object_id::{IdTable, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionResult {
    Continue,
    Remove,
}

type Callback<E> = dyn Fn(&E) -> ReactionResult + Send + Sync;

pub struct Reactor<E> {
    observers: RwLock<IdTable<Arc<Callback<E>>>>,
}

impl<E> Default for Reactor<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Reactor<E> {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(IdTable::new()),
        }
    }

    pub fn attach<F>(&self, callback: F) -> ObjectId
    where
        F: Fn(&E) -> ReactionResult + Send + Sync + 'static,
    {
        let mut observers = self.observers.write().expect("reactor lock poisoned");
        observers.insert(Arc::new(callback))
    }

    pub fn detach(&self, id: ObjectId) {
        let mut observers = self.observers.write().expect("reactor lock poisoned");
        observers.remove(id);
    }

    pub fn len(&self) -> usize {
        self.observers.read().expect("reactor lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every attached observer with `event`, then removes any that
    /// returned [`ReactionResult::Remove`].
    pub fn dispatch(&self, event: &E) {
        let snapshot: Vec<(ObjectId, Arc<Callback<E>>)> = {
            let observers = self.observers.read().expect("reactor lock poisoned");
            observers.iter().map(|(id, cb)| (id, cb.clone())).collect()
        };

        let mut to_remove = Vec::new();
        for (id, callback) in snapshot {
            if callback(event) == ReactionResult::Remove {
                to_remove.push(id);
            }
        }

        if !to_remove.is_empty() {
            let mut observers = self.observers.write().expect("reactor lock poisoned");
            for id in to_remove {
                observers.remove(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn remove_result_unregisters_observer() {
        let reactor: Reactor<u32> = Reactor::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        reactor.attach(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            ReactionResult::Remove
        });

        reactor.dispatch(&1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(reactor.is_empty());

        reactor.dispatch(&2);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "removed observer must not fire again");
    }

    #[test]
    fn attach_during_dispatch_does_not_deadlock() {
        let reactor: Arc<Reactor<u32>> = Arc::new(Reactor::new());
        let inner = reactor.clone();
        reactor.attach(move |_| {
            // Observer attaches another observer mid-dispatch; must not deadlock
            // since dispatch operates on a snapshot taken under a read lock.
            inner.attach(|_| ReactionResult::Continue);
            ReactionResult::Continue
        });
        reactor.dispatch(&1);
        assert_eq!(reactor.len(), 2);
    }
}
