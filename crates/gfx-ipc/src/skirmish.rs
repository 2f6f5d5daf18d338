//! Skirmish: the cross-process exclusive lock primitive.
//!
//! In the real fabric a skirmish is a lock that also works across process
//! boundaries (backed by a futex in shared memory). This workspace runs
//! everything in one process, so `Skirmish` is a thin, explicitly-named
//! wrapper over [`std::sync::Mutex`] — kept as its own type so call sites
//! read the way the spec describes them ("held during allocate/lock/unlock")
//! rather than as a generic mutex.

use std::sync::{Mutex, MutexGuard, TryLockError};

#[derive(Debug, Default)]
pub struct Skirmish {
    inner: Mutex<()>,
}

pub struct SkirmishGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl Skirmish {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> SkirmishGuard<'_> {
        let guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        SkirmishGuard { _guard: guard }
    }

    /// Non-blocking acquire. `None` means the skirmish is contended.
    pub fn try_lock(&self) -> Option<SkirmishGuard<'_>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(SkirmishGuard { _guard: guard }),
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(p)) => Some(SkirmishGuard { _guard: p.into_inner() }),
        }
    }
}
