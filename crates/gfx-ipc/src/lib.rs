//! In-process stand-in for the cross-process IPC fabric (spec component C2).
//!
//! The real system mediates shared memory, skirmish locks, observer
//! ("reaction") registries, and dispatcher batch cleanups across
//! cooperating processes. This crate models the same vocabulary for a
//! single process: every type here is the collaborator interface the rest
//! of the workspace programs against, never a full re-implementation of a
//! cross-process transport.

pub mod dispatch_cleanup;
pub mod error;
pub mod object_id;
pub mod reactor;
pub mod shared_heap;
pub mod skirmish;

pub use dispatch_cleanup::DispatchCleanupQueue;
pub use error::IpcError;
pub use object_id::{IdTable, ObjectId};
pub use reactor::{ReactionResult, Reactor};
pub use shared_heap::SharedHeap;
pub use skirmish::{Skirmish, SkirmishGuard};
