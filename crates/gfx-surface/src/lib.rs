//! Surface allocation semantics and the pluggable surface pool engine
//! (spec components C3/C4): a typed buffer with N allocations across N
//! pools, ordered pool registration and negotiation, displacement with
//! backup, and lock/unlock.

pub mod domain;
pub mod error;
pub mod mem_pool;
pub mod pool;
pub mod surface;
pub mod types;

pub use domain::{NegotiationResult, NegotiationStatus, SurfaceDomain};
pub use error::{PoolError, PoolResult};
pub use pool::{BufferLock, PoolDescription, PoolFuncs, PoolInitContext, SurfacePool, TestConfigResult};
pub use surface::{Surface, SurfaceAllocation, SurfaceBuffer, SurfaceDescription};
pub use types::{
    AccessFlags, Accessor, AllocationFlags, BufferPolicy, ColorSpace, PixelFormat, PoolCapabilities, PoolPriority,
    SurfaceCaps, TypeFlags, POOL_NAME_MAX,
};
