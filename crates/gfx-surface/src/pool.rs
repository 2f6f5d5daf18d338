//! Pluggable pool ABI (spec §4.2) and the registered pool record.

use gfx_ipc::{ObjectId, Skirmish};
use gfx_primitives::Rectangle;

use crate::error::PoolResult;
use crate::surface::Surface;
use crate::types::{AccessFlags, Accessor, PoolCapabilities, PoolPriority, TypeFlags, POOL_NAME_MAX};

/// Populated by `PoolFuncs::init_pool`; mirrors the fixed-size description
/// record the reference pools fill in (spec §3 "SurfacePool", §4.2).
#[derive(Debug, Clone)]
pub struct PoolDescription {
    pub name: String,
    pub caps: PoolCapabilities,
    pub priority: PoolPriority,
    pub access: Vec<(Accessor, AccessFlags)>,
    pub types: TypeFlags,
}

impl PoolDescription {
    pub fn new(name: &str, priority: PoolPriority) -> Self {
        let mut truncated = name.to_string();
        truncated.truncate(POOL_NAME_MAX);
        Self {
            name: truncated,
            caps: PoolCapabilities::NONE,
            priority,
            access: Vec::new(),
            types: TypeFlags::NONE,
        }
    }

    pub fn with_access(mut self, accessor: Accessor, mask: AccessFlags) -> Self {
        self.access.push((accessor, mask));
        self
    }

    pub fn with_types(mut self, types: TypeFlags) -> Self {
        self.types |= types;
        self
    }

    pub fn access_mask(&self, accessor: Accessor) -> AccessFlags {
        self.access
            .iter()
            .find(|(a, _)| *a == accessor)
            .map(|(_, mask)| *mask)
            .unwrap_or(AccessFlags::NONE)
    }
}

/// Result of a buffer lock, as handed back to callers (spec §4.2 "Lock /
/// Unlock"): a virtual or physical address plus the pitch to stride by.
#[derive(Debug, Clone, Copy)]
pub struct BufferLock {
    pub allocation: ObjectId,
    pub buffer_index: usize,
    pub address: usize,
    pub pitch: usize,
}

/// Outcome of `TestConfig`: whether a pool can service a prospective
/// allocation without actually placing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestConfigResult {
    Ok,
    NoMemory,
    Unsupported,
}

/// The pool plugin ABI (spec §4.2). Every method is optional in the
/// original C vtable except `init_pool`; here the trait default-implements
/// everything else as unsupported so a minimal pool need only override
/// what it actually provides.
pub trait PoolFuncs: Send + Sync {
    fn init_pool(&self, ctx: &PoolInitContext) -> PoolResult<PoolDescription>;

    /// Whether this pool overrides `read`; the engine auto-sets
    /// `PoolCapabilities::READ` on the description when true (spec §4.2).
    fn supports_read(&self) -> bool {
        false
    }

    /// Whether this pool overrides `write`; the engine auto-sets
    /// `PoolCapabilities::WRITE` on the description when true.
    fn supports_write(&self) -> bool {
        false
    }

    fn join_pool(&self, _ctx: &PoolInitContext) -> PoolResult<()> {
        Ok(())
    }

    fn destroy_pool(&self) -> PoolResult<()> {
        Ok(())
    }

    fn leave_pool(&self) -> PoolResult<()> {
        Ok(())
    }

    fn test_config(&self, _surface: &Surface, _buffer_index: usize, _size: usize) -> TestConfigResult {
        TestConfigResult::Unsupported
    }

    fn pre_alloc(&self, _surface: &Surface) -> bool {
        true
    }

    fn allocate_buffer(
        &self,
        surface: &Surface,
        buffer_index: usize,
        size: usize,
    ) -> PoolResult<(usize, usize)>;

    fn deallocate_buffer(&self, offset: usize, size: usize) -> PoolResult<()>;

    /// Consulted during muck-out: mark candidate allocations for eviction
    /// using pool-internal policy (usually LRU). Returns the offsets/ids
    /// of allocations the pool nominates.
    fn muck_out(&self, _candidates: &[ObjectId]) -> Vec<ObjectId> {
        Vec::new()
    }

    fn check_key(&self, _key: u64) -> PoolResult<()> {
        Err(crate::error::PoolError::Unsupported)
    }

    fn allocate_key(&self, _key: u64, _size: usize) -> PoolResult<(usize, usize)> {
        Err(crate::error::PoolError::Unsupported)
    }

    fn lock(&self, offset: usize, _pitch: usize) -> PoolResult<usize> {
        Ok(offset)
    }

    fn unlock(&self, _offset: usize) -> PoolResult<()> {
        Ok(())
    }

    /// Reads `rect` (in pixels, already clamped to the surface's extent by
    /// the caller) out of the buffer at `offset`, striding by `pitch` bytes
    /// per row. `buf` is tightly packed: `rect.w * bpp` bytes per row, no
    /// gaps between rows.
    fn read(&self, _offset: usize, _pitch: usize, _rect: Rectangle, _bpp: usize, _buf: &mut [u8]) -> PoolResult<()> {
        Err(crate::error::PoolError::Unsupported)
    }

    /// Writes `buf` (tightly packed, `rect.w * bpp` bytes per row) into
    /// `rect` at `offset`, striding by `pitch` bytes per row.
    fn write(&self, _offset: usize, _pitch: usize, _rect: Rectangle, _bpp: usize, _buf: &[u8]) -> PoolResult<()> {
        Err(crate::error::PoolError::Unsupported)
    }
}

pub struct PoolInitContext {
    pub pool_id: u32,
}

/// A registered allocator instance (spec §3 "SurfacePool"). Stored by the
/// domain's pool engine in two parallel views: one in ID order, one in
/// priority order.
pub struct SurfacePool {
    pub id: u32,
    pub description: PoolDescription,
    pub funcs: Box<dyn PoolFuncs>,
    pub skirmish: Skirmish,
    /// IDs of allocations currently placed in this pool, shared ownership
    /// with the owning buffer's allocation vector.
    pub allocations: Vec<ObjectId>,
    /// Backup pool id, usually pool 0 ("shared system memory").
    pub backup: Option<u32>,
}

impl SurfacePool {
    pub fn accepts(&self, access: AccessFlags, accessor: Accessor, types: TypeFlags) -> bool {
        self.description.access_mask(accessor).contains(access)
            && self.description.types.contains(types & !(TypeFlags::PREALLOCATED))
    }

    /// Removes `id` from this pool's allocation vector. The allocation
    /// record itself lives in the domain's arena, not here; returns
    /// whether the id was found.
    pub fn remove_allocation(&mut self, id: ObjectId) -> bool {
        let Some(pos) = self.allocations.iter().position(|a| *a == id) else {
            return false;
        };
        self.allocations.remove(pos);
        true
    }
}
