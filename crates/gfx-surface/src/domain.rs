//! The surface pool engine (spec §4.2, §4.3): registration, join, priority
//! ordering, negotiation, allocation, displacement, backup, and lock/unlock.
//!
//! `SurfaceDomain` is the explicit `Core` context the spec's §9 redesign
//! note asks for: the pool arrays and the surface/allocation arenas that
//! the original implementation kept as process-global state are threaded
//! through every call here instead.

use tracing::{debug, instrument, trace, warn};

use gfx_ipc::{IdTable, ObjectId};

use crate::error::{PoolError, PoolResult};
use crate::pool::{BufferLock, PoolDescription, PoolFuncs, PoolInitContext, SurfacePool, TestConfigResult};
use crate::surface::{Surface, SurfaceAllocation, SurfaceDescription};
use crate::types::{AccessFlags, AllocationFlags, Accessor, TypeFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStatus {
    Ok,
    NoVideoMemory,
    Unsupported,
}

pub struct NegotiationResult {
    pub status: NegotiationStatus,
    pub pools: Vec<u32>,
}

/// Looks up a pool by id against an explicit slice, so the borrow checker
/// sees this as touching only the pool array rather than the whole domain.
fn pool_ref(pools: &[Option<SurfacePool>], pool_id: u32) -> PoolResult<&SurfacePool> {
    pools.get(pool_id as usize).and_then(|p| p.as_ref()).ok_or(PoolError::IdNotFound)
}

fn pool_mut(pools: &mut [Option<SurfacePool>], pool_id: u32) -> PoolResult<&mut SurfacePool> {
    pools.get_mut(pool_id as usize).and_then(|p| p.as_mut()).ok_or(PoolError::IdNotFound)
}

/// Owns every surface, allocation, and pool in one process. Threaded
/// through by value (as `&mut`) into every public operation rather than
/// reached via global state.
pub struct SurfaceDomain {
    surfaces: IdTable<Surface>,
    allocations: IdTable<SurfaceAllocation>,
    pools: Vec<Option<SurfacePool>>,
    priority_order: Vec<u32>,
    /// Next join index this process expects (spec §4.2 "Pool join").
    join_cursor: u32,
    max_pools: u32,
}

impl SurfaceDomain {
    pub fn new(max_pools: u32) -> Self {
        Self {
            surfaces: IdTable::new(),
            allocations: IdTable::new(),
            pools: Vec::new(),
            priority_order: Vec::new(),
            join_cursor: 0,
            max_pools,
        }
    }

    pub fn surface(&self, id: ObjectId) -> Option<&Surface> {
        self.surfaces.get(id)
    }

    pub fn allocation(&self, id: ObjectId) -> Option<&SurfaceAllocation> {
        self.allocations.get(id)
    }

    /// Number of non-null slots in the ID-ordered pool array (spec §3:
    /// "pool count = number of non-null slots").
    pub fn pool_count(&self) -> u32 {
        self.pools.iter().filter(|p| p.is_some()).count() as u32
    }

    pub fn pool_description(&self, pool_id: u32) -> Option<&PoolDescription> {
        self.pools.get(pool_id as usize)?.as_ref().map(|p| &p.description)
    }

    pub fn priority_order(&self) -> &[u32] {
        &self.priority_order
    }

    pub fn create_surface(&mut self, description: SurfaceDescription) -> ObjectId {
        self.surfaces.insert(Surface::new(description))
    }

    /// Registers a new pool, assigning the next sequential pool ID (spec
    /// §4.2 "Pool registration").
    pub fn register_pool(&mut self, funcs: Box<dyn PoolFuncs>) -> PoolResult<u32> {
        if self.pools.len() as u32 >= self.max_pools {
            return Err(PoolError::LimitExceeded);
        }
        let pool_id = self.pools.len() as u32;
        let ctx = PoolInitContext { pool_id };
        let mut description = funcs.init_pool(&ctx)?;
        if funcs.supports_read() {
            description.caps |= crate::types::PoolCapabilities::READ;
        }
        if funcs.supports_write() {
            description.caps |= crate::types::PoolCapabilities::WRITE;
        }

        let backup = if pool_id == 0 { None } else { Some(0) };
        let priority = description.priority;
        let pool = SurfacePool {
            id: pool_id,
            description,
            funcs,
            skirmish: gfx_ipc::Skirmish::new(),
            allocations: Vec::new(),
            backup,
        };

        let pools = &self.pools;
        let insert_at = self
            .priority_order
            .iter()
            .position(|existing| pools[*existing as usize].as_ref().unwrap().description.priority < priority)
            .unwrap_or(self.priority_order.len());

        debug!(pool_id, priority = ?priority, "registering surface pool");
        self.pools.push(Some(pool));
        self.priority_order.insert(insert_at, pool_id);
        self.join_cursor = self.join_cursor.max(pool_id + 1);
        Ok(pool_id)
    }

    /// Non-master join path (spec §4.2 "Pool join"): must happen in the
    /// exact ID order pools were registered in, or fails with a stand-in
    /// for `BUG`.
    pub fn join_pool(&mut self, pool_id: u32) -> PoolResult<()> {
        if pool_id != self.join_cursor {
            return Err(PoolError::OutOfOrderJoin {
                attempted: pool_id,
                expected: self.join_cursor,
            });
        }
        let pool = pool_ref(&self.pools, pool_id)?;
        let ctx = PoolInitContext { pool_id };
        pool.funcs.join_pool(&ctx)?;
        self.join_cursor += 1;
        Ok(())
    }

    /// Removes a pool entirely (spec §3: "pool count = number of non-null
    /// slots"). Leaves a hole in the ID-ordered array; IDs are never
    /// reused.
    pub fn unregister_pool(&mut self, pool_id: u32) -> PoolResult<()> {
        let slot = self.pools.get_mut(pool_id as usize).ok_or(PoolError::IdNotFound)?;
        let pool = slot.take().ok_or(PoolError::IdNotFound)?;
        pool.funcs.destroy_pool()?;
        self.priority_order.retain(|id| *id != pool_id);
        Ok(())
    }

    /// Ordered enumeration of pools that could service a request (spec
    /// §4.2 "Negotiation"). `is_slave` models a non-master process, which
    /// may only use pools whose accessor mask carries `SHARED`.
    pub fn negotiate(
        &self,
        surface_id: ObjectId,
        buffer_index: usize,
        accessor: Accessor,
        access: AccessFlags,
        max: usize,
        is_slave: bool,
    ) -> PoolResult<NegotiationResult> {
        let surface = self.surfaces.get(surface_id).ok_or(PoolError::IdNotFound)?;
        if surface.buffers.get(buffer_index).is_none() {
            return Err(PoolError::InvArg("buffer_index out of range"));
        }
        let type_mask = surface.negotiation_type_mask();
        let size = surface.byte_size();

        let mut ok = Vec::new();
        let mut no_memory = Vec::new();

        for &pool_id in &self.priority_order {
            let pool = pool_ref(&self.pools, pool_id)?;
            if is_slave && !pool.description.access_mask(accessor).contains(AccessFlags::SHARED) {
                continue;
            }
            if !pool.accepts(access, accessor, type_mask) {
                continue;
            }
            match pool.funcs.test_config(surface, buffer_index, size) {
                TestConfigResult::Ok => ok.push(pool_id),
                TestConfigResult::NoMemory => no_memory.push(pool_id),
                TestConfigResult::Unsupported => {}
            }
        }

        let status = if !ok.is_empty() {
            NegotiationStatus::Ok
        } else if !no_memory.is_empty() {
            NegotiationStatus::NoVideoMemory
        } else {
            NegotiationStatus::Unsupported
        };

        let mut pools = ok;
        pools.extend(no_memory);
        pools.truncate(max);
        Ok(NegotiationResult { status, pools })
    }

    /// Allocates a buffer in the highest-priority pool that accepts it,
    /// falling back to displacement if every negotiated pool is out of
    /// memory (spec §4.2 "Allocation").
    #[instrument(skip(self))]
    pub fn allocate(
        &mut self,
        surface_id: ObjectId,
        buffer_index: usize,
        accessor: Accessor,
        access: AccessFlags,
    ) -> PoolResult<ObjectId> {
        let negotiation = self.negotiate(surface_id, buffer_index, accessor, access, usize::MAX, false)?;
        if negotiation.status == NegotiationStatus::Unsupported {
            return Err(PoolError::Unsupported);
        }

        let mut retry_pools = negotiation.pools.clone();
        for pool_id in &negotiation.pools {
            match self.pool_allocate(*pool_id, surface_id, buffer_index, accessor) {
                Ok(id) => return Ok(id),
                Err(PoolError::NoMemory | PoolError::NoVideoMemory) => continue,
                Err(_) => retry_pools.retain(|p| p != pool_id),
            }
        }

        for pool_id in retry_pools {
            if let Ok(id) = self.pool_displace(pool_id, surface_id, buffer_index, accessor) {
                return Ok(id);
            }
        }

        Err(PoolError::NoVideoMemory)
    }

    fn pool_allocate(
        &mut self,
        pool_id: u32,
        surface_id: ObjectId,
        buffer_index: usize,
        accessor: Accessor,
    ) -> PoolResult<ObjectId> {
        let surface_snapshot = self.surfaces.get(surface_id).ok_or(PoolError::IdNotFound)?.clone();
        let size = surface_snapshot.byte_size();
        let buffer_serial = surface_snapshot
            .buffers
            .get(buffer_index)
            .ok_or(PoolError::InvArg("buffer_index out of range"))?
            .serial;

        let pool = pool_mut(&mut self.pools, pool_id)?;
        let guard = pool.skirmish.lock();
        let (offset, actual_size) = pool.funcs.allocate_buffer(&surface_snapshot, buffer_index, size)?;

        let allocation = SurfaceAllocation {
            surface: surface_id,
            buffer_index,
            pool: pool_id,
            size: actual_size,
            offset,
            flags: AllocationFlags::NONE,
            serial: buffer_serial,
            // "the CPU cache after the allocation has some data": the
            // access-history mask is set unconditionally on first
            // allocation, not left zeroed (spec Open Questions / REDESIGN).
            accessed: vec![(accessor, AccessFlags::READ | AccessFlags::WRITE)],
        };
        let alloc_id = self.allocations.insert(allocation);
        pool.allocations.push(alloc_id);
        drop(guard);

        let surface = self.surfaces.get_mut(surface_id).expect("surface checked above");
        surface.buffers[buffer_index].allocations.push(alloc_id);

        trace!(pool_id, %alloc_id, offset, actual_size, "allocated buffer");
        Ok(alloc_id)
    }

    /// Keyed allocation: scans pools in priority order for the first whose
    /// type mask accepts the buffer (excluding prealloc/internal/external)
    /// and whose `CheckKey` succeeds (spec §4.2 "Keyed allocation").
    pub fn allocate_key(&mut self, surface_id: ObjectId, buffer_index: usize, key: u64) -> PoolResult<ObjectId> {
        let surface = self.surfaces.get(surface_id).ok_or(PoolError::IdNotFound)?;
        let size = surface.byte_size();
        let type_mask = surface.description.type_flags & !(TypeFlags::PREALLOCATED | TypeFlags::INTERNAL | TypeFlags::EXTERNAL);

        let candidates: Vec<u32> = self
            .priority_order
            .iter()
            .copied()
            .filter(|id| {
                pool_ref(&self.pools, *id)
                    .map(|p| p.description.types.contains(type_mask) && p.funcs.check_key(key).is_ok())
                    .unwrap_or(false)
            })
            .collect();

        let pool_id = *candidates.first().ok_or(PoolError::Unsupported)?;
        let pool = pool_mut(&mut self.pools, pool_id)?;
        let guard = pool.skirmish.lock();
        let (offset, actual_size) = pool.funcs.allocate_key(key, size)?;
        let allocation = SurfaceAllocation {
            surface: surface_id,
            buffer_index,
            pool: pool_id,
            size: actual_size,
            offset,
            flags: AllocationFlags::NONE,
            serial: 0,
            accessed: Vec::new(),
        };
        let alloc_id = self.allocations.insert(allocation);
        pool.allocations.push(alloc_id);
        drop(guard);
        self.surfaces.get_mut(surface_id).expect("checked above").buffers[buffer_index].allocations.push(alloc_id);
        Ok(alloc_id)
    }

    /// Displaces existing allocations from `pool_id` to make room, then
    /// allocates the requesting buffer (spec §4.2 "Displacement").
    fn pool_displace(
        &mut self,
        pool_id: u32,
        surface_id: ObjectId,
        buffer_index: usize,
        accessor: Accessor,
    ) -> PoolResult<ObjectId> {
        const MAX_RETRIES: u32 = 3;

        let candidates = pool_ref(&self.pools, pool_id)?.allocations.clone();
        let marked = pool_mut(&mut self.pools, pool_id)?.funcs.muck_out(&candidates);
        for id in &marked {
            if let Some(alloc) = self.allocations.get_mut(*id) {
                alloc.flags |= AllocationFlags::MUCKOUT;
            }
        }

        let mut retries = 0;
        let mut pending: Vec<ObjectId> = marked;
        while retries < MAX_RETRIES && !pending.is_empty() {
            let mut still_pending = Vec::new();
            for id in pending {
                let locked = self
                    .allocations
                    .get(id)
                    .map(|a| a.flags.contains(AllocationFlags::INITIALIZING))
                    .unwrap_or(false);
                if locked {
                    still_pending.push(id);
                    continue;
                }
                self.backup_and_deallocate(id)?;
            }
            if still_pending.is_empty() {
                break;
            }
            pending = still_pending;
            retries += 1;
        }
        if !pending.is_empty() {
            warn!(pool_id, pending = pending.len(), "displacement exhausted retry budget on contended allocations");
            for id in &pending {
                if let Some(alloc) = self.allocations.get_mut(*id) {
                    alloc.flags.remove(AllocationFlags::MUCKOUT);
                }
            }
            return Err(PoolError::Locked);
        }

        self.pool_allocate(pool_id, surface_id, buffer_index, accessor)
    }

    /// Preserves `alloc_id`'s content before it is evicted (spec §4.2
    /// "Backup"), then deallocates it.
    fn backup_and_deallocate(&mut self, alloc_id: ObjectId) -> PoolResult<()> {
        let alloc = self.allocations.get(alloc_id).ok_or(PoolError::IdNotFound)?.clone();
        let surface = self.surfaces.get(alloc.surface).ok_or(PoolError::IdNotFound)?;
        let buffer_serial = surface.buffers[alloc.buffer_index].serial;
        let siblings: Vec<ObjectId> = surface.buffers[alloc.buffer_index]
            .allocations
            .iter()
            .copied()
            .filter(|id| *id != alloc_id)
            .collect();

        let is_only_copy = alloc.serial == buffer_serial
            && !siblings.iter().any(|id| self.allocations.get(*id).map(|a| a.serial == buffer_serial).unwrap_or(false));

        if is_only_copy {
            let mut refreshed = false;
            for sibling in &siblings {
                if self.refresh_allocation(*sibling, buffer_serial).is_ok() {
                    refreshed = true;
                    break;
                }
            }
            if !refreshed {
                let backup_pool = pool_ref(&self.pools, alloc.pool)?.backup.ok_or(PoolError::NoVideoMemory)?;
                let new_id = self.pool_allocate(backup_pool, alloc.surface, alloc.buffer_index, Accessor::Cpu)?;
                self.refresh_allocation(new_id, buffer_serial)?;
            }
        }

        self.deallocate(alloc_id)
    }

    /// Simulates a cross-pool content refresh: in the reference system
    /// this copies pixels via the pool's Read/Write callbacks (or a direct
    /// address copy when both pools share CPU addressing). This workspace
    /// has no real pixel backing store shared across pool implementations,
    /// so refreshing an allocation is modeled as adopting the buffer's
    /// current serial; see DESIGN.md for the corresponding open-question
    /// decision.
    fn refresh_allocation(&mut self, alloc_id: ObjectId, buffer_serial: u64) -> PoolResult<()> {
        let alloc = self.allocations.get_mut(alloc_id).ok_or(PoolError::IdNotFound)?;
        alloc.serial = buffer_serial;
        Ok(())
    }

    /// Removes an allocation from both its pool's and its buffer's
    /// vectors, then calls the pool's `DeallocateBuffer` (spec §3
    /// "SurfaceAllocation" lifecycle).
    pub fn deallocate(&mut self, alloc_id: ObjectId) -> PoolResult<()> {
        let alloc = self.allocations.remove(alloc_id).ok_or(PoolError::IdNotFound)?;
        if let Ok(pool) = pool_mut(&mut self.pools, alloc.pool) {
            let guard = pool.skirmish.lock();
            pool.remove_allocation(alloc_id);
            let result = pool.funcs.deallocate_buffer(alloc.offset, alloc.size);
            drop(guard);
            result?;
        }
        if let Some(surface) = self.surfaces.get_mut(alloc.surface) {
            if let Some(buffer) = surface.buffers.get_mut(alloc.buffer_index) {
                buffer.allocations.retain(|id| *id != alloc_id);
            }
        }
        debug!(%alloc_id, "deallocated");
        Ok(())
    }

    /// Locks an allocation for `accessor`, refreshing it first if a write
    /// by a different accessor has happened since this allocation was
    /// last synchronized (spec §4.3).
    pub fn lock(&mut self, alloc_id: ObjectId, accessor: Accessor) -> PoolResult<BufferLock> {
        let (pool_id, buffer_serial, offset, buffer_index, surface_id) = {
            let alloc = self.allocations.get(alloc_id).ok_or(PoolError::IdNotFound)?;
            let surface = self.surfaces.get(alloc.surface).ok_or(PoolError::IdNotFound)?;
            (alloc.pool, surface.buffers[alloc.buffer_index].serial, alloc.offset, alloc.buffer_index, alloc.surface)
        };

        if self.allocations.get(alloc_id).map(|a| a.serial != buffer_serial).unwrap_or(false) {
            self.refresh_allocation(alloc_id, buffer_serial)?;
        }

        let pitch = self.surfaces.get(surface_id).expect("surface exists").pitch();
        let pool = pool_mut(&mut self.pools, pool_id)?;
        let guard = pool.skirmish.lock();
        let address = pool.funcs.lock(offset, pitch)?;
        drop(guard);

        let alloc = self.allocations.get_mut(alloc_id).expect("checked above");
        alloc.flags |= AllocationFlags::INITIALIZING;
        alloc.record_access(accessor, AccessFlags::READ | AccessFlags::WRITE);

        Ok(BufferLock {
            allocation: alloc_id,
            buffer_index,
            address,
            pitch,
        })
    }

    pub fn unlock(&mut self, alloc_id: ObjectId) -> PoolResult<()> {
        let (pool_id, offset, surface_id, buffer_index) = {
            let alloc = self.allocations.get_mut(alloc_id).ok_or(PoolError::IdNotFound)?;
            alloc.flags &= !AllocationFlags::INITIALIZING;
            (alloc.pool, alloc.offset, alloc.surface, alloc.buffer_index)
        };

        let pool = pool_ref(&self.pools, pool_id)?;
        let guard = pool.skirmish.lock();
        pool.funcs.unlock(offset)?;
        drop(guard);

        let surface = self.surfaces.get_mut(surface_id).expect("surface exists");
        surface.buffers[buffer_index].bump_serial();
        let new_serial = surface.buffers[buffer_index].serial;
        self.allocations.get_mut(alloc_id).expect("checked above").serial = new_serial;
        Ok(())
    }

    /// Out-of-lock transfer helper (spec §4.2 "Read/Write"): geometrically
    /// clamps `rect` to the surface's extent (not the loose adjacency test
    /// `Rectangle::extends_or_intersects` uses for `Updates` merging) before
    /// delegating to the pool callback. `buf` is tightly packed for `rect`
    /// as given (`rect.w * bpp` bytes per row); when clamping shrinks the
    /// rect, only the surviving rows/columns are repacked and forwarded.
    pub fn write_rect(&mut self, alloc_id: ObjectId, rect: gfx_primitives::Rectangle, buf: &[u8]) -> PoolResult<()> {
        let alloc = self.allocations.get(alloc_id).ok_or(PoolError::IdNotFound)?.clone();
        let surface = self.surfaces.get(alloc.surface).ok_or(PoolError::IdNotFound)?;
        let bpp = surface.description.format.bytes_per_pixel();
        let pitch = surface.pitch();
        let clamped = clamp_rect(rect, surface.description.width, surface.description.height).ok_or(PoolError::InvArea)?;

        let src_pitch = rect.w as usize * bpp;
        if buf.len() < src_pitch * rect.h as usize {
            return Err(PoolError::InvArg("buffer too small for the requested rectangle"));
        }

        if clamped == rect {
            return pool_ref(&self.pools, alloc.pool)?.funcs.write(alloc.offset, pitch, clamped, bpp, buf);
        }

        let row_bytes = clamped.w as usize * bpp;
        let x_off = (clamped.x - rect.x) as usize * bpp;
        let y_off = (clamped.y - rect.y) as usize;
        let mut clipped = vec![0u8; row_bytes * clamped.h as usize];
        for row in 0..clamped.h as usize {
            let src_start = (y_off + row) * src_pitch + x_off;
            clipped[row * row_bytes..(row + 1) * row_bytes].copy_from_slice(&buf[src_start..src_start + row_bytes]);
        }
        pool_ref(&self.pools, alloc.pool)?.funcs.write(alloc.offset, pitch, clamped, bpp, &clipped)
    }

    pub fn read_rect(&mut self, alloc_id: ObjectId, rect: gfx_primitives::Rectangle, buf: &mut [u8]) -> PoolResult<()> {
        let alloc = self.allocations.get(alloc_id).ok_or(PoolError::IdNotFound)?.clone();
        let surface = self.surfaces.get(alloc.surface).ok_or(PoolError::IdNotFound)?;
        let bpp = surface.description.format.bytes_per_pixel();
        let pitch = surface.pitch();
        let clamped = clamp_rect(rect, surface.description.width, surface.description.height).ok_or(PoolError::InvArea)?;

        let dst_pitch = rect.w as usize * bpp;
        if buf.len() < dst_pitch * rect.h as usize {
            return Err(PoolError::InvArg("buffer too small for the requested rectangle"));
        }

        if clamped == rect {
            return pool_ref(&self.pools, alloc.pool)?.funcs.read(alloc.offset, pitch, clamped, bpp, buf);
        }

        let row_bytes = clamped.w as usize * bpp;
        let x_off = (clamped.x - rect.x) as usize * bpp;
        let y_off = (clamped.y - rect.y) as usize;
        let mut clipped = vec![0u8; row_bytes * clamped.h as usize];
        pool_ref(&self.pools, alloc.pool)?.funcs.read(alloc.offset, pitch, clamped, bpp, &mut clipped)?;
        for row in 0..clamped.h as usize {
            let dst_start = (y_off + row) * dst_pitch + x_off;
            buf[dst_start..dst_start + row_bytes].copy_from_slice(&clipped[row * row_bytes..(row + 1) * row_bytes]);
        }
        Ok(())
    }
}

/// Intersects `rect` with `(0, 0, width, height)`, returning `None` if
/// nothing survives.
fn clamp_rect(rect: gfx_primitives::Rectangle, width: u32, height: u32) -> Option<gfx_primitives::Rectangle> {
    let mut region = rect.to_region();
    if !region.intersect(0, 0, width as i32 - 1, height as i32 - 1) {
        return None;
    }
    Some(region.to_rectangle())
}
