//! Reference pool implementation backed by a [`gfx_ipc::SharedHeap`],
//! grounded on the reference system's default "shared system memory" pool:
//! virtual addressing only, CPU read/write/shared, and every type flag
//! accepted so it can always serve as the backup pool (pool 0).

use gfx_ipc::SharedHeap;
use gfx_primitives::Rectangle;

use crate::error::{PoolError, PoolResult};
use crate::pool::{PoolDescription, PoolFuncs, PoolInitContext, TestConfigResult};
use crate::surface::Surface;
use crate::types::{AccessFlags, Accessor, PoolPriority, TypeFlags};

/// Strides `rect` row by row into `buf` (tightly packed, `rect.w * bpp`
/// bytes per row) out of `heap` starting at `offset`, stepping `pitch`
/// bytes between rows.
fn heap_read_rect(heap: &SharedHeap, offset: usize, pitch: usize, rect: Rectangle, bpp: usize, buf: &mut [u8]) {
    let row_bytes = rect.w as usize * bpp;
    for row in 0..rect.h as usize {
        let src = offset + (rect.y as usize + row) * pitch + rect.x as usize * bpp;
        heap.read_at(src, &mut buf[row * row_bytes..(row + 1) * row_bytes]);
    }
}

fn heap_write_rect(heap: &SharedHeap, offset: usize, pitch: usize, rect: Rectangle, bpp: usize, buf: &[u8]) {
    let row_bytes = rect.w as usize * bpp;
    for row in 0..rect.h as usize {
        let dst = offset + (rect.y as usize + row) * pitch + rect.x as usize * bpp;
        heap.write_at(dst, &buf[row * row_bytes..(row + 1) * row_bytes]);
    }
}

pub struct SharedMemoryPool {
    heap: SharedHeap,
    types: TypeFlags,
}

impl SharedMemoryPool {
    pub fn new(capacity: usize) -> Self {
        Self::new_with_types(
            capacity,
            TypeFlags::LAYER | TypeFlags::WINDOW | TypeFlags::CURSOR | TypeFlags::FONT | TypeFlags::SHARED | TypeFlags::INTERNAL | TypeFlags::EXTERNAL,
        )
    }

    /// Restricts the accepted type mask; used in tests to keep this pool
    /// out of direct negotiation for a type while still serving as the
    /// implicit backup pool (backup allocation bypasses the type check).
    pub fn new_with_types(capacity: usize, types: TypeFlags) -> Self {
        Self {
            heap: SharedHeap::new(capacity),
            types,
        }
    }
}

impl PoolFuncs for SharedMemoryPool {
    fn init_pool(&self, _ctx: &PoolInitContext) -> PoolResult<PoolDescription> {
        Ok(PoolDescription::new("shared system memory", PoolPriority::Default)
            .with_access(Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE | AccessFlags::SHARED)
            .with_types(self.types))
    }

    fn supports_read(&self) -> bool {
        true
    }

    fn supports_write(&self) -> bool {
        true
    }

    fn test_config(&self, _surface: &Surface, _buffer_index: usize, size: usize) -> TestConfigResult {
        if size <= self.heap.free_bytes() {
            TestConfigResult::Ok
        } else {
            TestConfigResult::NoMemory
        }
    }

    fn allocate_buffer(&self, _surface: &Surface, _buffer_index: usize, size: usize) -> PoolResult<(usize, usize)> {
        let offset = self.heap.alloc(size)?;
        Ok((offset, size))
    }

    fn deallocate_buffer(&self, offset: usize, size: usize) -> PoolResult<()> {
        self.heap.dealloc(offset, size);
        Ok(())
    }

    fn lock(&self, offset: usize, _pitch: usize) -> PoolResult<usize> {
        Ok(offset)
    }

    fn unlock(&self, _offset: usize) -> PoolResult<()> {
        Ok(())
    }

    fn read(&self, offset: usize, pitch: usize, rect: Rectangle, bpp: usize, buf: &mut [u8]) -> PoolResult<()> {
        heap_read_rect(&self.heap, offset, pitch, rect, bpp, buf);
        Ok(())
    }

    fn write(&self, offset: usize, pitch: usize, rect: Rectangle, bpp: usize, buf: &[u8]) -> PoolResult<()> {
        heap_write_rect(&self.heap, offset, pitch, rect, bpp, buf);
        Ok(())
    }
}

/// A small-capacity pool standing in for dedicated video memory: strict
/// about size, accepts the same type mask as the shared pool, and
/// advertises higher priority so negotiation prefers it (spec scenarios
/// S1/S2).
pub struct VideoMemoryPool {
    heap: SharedHeap,
    priority: PoolPriority,
}

impl VideoMemoryPool {
    pub fn new(capacity: usize, priority: PoolPriority) -> Self {
        Self {
            heap: SharedHeap::new(capacity),
            priority,
        }
    }
}

impl PoolFuncs for VideoMemoryPool {
    fn init_pool(&self, _ctx: &PoolInitContext) -> PoolResult<PoolDescription> {
        Ok(PoolDescription::new("video memory", self.priority)
            .with_access(Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE)
            .with_access(Accessor::Gpu, AccessFlags::READ | AccessFlags::WRITE)
            .with_types(TypeFlags::LAYER | TypeFlags::WINDOW | TypeFlags::CURSOR | TypeFlags::SHARED | TypeFlags::INTERNAL | TypeFlags::EXTERNAL))
    }

    fn supports_read(&self) -> bool {
        true
    }

    fn supports_write(&self) -> bool {
        true
    }

    fn test_config(&self, _surface: &Surface, _buffer_index: usize, size: usize) -> TestConfigResult {
        if size <= self.heap.free_bytes() {
            TestConfigResult::Ok
        } else {
            TestConfigResult::NoMemory
        }
    }

    fn allocate_buffer(&self, _surface: &Surface, _buffer_index: usize, size: usize) -> PoolResult<(usize, usize)> {
        self.heap.alloc(size).map(|offset| (offset, size)).map_err(PoolError::from)
    }

    fn deallocate_buffer(&self, offset: usize, size: usize) -> PoolResult<()> {
        self.heap.dealloc(offset, size);
        Ok(())
    }

    /// Simplified muck-out policy: nominate every live allocation in the
    /// pool rather than computing how much space the new buffer actually
    /// needs. The reference pool's real `MuckOut` stops as soon as enough
    /// space is freed; this reference implementation has no cheap way to
    /// learn the requested size from here, so it over-evicts (candidates
    /// are handed to us in registration order, oldest first, so this is
    /// still an LRU-ordered eviction, just not a minimal one).
    fn muck_out(&self, candidates: &[gfx_ipc::ObjectId]) -> Vec<gfx_ipc::ObjectId> {
        candidates.to_vec()
    }

    fn read(&self, offset: usize, pitch: usize, rect: Rectangle, bpp: usize, buf: &mut [u8]) -> PoolResult<()> {
        heap_read_rect(&self.heap, offset, pitch, rect, bpp, buf);
        Ok(())
    }

    fn write(&self, offset: usize, pitch: usize, rect: Rectangle, bpp: usize, buf: &[u8]) -> PoolResult<()> {
        heap_write_rect(&self.heap, offset, pitch, rect, bpp, buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SurfaceDomain;
    use crate::surface::SurfaceDescription;
    use crate::types::{BufferPolicy, ColorSpace, PixelFormat, SurfaceCaps};

    fn small_surface(domain: &mut SurfaceDomain) -> gfx_ipc::ObjectId {
        domain.create_surface(SurfaceDescription {
            width: 320,
            height: 240,
            format: PixelFormat::Argb8888,
            color_space: ColorSpace::Rgb,
            caps: SurfaceCaps::NONE,
            type_flags: TypeFlags::WINDOW,
            policy: BufferPolicy::Auto,
        })
    }

    #[test]
    fn scenario_s1_second_higher_priority_pool_wins() {
        let mut domain = SurfaceDomain::new(8);
        domain.register_pool(Box::new(SharedMemoryPool::new(1 << 20))).unwrap();
        domain.register_pool(Box::new(VideoMemoryPool::new(1 << 20, PoolPriority::Prefered))).unwrap();

        let surface_id = small_surface(&mut domain);
        let negotiation = domain.negotiate(surface_id, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE, 8, false).unwrap();
        assert_eq!(negotiation.pools, vec![1, 0]);

        let alloc_id = domain.allocate(surface_id, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE).unwrap();
        assert_eq!(domain.allocation(alloc_id).unwrap().pool, 1);
    }

    fn tiny_surface(domain: &mut SurfaceDomain) -> gfx_ipc::ObjectId {
        domain.create_surface(SurfaceDescription {
            width: 4,
            height: 4,
            format: PixelFormat::Argb8888,
            color_space: ColorSpace::Rgb,
            caps: SurfaceCaps::NONE,
            type_flags: TypeFlags::WINDOW,
            policy: BufferPolicy::Auto,
        })
    }

    /// `write_rect`/`read_rect` must reach actual storage (spec §4.2
    /// "Read/Write"), not silently discard the buffer as the no-op
    /// reference pools used to.
    #[test]
    fn write_rect_then_read_rect_round_trips_pixel_data() {
        let mut domain = SurfaceDomain::new(8);
        domain.register_pool(Box::new(SharedMemoryPool::new(1 << 16))).unwrap();

        let surface_id = tiny_surface(&mut domain);
        let alloc_id = domain.allocate(surface_id, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE).unwrap();

        let whole = Rectangle::new(0, 0, 4, 4);
        let pattern: Vec<u8> = (0..4 * 4 * 4).map(|i| i as u8).collect();
        domain.write_rect(alloc_id, whole, &pattern).unwrap();

        let mut readback = vec![0u8; pattern.len()];
        domain.read_rect(alloc_id, whole, &mut readback).unwrap();
        assert_eq!(readback, pattern);
    }

    /// A rect that spills past the surface's extent must be clamped before
    /// reaching the pool, not passed through the loose adjacency test
    /// `Rectangle::extends_or_intersects` was never meant to clamp with.
    #[test]
    fn write_rect_clamps_to_surface_extent() {
        let mut domain = SurfaceDomain::new(8);
        domain.register_pool(Box::new(SharedMemoryPool::new(1 << 16))).unwrap();

        let surface_id = tiny_surface(&mut domain);
        let alloc_id = domain.allocate(surface_id, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE).unwrap();

        // Requests the bottom-right 4x4 block of a 4x4 surface starting at
        // (2, 2); only the top-left 2x2 corner of that request is in bounds.
        let spilling = Rectangle::new(2, 2, 4, 4);
        let buf: Vec<u8> = (0..4 * 4 * 4).map(|i| i as u8).collect();
        domain.write_rect(alloc_id, spilling, &buf).unwrap();

        let mut whole = vec![0u8; 4 * 4 * 4];
        domain.read_rect(alloc_id, Rectangle::new(0, 0, 4, 4), &mut whole).unwrap();

        let pixel = |x: usize, y: usize| -> &[u8] { &whole[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4] };
        assert_eq!(pixel(2, 2), &[0, 0, 0, 0]);
        assert_eq!(pixel(3, 2), &[1, 1, 1, 1]);
        assert_eq!(pixel(2, 3), &[4, 4, 4, 4]);
        assert_eq!(pixel(3, 3), &[5, 5, 5, 5]);
        // Everywhere outside the clamped region was never written.
        assert_eq!(pixel(0, 0), &[0, 0, 0, 0]);
        assert_eq!(pixel(3, 0), &[0, 0, 0, 0]);
    }

    #[test]
    fn scenario_s2_small_pool_overflows_to_larger_one() {
        let mut domain = SurfaceDomain::new(8);
        domain.register_pool(Box::new(VideoMemoryPool::new(4096, PoolPriority::Default))).unwrap();
        domain.register_pool(Box::new(VideoMemoryPool::new(1 << 20, PoolPriority::Default))).unwrap();

        let surface_id = small_surface(&mut domain);
        let alloc_id = domain.allocate(surface_id, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE).unwrap();
        assert_eq!(domain.allocation(alloc_id).unwrap().pool, 1);
    }
}
