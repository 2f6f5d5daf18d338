//! Displacement and backup, spec §8 properties 3–5 and scenario S3.

use gfx_surface::mem_pool::{SharedMemoryPool, VideoMemoryPool};
use gfx_surface::{
    AccessFlags, Accessor, AllocationFlags, BufferPolicy, ColorSpace, PixelFormat, PoolError, PoolPriority, SurfaceCaps,
    SurfaceDescription, SurfaceDomain, TypeFlags,
};

fn big_surface() -> SurfaceDescription {
    SurfaceDescription {
        width: 1000,
        height: 1000,
        format: PixelFormat::Argb8888,
        color_space: ColorSpace::Rgb,
        caps: SurfaceCaps::NONE,
        type_flags: TypeFlags::WINDOW,
        policy: BufferPolicy::Auto,
    }
}

/// Ten 1000x1000 ARGB surfaces exactly fill the video pool; an eleventh
/// forces displacement. The evicted surfaces' content must survive in the
/// backup pool with their serial preserved (spec scenario S3).
#[test]
fn scenario_s3_displacement_backs_up_evicted_allocations() {
    const BUFFER_BYTES: usize = 1000 * 1000 * 4;
    let mut domain = SurfaceDomain::new(8);

    // Backup-only pool: excluded from direct negotiation for WINDOW
    // surfaces (FONT only), but still reachable as pool 0's designated
    // backup target.
    domain
        .register_pool(Box::new(SharedMemoryPool::new_with_types(BUFFER_BYTES * 20, TypeFlags::FONT)))
        .unwrap();
    domain
        .register_pool(Box::new(VideoMemoryPool::new(BUFFER_BYTES * 10, PoolPriority::Prefered)))
        .unwrap();

    let mut surfaces = Vec::new();
    let mut old_serials = Vec::new();
    for _ in 0..10 {
        let surface_id = domain.create_surface(big_surface());
        let alloc_id = domain.allocate(surface_id, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE).unwrap();
        assert_eq!(domain.allocation(alloc_id).unwrap().pool, 1);
        old_serials.push(domain.allocation(alloc_id).unwrap().serial);
        surfaces.push(surface_id);
    }

    let eleventh = domain.create_surface(big_surface());
    let eleventh_alloc = domain.allocate(eleventh, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE).unwrap();
    assert_eq!(domain.allocation(eleventh_alloc).unwrap().pool, 1, "new allocation must land in the preferred pool");

    for (surface_id, old_serial) in surfaces.into_iter().zip(old_serials) {
        let surface = domain.surface(surface_id).unwrap();
        let remaining = surface.buffers[0].allocations.clone();
        assert_eq!(remaining.len(), 1, "each evicted buffer keeps exactly one live allocation");
        let backup_alloc = domain.allocation(remaining[0]).unwrap();
        assert_eq!(backup_alloc.pool, 0, "evicted content must have been backed up to the backup pool");
        assert!(backup_alloc.serial >= old_serial, "backup must preserve or advance freshness");
    }
}

/// When every candidate for muck-out stays locked past the retry budget,
/// displacement must give up cleanly rather than leaving the allocation
/// permanently flagged MUCKOUT (spec §4.2: "report LOCKED and clear all
/// MUCKOUT flags").
#[test]
fn exhausted_displacement_retry_budget_clears_muckout_flags() {
    const BUFFER_BYTES: usize = 1000 * 1000 * 4;
    let mut domain = SurfaceDomain::new(8);

    domain
        .register_pool(Box::new(SharedMemoryPool::new_with_types(BUFFER_BYTES * 4, TypeFlags::FONT)))
        .unwrap();
    domain
        .register_pool(Box::new(VideoMemoryPool::new(BUFFER_BYTES, PoolPriority::Prefered)))
        .unwrap();

    let first = domain.create_surface(big_surface());
    let first_alloc = domain.allocate(first, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE).unwrap();
    assert_eq!(domain.allocation(first_alloc).unwrap().pool, 1);

    // Lock it so it can never be evicted, forcing every displacement retry
    // to find it still pending.
    domain.lock(first_alloc, Accessor::Cpu).unwrap();

    let second = domain.create_surface(big_surface());
    let err = domain.allocate(second, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE).unwrap_err();
    assert_eq!(err, PoolError::NoVideoMemory, "allocate() exhausts its only displaceable pool and reports out-of-memory");

    assert!(
        !domain.allocation(first_alloc).unwrap().flags.contains(AllocationFlags::MUCKOUT),
        "MUCKOUT must be cleared once the retry budget is exhausted"
    );
}

#[test]
fn deallocate_removes_allocation_from_both_pool_and_buffer() {
    let mut domain = SurfaceDomain::new(8);
    domain.register_pool(Box::new(SharedMemoryPool::new(1 << 20))).unwrap();

    let surface_id = domain.create_surface(big_surface());
    let alloc_id = domain.allocate(surface_id, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE).unwrap();
    domain.deallocate(alloc_id).unwrap();

    assert!(domain.allocation(alloc_id).is_none());
    assert!(domain.surface(surface_id).unwrap().buffers[0].allocations.is_empty());
}

#[test]
fn lock_unlock_round_trip_advances_buffer_serial() {
    let mut domain = SurfaceDomain::new(8);
    domain.register_pool(Box::new(SharedMemoryPool::new(1 << 20))).unwrap();

    let surface_id = domain.create_surface(big_surface());
    let alloc_id = domain.allocate(surface_id, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE).unwrap();
    let before = domain.surface(surface_id).unwrap().buffers[0].serial;

    let lock = domain.lock(alloc_id, Accessor::Cpu).unwrap();
    assert_eq!(lock.allocation, alloc_id);
    domain.unlock(alloc_id).unwrap();

    let after = domain.surface(surface_id).unwrap().buffers[0].serial;
    assert_eq!(after, before + 1);
    assert_eq!(domain.allocation(alloc_id).unwrap().serial, after);
}
