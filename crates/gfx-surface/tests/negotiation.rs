//! Negotiation and pool-registration ordering, spec §8 properties 1–2.

use gfx_surface::mem_pool::{SharedMemoryPool, VideoMemoryPool};
use gfx_surface::{AccessFlags, Accessor, BufferPolicy, ColorSpace, PixelFormat, PoolPriority, SurfaceCaps, SurfaceDescription, SurfaceDomain, TypeFlags};

fn window_surface() -> SurfaceDescription {
    SurfaceDescription {
        width: 64,
        height: 64,
        format: PixelFormat::Argb8888,
        color_space: ColorSpace::Rgb,
        caps: SurfaceCaps::NONE,
        type_flags: TypeFlags::WINDOW,
        policy: BufferPolicy::Auto,
    }
}

#[test]
fn pool_ids_are_assigned_sequentially_and_never_reused() {
    let mut domain = SurfaceDomain::new(8);
    let a = domain.register_pool(Box::new(SharedMemoryPool::new(1 << 20))).unwrap();
    let b = domain.register_pool(Box::new(VideoMemoryPool::new(1 << 20, PoolPriority::Prefered))).unwrap();
    assert_eq!((a, b), (0, 1));

    domain.unregister_pool(a).unwrap();
    let c = domain.register_pool(Box::new(SharedMemoryPool::new(1 << 20))).unwrap();
    assert_eq!(c, 2, "a freed pool id must never be reassigned");
}

#[test]
fn priority_order_is_a_stable_sort_by_descending_priority() {
    let mut domain = SurfaceDomain::new(8);
    domain.register_pool(Box::new(VideoMemoryPool::new(1 << 20, PoolPriority::Default))).unwrap();
    domain.register_pool(Box::new(VideoMemoryPool::new(1 << 20, PoolPriority::Ultimate))).unwrap();
    domain.register_pool(Box::new(VideoMemoryPool::new(1 << 20, PoolPriority::Default))).unwrap();
    domain.register_pool(Box::new(VideoMemoryPool::new(1 << 20, PoolPriority::Prefered))).unwrap();

    // Ultimate(1) > Prefered(3) > Default(0), Default(2), ties keep id order.
    assert_eq!(domain.priority_order(), &[1, 3, 0, 2]);
}

#[test]
fn join_out_of_order_fails() {
    let mut domain = SurfaceDomain::new(8);
    domain.register_pool(Box::new(SharedMemoryPool::new(1024))).unwrap();
    domain.register_pool(Box::new(SharedMemoryPool::new(1024))).unwrap();

    assert!(domain.join_pool(1).is_err(), "joining out of id order must fail");
    domain.join_pool(0).unwrap();
    domain.join_pool(1).unwrap();
}

#[test]
fn scenario_s1_higher_priority_pool_wins_negotiation_and_allocation() {
    let mut domain = SurfaceDomain::new(8);
    domain.register_pool(Box::new(SharedMemoryPool::new(1 << 20))).unwrap();
    domain.register_pool(Box::new(VideoMemoryPool::new(1 << 20, PoolPriority::Prefered))).unwrap();

    let surface_id = domain.create_surface(window_surface());
    let negotiation = domain.negotiate(surface_id, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE, 8, false).unwrap();
    assert_eq!(negotiation.pools, vec![1, 0]);

    let alloc_id = domain.allocate(surface_id, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE).unwrap();
    assert_eq!(domain.allocation(alloc_id).unwrap().pool, 1);
}
