//! Surface, buffer, and allocation records (spec §3 "Surface"/"SurfaceBuffer"
//! /"SurfaceAllocation", §9 cyclic-reference note).
//!
//! Buffers and allocations never hold owning pointers back to their
//! surface or pool; they are addressed by `ObjectId` and resolved through
//! the owning `SurfaceDomain` at use time, which is what keeps the
//! surface/buffer/allocation/pool cycle from needing `Rc<RefCell<_>>`.

use gfx_ipc::ObjectId;

use crate::types::{AccessFlags, AllocationFlags, BufferPolicy, ColorSpace, PixelFormat, SurfaceCaps, TypeFlags};

#[derive(Debug, Clone, Copy)]
pub struct SurfaceDescription {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub color_space: ColorSpace,
    pub caps: SurfaceCaps,
    pub type_flags: TypeFlags,
    pub policy: BufferPolicy,
}

/// A concrete placement of one buffer in one pool (spec §3).
#[derive(Debug, Clone)]
pub struct SurfaceAllocation {
    /// Owning buffer, back-ref only; resolved through the domain's surface arena.
    pub surface: ObjectId,
    pub buffer_index: usize,
    /// Owning pool id (dense index into the pool engine's ID-ordered array).
    pub pool: u32,
    pub size: usize,
    pub offset: usize,
    pub flags: AllocationFlags,
    /// Matches the owning buffer's `serial` iff no write happened since the
    /// last refresh from this allocation.
    pub serial: u64,
    /// Which accessors have touched this allocation and how.
    pub accessed: Vec<(crate::types::Accessor, AccessFlags)>,
}

impl SurfaceAllocation {
    pub fn access_mask(&self, accessor: crate::types::Accessor) -> AccessFlags {
        self.accessed
            .iter()
            .find(|(a, _)| *a == accessor)
            .map(|(_, mask)| *mask)
            .unwrap_or(AccessFlags::NONE)
    }

    pub fn record_access(&mut self, accessor: crate::types::Accessor, mask: AccessFlags) {
        if let Some(entry) = self.accessed.iter_mut().find(|(a, _)| *a == accessor) {
            entry.1 |= mask;
        } else {
            self.accessed.push((accessor, mask));
        }
    }

    pub fn is_fresh(&self, buffer_serial: u64) -> bool {
        self.serial == buffer_serial
    }
}

/// One frame-worth of pixels at the logical level (spec §3). Owns its
/// allocations by id, exclusively: an allocation id never appears in two
/// buffers.
#[derive(Debug, Clone, Default)]
pub struct SurfaceBuffer {
    pub serial: u64,
    pub allocations: Vec<ObjectId>,
}

impl SurfaceBuffer {
    pub fn bump_serial(&mut self) {
        self.serial += 1;
    }
}

/// Logical 2D image (spec §3 "Surface"). Owns an ordered list of buffers
/// exclusively.
#[derive(Debug, Clone)]
pub struct Surface {
    pub description: SurfaceDescription,
    pub buffers: Vec<SurfaceBuffer>,
    /// Monotonically increasing; never decreases across the surface's life.
    pub flip_count: u64,
    pub last_frame: u64,
}

impl Surface {
    pub fn new(description: SurfaceDescription) -> Self {
        let buffer_count = if description.caps.contains(SurfaceCaps::TRIPLE_BUFFER) {
            3
        } else if description.caps.contains(SurfaceCaps::DOUBLE_BUFFER) {
            2
        } else {
            1
        };
        Self {
            description,
            buffers: (0..buffer_count).map(|_| SurfaceBuffer::default()).collect(),
            flip_count: 0,
            last_frame: 0,
        }
    }

    pub fn flip(&mut self, at_frame: u64) {
        self.flip_count += 1;
        self.last_frame = at_frame;
    }

    pub fn pitch(&self) -> usize {
        self.description.width as usize * self.description.format.bytes_per_pixel()
    }

    pub fn byte_size(&self) -> usize {
        self.pitch() * self.description.height as usize
    }

    /// Effective type mask consulted during negotiation (spec §4.2 step 1):
    /// system-only buffers are filtered to internal, video-only to
    /// external, otherwise the mask passes through unchanged. Internal and
    /// external bits are stripped from the declared mask before this
    /// filter, then re-applied.
    pub fn negotiation_type_mask(&self) -> TypeFlags {
        let declared = self.description.type_flags & !(TypeFlags::INTERNAL | TypeFlags::EXTERNAL);
        match self.description.policy {
            BufferPolicy::SystemOnly => declared | TypeFlags::INTERNAL,
            BufferPolicy::VideoOnly => declared | TypeFlags::EXTERNAL,
            BufferPolicy::Auto => declared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(caps: SurfaceCaps) -> SurfaceDescription {
        SurfaceDescription {
            width: 320,
            height: 240,
            format: PixelFormat::Argb8888,
            color_space: ColorSpace::Rgb,
            caps,
            type_flags: TypeFlags::WINDOW,
            policy: BufferPolicy::Auto,
        }
    }

    #[test]
    fn double_buffer_cap_allocates_two_buffers() {
        let surface = Surface::new(desc(SurfaceCaps::DOUBLE_BUFFER));
        assert_eq!(surface.buffers.len(), 2);
    }

    #[test]
    fn flip_count_is_monotonic() {
        let mut surface = Surface::new(desc(SurfaceCaps::NONE));
        surface.flip(1);
        surface.flip(2);
        assert_eq!(surface.flip_count, 2);
        assert_eq!(surface.last_frame, 2);
    }

    #[test]
    fn system_only_policy_forces_internal_bit() {
        let mut d = desc(SurfaceCaps::NONE);
        d.policy = BufferPolicy::SystemOnly;
        let surface = Surface::new(d);
        assert!(surface.negotiation_type_mask().contains(TypeFlags::INTERNAL));
        assert!(!surface.negotiation_type_mask().contains(TypeFlags::EXTERNAL));
    }
}
