//! Pixel and capability vocabulary shared by surfaces, buffers, and pools.

use bitflags::bitflags;

/// Longest name a pool may advertise in its description, matching the
/// reference implementation's fixed-size name field.
pub const POOL_NAME_MAX: usize = 44;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Argb8888,
    Rgb565,
    A8,
    Lut8,
    Yuy2,
}

impl PixelFormat {
    /// Bytes per pixel; used to derive pitch and allocation size.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Argb8888 => 4,
            PixelFormat::Rgb565 => 2,
            PixelFormat::A8 | PixelFormat::Lut8 => 1,
            PixelFormat::Yuy2 => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Rgb,
    YCbCr601,
    YCbCr709,
}

bitflags! {
    /// Surface-level capability flags (spec §3, "Surface" glossary entry).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SurfaceCaps: u32 {
        const NONE          = 0;
        const DOUBLE_BUFFER = 0b0000_0001;
        const TRIPLE_BUFFER = 0b0000_0010;
        const PREMULTIPLIED = 0b0000_0100;
        const SHARED        = 0b0000_1000;
        const VIDEO_ONLY    = 0b0001_0000;
        const SYSTEM_ONLY   = 0b0010_0000;
    }
}

bitflags! {
    /// Per-accessor access mask: which operations an accessor has performed
    /// or is permitted against an allocation (spec §4.3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessFlags: u32 {
        const NONE   = 0;
        const READ   = 0b01;
        const WRITE  = 0b10;
        const SHARED = 0b100;
    }
}

bitflags! {
    /// Surface/buffer type flags, consulted during pool negotiation (spec
    /// §4.2 step 1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeFlags: u32 {
        const NONE         = 0;
        const LAYER        = 0b0000_0001;
        const WINDOW       = 0b0000_0010;
        const CURSOR       = 0b0000_0100;
        const FONT         = 0b0000_1000;
        const SHARED       = 0b0001_0000;
        const INTERNAL     = 0b0010_0000;
        const EXTERNAL     = 0b0100_0000;
        const PREALLOCATED = 0b1000_0000;
    }
}

bitflags! {
    /// Declares which addressing styles and operations a pool supports; the
    /// Read/Write bits are auto-set by `initialize` if the corresponding
    /// callbacks are present (spec §4.2).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PoolCapabilities: u32 {
        const NONE     = 0;
        const PHYSICAL = 0b0001;
        const VIRTUAL  = 0b0010;
        const READ     = 0b0100;
        const WRITE    = 0b1000;
        const ALL = Self::PHYSICAL.bits() | Self::VIRTUAL.bits() | Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Identity of a consumer of pixel data, checked against a pool's
/// per-accessor access mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessor {
    Cpu,
    Gpu,
    Layer,
}

/// Relative standing of a pool during priority-ordered negotiation; ties
/// preserve registration (ID) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PoolPriority {
    Default,
    Prefered,
    Ultimate,
}

bitflags! {
    /// Per-allocation lifecycle flags (spec §3, "SurfaceAllocation").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AllocationFlags: u32 {
        const NONE        = 0;
        const VOLATILE    = 0b0001;
        const DEALLOCATED = 0b0010;
        const INITIALIZING = 0b0100;
        const MUCKOUT     = 0b1000;
    }
}

/// Buffer allocation policy; filters the effective type mask during
/// negotiation (spec §4.2 step 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferPolicy {
    SystemOnly,
    VideoOnly,
    Auto,
}
