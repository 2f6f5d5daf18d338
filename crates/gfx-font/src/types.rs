//! Vocabulary shared by fonts, rows, and the cache keyed by pixel geometry.

use gfx_ipc::ObjectId;
use gfx_surface::{ColorSpace, PixelFormat, SurfaceCaps};

/// Identifies a font within a `FontManager`'s arena.
pub type FontId = ObjectId;

/// Fonts never share a row surface with fonts of a different pixel
/// geometry (spec §4.7: "fonts of equal pixel geometry").
pub const MAX_LAYERS: usize = 2;

/// Glyph indices below this are looked up via a direct-index array instead
/// of the per-layer hash (spec §4.7 "hot-path lookup").
pub const ASCII_FAST_PATH: u32 = 128;

/// Identifies which glyph-row cache a font's rendered glyphs belong in.
/// Two fonts with the same key may pack glyphs into the same rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub surface_caps: SurfaceCaps,
}

/// Static metrics describing a font (spec §4.7; mirrors the reference
/// system's font description plus the ascender/descender/maxadvance
/// triple read back off the loaded face).
#[derive(Debug, Clone, Copy)]
pub struct FontDescription {
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub color_space: ColorSpace,
    pub surface_caps: SurfaceCaps,
    pub ascender: i32,
    pub descender: i32,
    pub max_advance: i32,
}

impl FontDescription {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            height: self.height,
            pixel_format: self.pixel_format,
            surface_caps: self.surface_caps,
        }
    }
}
