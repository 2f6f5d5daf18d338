//! Glyph records and the glyph-source ABI.
//!
//! Rasterizing a glyph from a font file is explicitly out of scope (spec
//! §1 Non-goals: "font file decoders ... consume surface-creation calls");
//! `GlyphSource` is the collaborator boundary a decoder plugs into, mirroring
//! the reference system's `GetCharacterIndex`/`RenderGlyph`/`GetKerning`
//! callback table.

use gfx_ipc::ObjectId;

use crate::error::FontResult;
use crate::types::FontId;

/// Identifies a glyph owned by some font's layer, packed into a row; used to
/// reverse a row eviction back to the cache entries it must invalidate.
#[derive(Debug, Clone, Copy)]
pub struct GlyphOwner {
    pub font: FontId,
    pub layer: usize,
    pub index: u32,
}

/// A decoded glyph bitmap handed to the cache for packing. `pixels` is a
/// tightly packed `width * height` buffer in the owning cache's pixel
/// format.
#[derive(Debug, Clone)]
pub struct RenderedGlyph {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    pub xadvance: i32,
    pub yadvance: i32,
    pub pixels: Vec<u8>,
}

/// Collaborator supplying glyph bitmaps and character-to-index mapping;
/// a font file decoder implements this (spec §1, §4.7).
pub trait GlyphSource: Send + Sync {
    fn character_index(&self, character: u32) -> FontResult<u32>;

    fn render_glyph(&self, index: u32) -> FontResult<RenderedGlyph>;

    fn kerning(&self, _prev: u32, _current: u32) -> (i32, i32) {
        (0, 0)
    }
}

/// A cached glyph's placement within a shared row surface (spec §4.7).
#[derive(Debug, Clone, Copy)]
pub struct GlyphRecord {
    pub index: u32,
    pub layer: usize,
    /// The row surface this glyph's pixels live in, also the key used to
    /// find the owning row inside its `GlyphCache`.
    pub row: ObjectId,
    pub start: u32,
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    pub xadvance: i32,
    pub yadvance: i32,
}
