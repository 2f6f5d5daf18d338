//! Glyph-row cache for one `(height, pixel_format, surface_caps)` key,
//! shared by every font with that geometry (spec §4.7).

use std::collections::HashMap;

use gfx_ipc::ObjectId;
use gfx_surface::{AccessFlags, Accessor, BufferPolicy, SurfaceDescription, SurfaceDomain, TypeFlags};

use crate::error::{FontError, FontResult};
use crate::row::{Row, ROW_WIDTH};
use crate::types::CacheKey;

pub struct GlyphCache {
    pub key: CacheKey,
    /// Keyed by each row's surface id, which also doubles as the row's
    /// identity inside `GlyphRecord::row`.
    pub rows: HashMap<ObjectId, Row>,
}

impl GlyphCache {
    pub fn new(key: CacheKey) -> Self {
        Self { key, rows: HashMap::new() }
    }

    /// Finds room for a glyph of the given width, packing into an existing
    /// row when one has space left, otherwise allocating a new row surface.
    /// Touches the chosen row's LRU stamp.
    pub fn place(&mut self, domain: &mut SurfaceDomain, width: u32, clock: u64) -> FontResult<(ObjectId, u32)> {
        if width > ROW_WIDTH {
            return Err(FontError::InvArg("glyph wider than a cache row"));
        }

        if let Some((&row_id, row)) = self.rows.iter_mut().find(|(_, r)| r.remaining() >= width) {
            let start = row.used;
            row.used += width;
            row.last_used = clock;
            return Ok((row_id, start));
        }

        let description = SurfaceDescription {
            width: ROW_WIDTH,
            height: self.key.height,
            format: self.key.pixel_format,
            color_space: gfx_surface::ColorSpace::Rgb,
            caps: self.key.surface_caps,
            type_flags: TypeFlags::FONT,
            policy: BufferPolicy::Auto,
        };
        let surface = domain.create_surface(description);
        let alloc = domain.allocate(surface, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE)?;

        let row = Row {
            surface,
            alloc,
            width: ROW_WIDTH,
            height: self.key.height,
            used: width,
            last_used: clock,
            glyphs: Vec::new(),
        };
        self.rows.insert(surface, row);
        Ok((surface, 0))
    }

    /// Picks the row with the smallest `last_used` stamp, if any.
    pub fn lru_candidate(&self) -> Option<(ObjectId, u64)> {
        self.rows.values().map(|r| (r.surface, r.last_used)).min_by_key(|(_, stamp)| *stamp)
    }

    pub fn touch(&mut self, row_id: ObjectId, clock: u64) {
        if let Some(row) = self.rows.get_mut(&row_id) {
            row.last_used = clock;
        }
    }
}
