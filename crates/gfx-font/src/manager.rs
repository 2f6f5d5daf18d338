//! Font manager: owns every font and the glyph-row caches they share,
//! and drives row-granularity LRU eviction (spec §4.7).

use std::collections::HashMap;

use tracing::{debug, trace};

use gfx_ipc::IdTable;
use gfx_surface::SurfaceDomain;

use crate::cache::GlyphCache;
use crate::error::{FontError, FontResult};
use crate::font::Font;
use crate::glyph::{GlyphOwner, GlyphRecord, GlyphSource, RenderedGlyph};
use crate::types::{CacheKey, FontDescription, FontId, MAX_LAYERS};

pub struct FontManager {
    fonts: IdTable<Font>,
    caches: HashMap<CacheKey, GlyphCache>,
    /// Monotonic counter bumped on every row touch; stands in for a
    /// timestamp so LRU comparisons stay deterministic in tests.
    clock: u64,
}

impl FontManager {
    pub fn new() -> Self {
        Self {
            fonts: IdTable::new(),
            caches: HashMap::new(),
            clock: 0,
        }
    }

    pub fn create_font(&mut self, description: FontDescription) -> FontId {
        self.fonts.insert(Font::new(description))
    }

    pub fn font(&self, id: FontId) -> Option<&Font> {
        self.fonts.get(id)
    }

    /// Drops the font record. Row surfaces it was packed into are left
    /// alone (they may still serve other fonts of the same geometry); stale
    /// `GlyphOwner` entries referencing this font are skipped harmlessly by
    /// `remove_lru_row` once `self.fonts.get` misses.
    pub fn destroy_font(&mut self, id: FontId) -> FontResult<()> {
        self.fonts.remove(id).ok_or(FontError::InvArg("unknown font id"))?;
        Ok(())
    }

    /// Looks up or renders and caches the glyph for `index` in `layer`
    /// (spec §4.7: ASCII fast path, then per-layer hash, then render +
    /// pack into the geometry-keyed row cache).
    pub fn glyph_data(
        &mut self,
        domain: &mut SurfaceDomain,
        font_id: FontId,
        source: &dyn GlyphSource,
        layer: usize,
        index: u32,
    ) -> FontResult<GlyphRecord> {
        if layer >= MAX_LAYERS {
            return Err(FontError::InvalidLayer);
        }

        let key = self.fonts.get(font_id).ok_or(FontError::InvArg("unknown font id"))?.cache_key();

        if let Some(record) = self.fonts.get(font_id).and_then(|f| f.layers[layer].get(index)) {
            self.clock += 1;
            if let Some(cache) = self.caches.get_mut(&key) {
                cache.touch(record.row, self.clock);
            }
            trace!(font = %font_id, layer, index, "glyph cache hit");
            return Ok(record);
        }

        let rendered = source.render_glyph(index)?;
        let record = self.place_and_insert(domain, font_id, key, layer, index, &rendered)?;
        Ok(record)
    }

    fn place_and_insert(
        &mut self,
        domain: &mut SurfaceDomain,
        font_id: FontId,
        key: CacheKey,
        layer: usize,
        index: u32,
        rendered: &RenderedGlyph,
    ) -> FontResult<GlyphRecord> {
        self.clock += 1;
        let clock = self.clock;
        let cache = self.caches.entry(key).or_insert_with(|| GlyphCache::new(key));

        let placement = match cache.place(domain, rendered.width, clock) {
            Ok(p) => p,
            Err(FontError::Pool) => {
                self.remove_lru_row(domain)?;
                self.caches.get_mut(&key).expect("just inserted").place(domain, rendered.width, clock)?
            }
            Err(other) => return Err(other),
        };
        let (row_id, start) = placement;

        let alloc = {
            let cache = self.caches.get(&key).expect("present");
            cache.rows.get(&row_id).expect("just placed").alloc
        };
        let rect = gfx_primitives::Rectangle::new(start as i32, 0, rendered.width as i32, rendered.height as i32);
        domain.write_rect(alloc, rect, &rendered.pixels)?;

        let record = GlyphRecord {
            index,
            layer,
            row: row_id,
            start,
            width: rendered.width,
            height: rendered.height,
            left: rendered.left,
            top: rendered.top,
            xadvance: rendered.xadvance,
            yadvance: rendered.yadvance,
        };

        self.caches
            .get_mut(&key)
            .expect("present")
            .rows
            .get_mut(&row_id)
            .expect("just placed")
            .glyphs
            .push(GlyphOwner { font: font_id, layer, index });

        self.fonts.get_mut(font_id).expect("checked by caller").layers[layer].insert(index, record);
        debug!(font = %font_id, layer, index, row = %row_id, start, "glyph rendered and cached");
        Ok(record)
    }

    /// Evicts the globally least-recently-used row across every cache (spec
    /// §4.7 "remove_lru_row"), invalidating every font's cache entry that
    /// referenced it.
    pub fn remove_lru_row(&mut self, domain: &mut SurfaceDomain) -> FontResult<()> {
        let mut best: Option<(CacheKey, gfx_ipc::ObjectId, u64)> = None;
        for (key, cache) in &self.caches {
            if let Some((row_id, stamp)) = cache.lru_candidate() {
                if best.as_ref().map(|(_, _, b)| stamp < *b).unwrap_or(true) {
                    best = Some((*key, row_id, stamp));
                }
            }
        }

        let (key, row_id, _) = best.ok_or(FontError::RowCacheExhausted)?;
        let cache = self.caches.get_mut(&key).expect("present");
        let row = cache.rows.remove(&row_id).expect("present");

        domain.deallocate(row.alloc)?;
        for owner in &row.glyphs {
            if let Some(font) = self.fonts.get_mut(owner.font) {
                font.layers[owner.layer].remove(owner.index);
            }
        }
        debug!(row = %row_id, evicted = row.glyphs.len(), "evicted LRU glyph row");
        Ok(())
    }
}

impl Default for FontManager {
    fn default() -> Self {
        Self::new()
    }
}
