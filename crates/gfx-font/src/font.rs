//! A font's per-layer glyph lookup tables (spec §4.7).

use std::collections::HashMap;

use crate::glyph::GlyphRecord;
use crate::types::{FontDescription, ASCII_FAST_PATH, MAX_LAYERS};

pub(crate) struct FontLayer {
    pub ascii: Box<[Option<GlyphRecord>; ASCII_FAST_PATH as usize]>,
    pub hash: HashMap<u32, GlyphRecord>,
}

impl Default for FontLayer {
    fn default() -> Self {
        Self {
            ascii: Box::new([None; ASCII_FAST_PATH as usize]),
            hash: HashMap::new(),
        }
    }
}

impl FontLayer {
    pub fn get(&self, index: u32) -> Option<GlyphRecord> {
        if index < ASCII_FAST_PATH {
            self.ascii[index as usize]
        } else {
            self.hash.get(&index).copied()
        }
    }

    pub fn insert(&mut self, index: u32, record: GlyphRecord) {
        if index < ASCII_FAST_PATH {
            self.ascii[index as usize] = Some(record);
        } else {
            self.hash.insert(index, record);
        }
    }

    pub fn remove(&mut self, index: u32) {
        if index < ASCII_FAST_PATH {
            self.ascii[index as usize] = None;
        } else {
            self.hash.remove(&index);
        }
    }
}

pub struct Font {
    pub description: FontDescription,
    pub(crate) layers: [FontLayer; MAX_LAYERS],
}

impl Font {
    pub fn new(description: FontDescription) -> Self {
        Self {
            description,
            layers: [FontLayer::default(), FontLayer::default()],
        }
    }

    pub fn cache_key(&self) -> crate::types::CacheKey {
        self.description.cache_key()
    }

    /// Whether `index` is currently cached in `layer`, without triggering a
    /// render. Exposed mainly so callers (and tests) can observe eviction.
    pub fn cached_glyph(&self, layer: usize, index: u32) -> Option<GlyphRecord> {
        self.layers.get(layer)?.get(index)
    }
}
