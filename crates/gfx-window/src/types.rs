//! Per-handle window configuration vocabulary (spec §4.6).

use bitflags::bitflags;

bitflags! {
    /// Per-window cursor configuration bits (spec §4.6: "maintains a
    /// per-handle `cursor_flags`"). `INVISIBLE` is set whenever the handle
    /// has explicitly cleared its shape and cleared again the moment a new
    /// shape is installed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CursorFlags: u32 {
        const NONE      = 0;
        const INVISIBLE = 0b1;
    }
}

/// A raw, straight-alpha ARGB8888 cursor shape buffer, as supplied by a
/// window before premultiplication (spec §4.6 "the cursor content is
/// copied with premultiply if needed").
#[derive(Debug, Clone)]
pub struct ShapeBitmap {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, row-major ARGB8888.
    pub pixels: Vec<u8>,
}

impl ShapeBitmap {
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}
