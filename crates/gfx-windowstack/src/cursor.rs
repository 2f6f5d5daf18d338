//! Cursor subsystem: surface, hot-spot, opacity, acceleration (spec §4.4
//! "create" defaults, §4.6 cursor/shape rules).

use gfx_ipc::ObjectId;
use gfx_primitives::Rectangle;
use gfx_surface::BufferPolicy;

/// Acceleration curve applied to relative pointer motion before it reaches
/// the WM (spec §4.4 "create": "initializes cursor defaults (acceleration
/// 2/1, threshold 4)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorAcceleration {
    pub numerator: u32,
    pub denominator: u32,
    pub threshold: u32,
}

impl Default for CursorAcceleration {
    fn default() -> Self {
        Self { numerator: 2, denominator: 1, threshold: 4 }
    }
}

/// Per-stack cursor state. The shape surface itself is created lazily by
/// the window façade (spec §4.6: "setting a shape when none existed
/// creates a shape-sized cursor surface"); the stack only owns the
/// acceleration curve, clip region, and visibility/opacity that apply
/// regardless of whether a shape is currently set.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub surface: Option<ObjectId>,
    /// The shape surface's backing allocation, so the stack can release it
    /// on destroy. Shape creation/resize itself belongs to the window
    /// façade (spec §4.6); the stack only owns this bookkeeping.
    pub allocation: Option<ObjectId>,
    pub hot_spot: (i32, i32),
    pub opacity: u8,
    pub acceleration: CursorAcceleration,
    pub clip: Rectangle,
    pub policy: BufferPolicy,
    /// `true` unless the shape was explicitly cleared (spec §4.6: "If the
    /// handle previously cleared the shape ... the config gains INVISIBLE").
    pub visible: bool,
}

impl Cursor {
    pub fn new(width: u32, height: u32, policy: BufferPolicy) -> Self {
        Self {
            surface: None,
            allocation: None,
            hot_spot: (0, 0),
            opacity: 0xff,
            acceleration: CursorAcceleration::default(),
            clip: Rectangle::new(0, 0, width as i32, height as i32),
            policy,
            visible: true,
        }
    }

    pub fn reset_clip(&mut self, width: u32, height: u32) {
        self.clip = Rectangle::new(0, 0, width as i32, height as i32);
    }

    /// Cursor visibility is the interaction of (shape present) and not
    /// invisible (spec §4.6).
    pub fn is_visible(&self) -> bool {
        self.surface.is_some() && self.visible
    }

    pub fn set_shape(&mut self, surface: ObjectId, allocation: ObjectId) {
        self.surface = Some(surface);
        self.allocation = Some(allocation);
        self.visible = true;
    }

    pub fn clear_shape(&mut self) {
        self.surface = None;
        self.allocation = None;
        self.visible = false;
    }

    pub fn set_hot_spot(&mut self, x: i32, y: i32) {
        self.hot_spot = (x, y);
    }

    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity;
    }
}
