//! Input/dispatch vocabulary for the window stack (spec §4.4).

use bitflags::bitflags;
use gfx_primitives::BlitFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// How a display layer is rotated; drives the stack's blit-symmetry flag
/// (spec §4.4 "resize": "R0→NOFX, R90→R90, R180→R180, R270→R270").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn blit_flags(self) -> BlitFlags {
        match self {
            Rotation::R0 => BlitFlags::NOFX,
            Rotation::R90 => BlitFlags::ROTATE90,
            Rotation::R180 => BlitFlags::FLIP_HORIZONTAL | BlitFlags::FLIP_VERTICAL,
            Rotation::R270 => BlitFlags::ROTATE90 | BlitFlags::FLIP_HORIZONTAL | BlitFlags::FLIP_VERTICAL,
        }
    }
}

bitflags! {
    /// Per-event dispatch flags; `FOLLOW` marks the first half of a
    /// coalesced axis pair (spec §4.4 "flush").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InputEventFlags: u32 {
        const NONE   = 0;
        const FOLLOW = 0b01;
    }
}

/// Raw input as received from a device, before coalescing (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    Axis { axis: Axis, value: i32, absolute: bool },
    Button { code: u32, pressed: bool },
    Key { code: u32, pressed: bool },
}

/// What the stack hands to the WM plugin after coalescing (spec §4.4, §6
/// "WM plugin ABI": `process_input`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEvent {
    AxisMotion { device_id: u32, axis: Axis, axisrel: i32, flags: InputEventFlags },
    Button { device_id: u32, code: u32, pressed: bool },
    Key { device_id: u32, code: u32, pressed: bool },
}
