//! Attachment bookkeeping for input devices, windows, and surfaces (spec
//! §4.5 "attach/detach for input devices, windows, and surfaces").
//!
//! Each attachment registers one reaction on a caller-owned
//! `gfx_ipc::Reactor<E>`; the buffer only keeps enough state to detach that
//! reaction later (or, for windows, to recognize it was already
//! self-removed on destroy and needs tombstone cleanup).

use gfx_ipc::ObjectId;

pub struct AttachedDevice {
    pub device_id: u32,
    pub reaction: ObjectId,
}

/// `window_id: None` marks a tombstoned entry: the window was destroyed
/// while attached and its reaction already self-unregistered (spec §4.5
/// "windows destroyed while attached are marked null inside the
/// reaction").
pub struct AttachedWindow {
    pub window_id: Option<u32>,
    pub reaction: ObjectId,
}

pub struct AttachedSurface {
    pub surface_id: u32,
    pub reaction: ObjectId,
}
