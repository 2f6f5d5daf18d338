//! Upward notifications a window handle delivers to its owning façade
//! (spec §4.6 "setting a differently-sized shape... emits SIZE", "setting
//! a hot-spot emits POSITION", "the top-level façade is informed" on
//! focus change).
//!
//! This workspace has no surrounding desktop-toolkit façade to notify (out
//! of scope per spec §1), so `WindowSink` is the seam a real façade would
//! implement; [`TracingSink`] is a minimal reference implementation that
//! just logs, enough to exercise and test the handle's own logic.

use tracing::debug;

pub trait WindowSink: Send {
    fn size_changed(&mut self, width: u32, height: u32);
    fn position_changed(&mut self, x: i32, y: i32);
    fn focus_changed(&mut self, focused: bool);
}

#[derive(Debug, Default)]
pub struct TracingSink;

impl WindowSink for TracingSink {
    fn size_changed(&mut self, width: u32, height: u32) {
        debug!(width, height, "cursor SIZE");
    }

    fn position_changed(&mut self, x: i32, y: i32) {
        debug!(x, y, "cursor POSITION");
    }

    fn focus_changed(&mut self, focused: bool) {
        debug!(focused, "window focus changed");
    }
}
