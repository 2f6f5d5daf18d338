//! `WindowHandle`: the public per-window façade (spec §4.6).
//!
//! Forwards configuration to the WM via the owning [`WindowStack`]'s
//! property calls, owns the per-handle `cursor_flags`, and drives cursor
//! shape creation/resizing — the one piece of surface management §4.4
//! deliberately left out of `gfx-windowstack::Cursor` ("actual shape
//! surface creation belongs to the window façade").

use std::sync::{Arc, Mutex};

use gfx_primitives::Rectangle;
use gfx_surface::{AccessFlags, Accessor, ColorSpace, PixelFormat, SurfaceCaps, SurfaceDescription, SurfaceDomain, TypeFlags};
use gfx_windowstack::{StackResult, WindowStack};
use tracing::{debug, instrument};

use crate::error::{WindowError, WindowResult};
use crate::pixels::premultiply_argb8888;
use crate::sink::WindowSink;
use crate::types::{CursorFlags, ShapeBitmap};

struct WindowState {
    cursor_flags: CursorFlags,
    shape_dims: Option<(u32, u32)>,
    opacity: u8,
    focused: bool,
}

/// A ref-counted handle to one window within a [`WindowStack`]: the
/// `Arc<Mutex<_>>` on the stack is shared across every window living on
/// it, mirroring the stack's own registration in
/// [`gfx_windowstack::StackRegistry`].
pub struct WindowHandle {
    stack: Arc<Mutex<WindowStack>>,
    window_id: u32,
    sink: Box<dyn WindowSink>,
    state: Mutex<WindowState>,
}

impl WindowHandle {
    pub fn new(stack: Arc<Mutex<WindowStack>>, window_id: u32, sink: Box<dyn WindowSink>) -> Self {
        Self {
            stack,
            window_id,
            sink,
            state: Mutex::new(WindowState {
                cursor_flags: CursorFlags::NONE,
                shape_dims: None,
                opacity: 0xff,
                focused: false,
            }),
        }
    }

    pub fn window_id(&self) -> u32 {
        self.window_id
    }

    /// Cursor visibility is (shape present) ∧ ¬INVISIBLE (spec §4.6).
    pub fn is_cursor_visible(&self) -> bool {
        let state = self.state.lock().expect("window handle poisoned");
        state.shape_dims.is_some() && !state.cursor_flags.contains(CursorFlags::INVISIBLE)
    }

    pub fn cursor_flags(&self) -> CursorFlags {
        self.state.lock().expect("window handle poisoned").cursor_flags
    }

    /// Installs (or replaces) the cursor shape. Creating a shape where none
    /// existed allocates a new ARGB, premultiplied cursor surface; replacing
    /// a differently-sized shape resizes the surface and reports `SIZE`
    /// through the sink; same-size replacement just rewrites the pixels
    /// (spec §4.6).
    #[instrument(skip(self, domain, bitmap))]
    pub fn set_cursor_shape(&mut self, domain: &mut SurfaceDomain, bitmap: &ShapeBitmap, premultiply: bool) -> WindowResult<()> {
        if bitmap.pixels.len() != bitmap.byte_size() {
            return Err(WindowError::InvArg("shape bitmap pixel buffer does not match width*height*4"));
        }
        if self.stack.lock().expect("window stack poisoned").is_destroyed() {
            return Err(WindowError::Destroyed);
        }

        let mut pixels = bitmap.pixels.clone();
        if premultiply {
            premultiply_argb8888(&mut pixels);
        }

        let mut state = self.state.lock().expect("window handle poisoned");
        let previous_dims = state.shape_dims;
        let rect = Rectangle::new(0, 0, bitmap.width as i32, bitmap.height as i32);

        if previous_dims == Some((bitmap.width, bitmap.height)) {
            let alloc = self
                .stack
                .lock()
                .expect("window stack poisoned")
                .cursor_allocation()
                .ok_or(WindowError::InvArg("cursor marked shaped but has no allocation"))?;
            domain.write_rect(alloc, rect, &pixels)?;
            state.cursor_flags.remove(CursorFlags::INVISIBLE);
            return Ok(());
        }

        let policy = self.stack.lock().expect("window stack poisoned").cursor().policy;
        let description = SurfaceDescription {
            width: bitmap.width,
            height: bitmap.height,
            format: PixelFormat::Argb8888,
            color_space: ColorSpace::Rgb,
            caps: SurfaceCaps::PREMULTIPLIED,
            type_flags: TypeFlags::CURSOR,
            policy,
        };
        let surface = domain.create_surface(description);
        let allocation = domain.allocate(surface, 0, Accessor::Cpu, AccessFlags::READ | AccessFlags::WRITE)?;
        domain.write_rect(allocation, rect, &pixels)?;

        let old_allocation = {
            let mut stack = self.stack.lock().expect("window stack poisoned");
            let old = stack.cursor_allocation();
            stack.install_cursor_shape(surface, allocation);
            old
        };
        if let Some(old) = old_allocation {
            let _ = domain.deallocate(old);
        }

        let created = previous_dims.is_none();
        state.shape_dims = Some((bitmap.width, bitmap.height));
        state.cursor_flags.remove(CursorFlags::INVISIBLE);
        drop(state);

        if !created {
            self.sink.size_changed(bitmap.width, bitmap.height);
        }
        debug!(width = bitmap.width, height = bitmap.height, created, "cursor shape installed");
        Ok(())
    }

    /// Clears the cursor shape, setting `INVISIBLE` (spec §4.6 "If the
    /// handle previously cleared the shape ... the config gains
    /// INVISIBLE").
    pub fn clear_cursor_shape(&mut self, domain: &mut SurfaceDomain) {
        let mut state = self.state.lock().expect("window handle poisoned");
        let old_allocation = self.stack.lock().expect("window stack poisoned").clear_cursor_shape();
        if let Some(old) = old_allocation {
            let _ = domain.deallocate(old);
        }
        state.shape_dims = None;
        state.cursor_flags.insert(CursorFlags::INVISIBLE);
    }

    /// Sets the cursor hot-spot, reporting `POSITION` through the sink
    /// (spec §4.6 "setting a hot-spot emits POSITION").
    pub fn set_cursor_hot_spot(&mut self, x: i32, y: i32) {
        self.stack.lock().expect("window stack poisoned").set_cursor_hot_spot(x, y);
        self.sink.position_changed(x, y);
    }

    pub fn set_cursor_opacity(&mut self, opacity: u8) {
        self.state.lock().expect("window handle poisoned").opacity = opacity;
        self.stack.lock().expect("window stack poisoned").set_cursor_opacity(opacity);
    }

    /// Informs the top-level façade of a focus transition (spec §4.6
    /// "Focus: on GOTFOCUS / LOSTFOCUS, the top-level façade is informed").
    pub fn set_focused(&mut self, focused: bool) {
        let mut state = self.state.lock().expect("window handle poisoned");
        if state.focused == focused {
            return;
        }
        state.focused = focused;
        drop(state);
        self.sink.focus_changed(focused);
    }

    pub fn is_focused(&self) -> bool {
        self.state.lock().expect("window handle poisoned").focused
    }

    /// Forwards configuration to the WM (spec §4.6 "forwards all
    /// configuration to the WM").
    pub fn get_property(&self, name: &str) -> Option<String> {
        self.stack.lock().expect("window stack poisoned").get_property(name)
    }

    pub fn set_property(&mut self, name: &str, value: &str) -> StackResult<()> {
        self.stack.lock().expect("window stack poisoned").set_property(name, value)
    }

    pub fn remove_property(&mut self, name: &str) -> StackResult<()> {
        self.stack.lock().expect("window stack poisoned").remove_property(name)
    }
}
