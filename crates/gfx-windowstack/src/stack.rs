//! The window stack itself: lifecycle, device attach/detach, pointer-motion
//! coalescing wiring, layer-context refcounting, and the background-image
//! reaction (spec §4.4).

use std::sync::{Arc, Mutex, Weak};

use gfx_ipc::{DispatchCleanupQueue, ObjectId, ReactionResult, Reactor};
use gfx_primitives::Rectangle;
use gfx_surface::BufferPolicy;
use tracing::{debug, error, instrument, trace, warn};

use crate::coalesce::MotionCoalescer;
use crate::cursor::Cursor;
use crate::error::{StackError, StackResult};
use crate::registry::{LayerContext, StackRegistry};
use crate::types::{RawInput, Rotation, StackEvent};

/// The WM plugin ABI a stack delegates configuration, input routing, and
/// repaint to (spec §6 "WM plugin ABI").
pub trait WmStack: Send {
    fn init_stack(&mut self) -> StackResult<()>;
    fn close_stack(&mut self);
    fn resize_stack(&mut self, width: u32, height: u32, flags: gfx_primitives::BlitFlags);
    fn update_stack(&mut self, dirty: Rectangle);
    fn update_cursor(&mut self, cursor: &Cursor);
    fn process_input(&mut self, event: StackEvent);
    fn get_property(&self, name: &str) -> Option<String>;
    fn set_property(&mut self, name: &str, value: &str) -> StackResult<()>;
    fn remove_property(&mut self, name: &str) -> StackResult<()>;
}

/// Reactions a background-image surface can deliver to its owning stack
/// (spec §4.4 "Background image reaction").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundEvent {
    SizeFormat,
    Flip,
    Destroy,
}

/// Inputs to [`WindowStack::create`] (spec §4.4 "create(context)").
pub struct StackContext {
    pub width: u32,
    pub height: u32,
    pub buffer_mode: BufferPolicy,
    pub gpu_blit_capable: bool,
    pub initial_devices: Vec<u32>,
}

/// Picks an initial cursor surface policy from buffer mode and GPU
/// capability (spec §4.4 "create": "chooses an initial cursor surface
/// policy from buffer-mode and GPU capability").
fn choose_cursor_policy(buffer_mode: BufferPolicy, gpu_blit_capable: bool) -> BufferPolicy {
    match buffer_mode {
        BufferPolicy::SystemOnly => BufferPolicy::SystemOnly,
        BufferPolicy::VideoOnly | BufferPolicy::Auto => {
            if gpu_blit_capable {
                BufferPolicy::VideoOnly
            } else {
                BufferPolicy::SystemOnly
            }
        }
    }
}

pub struct WindowStack {
    pub width: u32,
    pub height: u32,
    pub rotation: Rotation,
    pub cursor: Cursor,
    pub context: Arc<LayerContext>,
    devices: Vec<u32>,
    coalescer: MotionCoalescer,
    cleanup: Arc<DispatchCleanupQueue>,
    cleanup_pending: bool,
    deferred_exits: u32,
    lock: gfx_ipc::Skirmish,
    wm: Box<dyn WmStack>,
    destroyed: bool,
    background_reaction: Option<ObjectId>,
    self_weak: Weak<Mutex<WindowStack>>,
}

impl WindowStack {
    /// Allocates the stack, initializes cursor defaults and WM, attaches to
    /// every currently enumerated device, then registers itself in the
    /// process-wide stack list (spec §4.4 "create(context)").
    #[instrument(skip(ctx, wm, registry, cleanup))]
    pub fn create(
        ctx: StackContext,
        mut wm: Box<dyn WmStack>,
        registry: &StackRegistry,
        cleanup: Arc<DispatchCleanupQueue>,
    ) -> StackResult<Arc<Mutex<Self>>> {
        wm.init_stack()?;
        let policy = choose_cursor_policy(ctx.buffer_mode, ctx.gpu_blit_capable);

        let stack = Arc::new_cyclic(|weak| {
            Mutex::new(Self {
                width: ctx.width,
                height: ctx.height,
                rotation: Rotation::R0,
                cursor: Cursor::new(ctx.width, ctx.height, policy),
                context: LayerContext::new(),
                devices: Vec::new(),
                coalescer: MotionCoalescer::new(),
                cleanup,
                cleanup_pending: false,
                deferred_exits: 0,
                lock: gfx_ipc::Skirmish::new(),
                wm,
                destroyed: false,
                background_reaction: None,
                self_weak: weak.clone(),
            })
        });

        {
            let mut guard = stack.lock().expect("window stack poisoned");
            for device_id in &ctx.initial_devices {
                guard.attach_device(*device_id);
            }
        }
        registry.register(&stack);
        debug!(width = ctx.width, height = ctx.height, "window stack created");
        Ok(stack)
    }

    pub fn attach_device(&mut self, device_id: u32) {
        let _guard = self.lock.lock();
        if self.devices.contains(&device_id) {
            return;
        }
        self.devices.push(device_id);
        trace!(device_id, "device attached to stack");
    }

    pub fn detach_device(&mut self, device_id: u32) {
        let _guard = self.lock.lock();
        self.devices.retain(|d| *d != device_id);
        trace!(device_id, "device detached from stack");
    }

    pub fn devices(&self) -> &[u32] {
        &self.devices
    }

    /// Updates dimensions and rotation; resets cursor clipping to the new
    /// bounds and notifies the WM (spec §4.4 "resize(w,h,rot)").
    #[instrument(skip(self))]
    pub fn resize(&mut self, width: u32, height: u32, rotation: Rotation) {
        let _guard = self.lock.lock();
        self.width = width;
        self.height = height;
        self.rotation = rotation;
        self.cursor.reset_clip(width, height);
        self.wm.resize_stack(width, height, rotation.blit_flags());
        debug!(width, height, ?rotation, "window stack resized");
    }

    /// Feeds one device's raw input through the motion coalescer and
    /// dispatches whatever is ready to the WM, registering a one-shot
    /// dispatch-cleanup flush if motion remains pending (spec §4.4
    /// "Pointer-motion coalescing", "Layer context reference counting").
    pub fn dispatch_input(&mut self, device_id: u32, input: RawInput, now_ms: u64) -> StackResult<()> {
        let _guard = self.lock.lock();
        if self.destroyed {
            return Err(StackError::Destroyed);
        }
        if !self.devices.contains(&device_id) {
            return Err(StackError::IdNotFound);
        }
        if !self.context.enter() {
            warn!(device_id, "layer context already torn down, dropping input");
            return Err(StackError::Destroyed);
        }

        let ready = self.coalescer.feed(device_id, input, now_ms);
        for event in ready {
            self.wm.process_input(event);
        }

        if self.coalescer.has_pending() {
            self.deferred_exits += 1;
            if !self.cleanup_pending {
                self.cleanup_pending = true;
                self.schedule_cleanup();
            }
        } else {
            self.context.exit();
        }

        Ok(())
    }

    fn schedule_cleanup(&self) {
        let weak = self.self_weak.clone();
        self.cleanup.register(move || {
            let Some(stack) = weak.upgrade() else { return };
            let mut stack = stack.lock().expect("window stack poisoned");
            stack.flush_motion();
        });
    }

    /// Flushes any pending coalesced motion and releases every context
    /// reference deferred while it was pending (spec §4.4 "Flush happens
    /// also on dispatch-cleanup").
    fn flush_motion(&mut self) {
        let _guard = self.lock.lock();
        let events = self.coalescer.flush();
        for event in events {
            self.wm.process_input(event);
        }
        self.cleanup_pending = false;
        for _ in 0..std::mem::take(&mut self.deferred_exits) {
            self.context.exit();
        }
    }

    /// Registers a background-image reaction: repaint on `SizeFormat`/
    /// `Flip`, unregister-and-log on `Destroy` (spec §4.4 "Background image
    /// reaction").
    pub fn attach_background(stack: &Arc<Mutex<WindowStack>>, reactor: &Reactor<BackgroundEvent>) {
        let weak = Arc::downgrade(stack);
        let id = reactor.attach(move |event| {
            let Some(stack) = weak.upgrade() else { return ReactionResult::Remove };
            let mut stack = stack.lock().expect("window stack poisoned");
            match event {
                BackgroundEvent::SizeFormat | BackgroundEvent::Flip => {
                    stack.request_repaint();
                    ReactionResult::Continue
                }
                BackgroundEvent::Destroy => {
                    error!("background image destroyed while attached to stack");
                    ReactionResult::Remove
                }
            }
        });
        stack.lock().expect("window stack poisoned").background_reaction = Some(id);
    }

    fn request_repaint(&mut self) {
        let dirty = Rectangle::new(0, 0, self.width as i32, self.height as i32);
        self.wm.update_stack(dirty);
    }

    /// Unlinks the cursor surface, closes the WM, detaches the background
    /// reaction (if any), and marks the layer context torn down so any
    /// in-flight reaction chain unregisters itself (spec §4.4 "destroy").
    pub fn destroy(&mut self, domain: &mut gfx_surface::SurfaceDomain, background_reactor: Option<&Reactor<BackgroundEvent>>) {
        if self.destroyed {
            return;
        }
        if let Some(alloc) = self.cursor.allocation.take() {
            if let Err(err) = domain.deallocate(alloc) {
                warn!(?err, "failed to release cursor allocation on destroy");
            }
        }
        self.cursor.surface = None;

        self.wm.close_stack();

        if let (Some(id), Some(reactor)) = (self.background_reaction.take(), background_reactor) {
            reactor.detach(id);
        }

        self.context.mark_destroyed();
        self.destroyed = true;
        debug!("window stack destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// The shape surface's current backing allocation, if any; the window
    /// façade reads this before replacing a shape so it can release the old
    /// allocation itself (spec §4.6 "setting a differently-sized shape
    /// resizes the surface").
    pub fn cursor_allocation(&self) -> Option<ObjectId> {
        self.cursor.allocation
    }

    /// Installs a newly created (or resized) cursor shape surface and
    /// notifies the WM (spec §4.6). The caller is responsible for creating
    /// the surface/allocation and releasing any previous one; the stack
    /// only owns the bookkeeping and the WM notification.
    pub fn install_cursor_shape(&mut self, surface: ObjectId, allocation: ObjectId) {
        let _guard = self.lock.lock();
        self.cursor.set_shape(surface, allocation);
        self.wm.update_cursor(&self.cursor);
    }

    /// Clears the cursor shape (spec §4.6 "setting it to NULL"), returning
    /// the allocation that was released so the caller can deallocate it.
    pub fn clear_cursor_shape(&mut self) -> Option<ObjectId> {
        let _guard = self.lock.lock();
        let old = self.cursor.allocation.take();
        self.cursor.clear_shape();
        self.wm.update_cursor(&self.cursor);
        old
    }

    pub fn set_cursor_hot_spot(&mut self, x: i32, y: i32) {
        let _guard = self.lock.lock();
        self.cursor.set_hot_spot(x, y);
        self.wm.update_cursor(&self.cursor);
    }

    pub fn set_cursor_opacity(&mut self, opacity: u8) {
        let _guard = self.lock.lock();
        self.cursor.set_opacity(opacity);
        self.wm.update_cursor(&self.cursor);
    }

    /// Forwards configuration to the WM plugin (spec §4.6 "The public
    /// window handle forwards all configuration to the WM").
    pub fn get_property(&self, name: &str) -> Option<String> {
        self.wm.get_property(name)
    }

    pub fn set_property(&mut self, name: &str, value: &str) -> StackResult<()> {
        let _guard = self.lock.lock();
        self.wm.set_property(name, value)
    }

    pub fn remove_property(&mut self, name: &str) -> StackResult<()> {
        let _guard = self.lock.lock();
        self.wm.remove_property(name)
    }
}
