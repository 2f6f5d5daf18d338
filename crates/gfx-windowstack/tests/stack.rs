use std::sync::{Arc, Mutex};

use gfx_ipc::DispatchCleanupQueue;
use gfx_primitives::{BlitFlags, Rectangle};
use gfx_surface::BufferPolicy;
use gfx_windowstack::{Axis, Cursor, RawInput, StackContext, StackEvent, StackRegistry, WindowStack, WmStack};

#[derive(Default)]
struct RecordingWm {
    inputs: Vec<StackEvent>,
    repaints: usize,
    closed: bool,
}

impl WmStack for RecordingWm {
    fn init_stack(&mut self) -> gfx_windowstack::StackResult<()> {
        Ok(())
    }
    fn close_stack(&mut self) {
        self.closed = true;
    }
    fn resize_stack(&mut self, _width: u32, _height: u32, _flags: BlitFlags) {}
    fn update_stack(&mut self, _dirty: Rectangle) {
        self.repaints += 1;
    }
    fn update_cursor(&mut self, _cursor: &Cursor) {}
    fn process_input(&mut self, event: StackEvent) {
        self.inputs.push(event);
    }
    fn get_property(&self, _name: &str) -> Option<String> {
        None
    }
    fn set_property(&mut self, _name: &str, _value: &str) -> gfx_windowstack::StackResult<()> {
        Ok(())
    }
    fn remove_property(&mut self, _name: &str) -> gfx_windowstack::StackResult<()> {
        Ok(())
    }
}

fn make_stack(wm: Arc<Mutex<RecordingWm>>, devices: Vec<u32>) -> Arc<Mutex<WindowStack>> {
    struct Forwarding(Arc<Mutex<RecordingWm>>);
    impl WmStack for Forwarding {
        fn init_stack(&mut self) -> gfx_windowstack::StackResult<()> {
            self.0.lock().unwrap().init_stack()
        }
        fn close_stack(&mut self) {
            self.0.lock().unwrap().close_stack()
        }
        fn resize_stack(&mut self, width: u32, height: u32, flags: BlitFlags) {
            self.0.lock().unwrap().resize_stack(width, height, flags)
        }
        fn update_stack(&mut self, dirty: Rectangle) {
            self.0.lock().unwrap().update_stack(dirty)
        }
        fn update_cursor(&mut self, cursor: &Cursor) {
            self.0.lock().unwrap().update_cursor(cursor)
        }
        fn process_input(&mut self, event: StackEvent) {
            self.0.lock().unwrap().process_input(event)
        }
        fn get_property(&self, name: &str) -> Option<String> {
            self.0.lock().unwrap().get_property(name)
        }
        fn set_property(&mut self, name: &str, value: &str) -> gfx_windowstack::StackResult<()> {
            self.0.lock().unwrap().set_property(name, value)
        }
        fn remove_property(&mut self, name: &str) -> gfx_windowstack::StackResult<()> {
            self.0.lock().unwrap().remove_property(name)
        }
    }

    let registry = StackRegistry::new();
    let cleanup = Arc::new(DispatchCleanupQueue::new());
    let ctx = StackContext {
        width: 800,
        height: 600,
        buffer_mode: BufferPolicy::Auto,
        gpu_blit_capable: false,
        initial_devices: devices,
    };
    WindowStack::create(ctx, Box::new(Forwarding(wm)), &registry, cleanup).expect("stack creation cannot fail here")
}

#[test]
fn scenario_s4_pointer_coalescing_across_devices_through_a_full_stack() {
    let wm = Arc::new(Mutex::new(RecordingWm::default()));
    let stack = make_stack(wm.clone(), vec![1, 2]);

    {
        let mut guard = stack.lock().unwrap();
        guard.dispatch_input(1, RawInput::Axis { axis: Axis::X, value: 3, absolute: false }, 0).unwrap();
        guard.dispatch_input(1, RawInput::Axis { axis: Axis::Y, value: -1, absolute: false }, 1).unwrap();
        guard.dispatch_input(2, RawInput::Axis { axis: Axis::X, value: 4, absolute: false }, 2).unwrap();
    }

    let dispatched = wm.lock().unwrap().inputs.clone();
    assert_eq!(
        dispatched,
        vec![
            StackEvent::AxisMotion {
                device_id: 1,
                axis: Axis::X,
                axisrel: 3,
                flags: gfx_windowstack::InputEventFlags::FOLLOW
            },
            StackEvent::AxisMotion { device_id: 1, axis: Axis::Y, axisrel: -1, flags: gfx_windowstack::InputEventFlags::NONE },
        ]
    );
}

#[test]
fn dispatch_cleanup_flushes_pending_motion_and_releases_the_layer_context() {
    let wm = Arc::new(Mutex::new(RecordingWm::default()));
    let cleanup = Arc::new(DispatchCleanupQueue::new());
    let registry = StackRegistry::new();

    struct Forwarding(Arc<Mutex<RecordingWm>>);
    impl WmStack for Forwarding {
        fn init_stack(&mut self) -> gfx_windowstack::StackResult<()> {
            Ok(())
        }
        fn close_stack(&mut self) {}
        fn resize_stack(&mut self, _w: u32, _h: u32, _f: BlitFlags) {}
        fn update_stack(&mut self, _dirty: Rectangle) {}
        fn update_cursor(&mut self, _cursor: &Cursor) {}
        fn process_input(&mut self, event: StackEvent) {
            self.0.lock().unwrap().process_input(event);
        }
        fn get_property(&self, _name: &str) -> Option<String> {
            None
        }
        fn set_property(&mut self, _name: &str, _value: &str) -> gfx_windowstack::StackResult<()> {
            Ok(())
        }
        fn remove_property(&mut self, _name: &str) -> gfx_windowstack::StackResult<()> {
            Ok(())
        }
    }

    let ctx = StackContext {
        width: 320,
        height: 240,
        buffer_mode: BufferPolicy::SystemOnly,
        gpu_blit_capable: false,
        initial_devices: vec![1],
    };
    let stack = WindowStack::create(ctx, Box::new(Forwarding(wm.clone())), &registry, cleanup.clone()).unwrap();

    {
        let mut guard = stack.lock().unwrap();
        assert_eq!(guard.context.refcount(), 1);
        guard.dispatch_input(1, RawInput::Axis { axis: Axis::X, value: 5, absolute: false }, 0).unwrap();
        // Pending motion defers the context release to the cleanup queue.
        assert_eq!(guard.context.refcount(), 2);
    }
    assert!(wm.lock().unwrap().inputs.is_empty());

    cleanup.drain();

    assert_eq!(wm.lock().unwrap().inputs, vec![StackEvent::AxisMotion {
        device_id: 1,
        axis: Axis::X,
        axisrel: 5,
        flags: gfx_windowstack::InputEventFlags::NONE,
    }]);
    assert_eq!(stack.lock().unwrap().context.refcount(), 1);
}

#[test]
fn dispatch_input_from_an_unattached_device_is_rejected() {
    let wm = Arc::new(Mutex::new(RecordingWm::default()));
    let stack = make_stack(wm, vec![1]);
    let mut guard = stack.lock().unwrap();
    let result = guard.dispatch_input(99, RawInput::Axis { axis: Axis::X, value: 1, absolute: false }, 0);
    assert!(matches!(result, Err(gfx_windowstack::StackError::IdNotFound)));
}

#[test]
fn device_attach_broadcast_reaches_every_registered_stack() {
    let wm_a = Arc::new(Mutex::new(RecordingWm::default()));
    let wm_b = Arc::new(Mutex::new(RecordingWm::default()));
    let registry = StackRegistry::new();
    let cleanup = Arc::new(DispatchCleanupQueue::new());

    struct Forwarding(Arc<Mutex<RecordingWm>>);
    impl WmStack for Forwarding {
        fn init_stack(&mut self) -> gfx_windowstack::StackResult<()> {
            Ok(())
        }
        fn close_stack(&mut self) {}
        fn resize_stack(&mut self, _w: u32, _h: u32, _f: BlitFlags) {}
        fn update_stack(&mut self, _dirty: Rectangle) {}
        fn update_cursor(&mut self, _cursor: &Cursor) {}
        fn process_input(&mut self, _event: StackEvent) {}
        fn get_property(&self, _name: &str) -> Option<String> {
            None
        }
        fn set_property(&mut self, _name: &str, _value: &str) -> gfx_windowstack::StackResult<()> {
            Ok(())
        }
        fn remove_property(&mut self, _name: &str) -> gfx_windowstack::StackResult<()> {
            Ok(())
        }
    }

    let ctx_a = StackContext { width: 100, height: 100, buffer_mode: BufferPolicy::SystemOnly, gpu_blit_capable: false, initial_devices: vec![] };
    let ctx_b = StackContext { width: 100, height: 100, buffer_mode: BufferPolicy::SystemOnly, gpu_blit_capable: false, initial_devices: vec![] };
    let stack_a = WindowStack::create(ctx_a, Box::new(Forwarding(wm_a)), &registry, cleanup.clone()).unwrap();
    let stack_b = WindowStack::create(ctx_b, Box::new(Forwarding(wm_b)), &registry, cleanup).unwrap();

    registry.notify_device_attached(7);

    assert_eq!(stack_a.lock().unwrap().devices(), &[7]);
    assert_eq!(stack_b.lock().unwrap().devices(), &[7]);
    assert_eq!(registry.live_count(), 2);

    drop(stack_a);
    assert_eq!(registry.live_count(), 1);
}
