//! Compositor demo binary: wires two surface pools, a window stack, an
//! event buffer and a font cache together to exercise the data flow end to
//! end. This is demonstration glue, not a window-manager or WM-plugin
//! implementation in its own right.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use gfx_eventbuffer::{Event, EventBuffer, WindowEvent, WINDOW_EVENT_DESTROYED};
use gfx_font::{FontDescription, FontManager, FontResult, GlyphSource, RenderedGlyph};
use gfx_ipc::{DispatchCleanupQueue, Reactor};
use gfx_primitives::{BlitFlags, Rectangle};
use gfx_surface::mem_pool::{SharedMemoryPool, VideoMemoryPool};
use gfx_surface::{BufferPolicy, ColorSpace, PixelFormat, PoolPriority, SurfaceCaps, SurfaceDomain};
use gfx_window::{ShapeBitmap, TracingSink, WindowHandle};
use gfx_windowstack::{Cursor, StackContext, StackEvent, StackRegistry, StackResult, WindowStack, WmStack};

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "compositor", version, about = "Compositor demo runtime")]
struct Args {
    /// Optional configuration file path (overrides discovery of `compositor.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("compositor.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "compositor.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => self.log_guard = Some(guard),
            Err(_err) => {
                // Global subscriber already installed (e.g. under a test harness).
            }
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

fn log_shutdown_stage(stage: &'static str) {
    info!(target: "runtime.shutdown", stage, "shutdown_stage");
}

/// WM plugin stand-in that logs every call instead of actually driving a
/// display; `get_property`/`set_property` are backed by a small in-memory
/// table so the demo has something real to read back.
struct DemoWm {
    properties: HashMap<String, String>,
}

impl DemoWm {
    fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert("title".to_string(), "compositor demo".to_string());
        Self { properties }
    }
}

impl WmStack for DemoWm {
    fn init_stack(&mut self) -> StackResult<()> {
        debug!(target: "wm", "init_stack");
        Ok(())
    }

    fn close_stack(&mut self) {
        debug!(target: "wm", "close_stack");
    }

    fn resize_stack(&mut self, width: u32, height: u32, flags: BlitFlags) {
        debug!(target: "wm", width, height, ?flags, "resize_stack");
    }

    fn update_stack(&mut self, dirty: Rectangle) {
        debug!(target: "wm", ?dirty, "update_stack");
    }

    fn update_cursor(&mut self, cursor: &Cursor) {
        debug!(target: "wm", visible = cursor.allocation.is_some(), "update_cursor");
    }

    fn process_input(&mut self, event: StackEvent) {
        debug!(target: "wm", ?event, "process_input");
    }

    fn get_property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }

    fn set_property(&mut self, name: &str, value: &str) -> StackResult<()> {
        self.properties.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_property(&mut self, name: &str) -> StackResult<()> {
        self.properties.remove(name);
        Ok(())
    }
}

/// Minimal glyph source standing in for a real font file decoder (spec
/// Non-goal: decoding and rasterization are out of scope here). Every
/// character renders as a solid 8x8 A8 block so the font-cache data flow
/// has real pixels to pack.
struct DemoGlyphSource;

impl GlyphSource for DemoGlyphSource {
    fn character_index(&self, character: u32) -> FontResult<u32> {
        Ok(character)
    }

    fn render_glyph(&self, _index: u32) -> FontResult<RenderedGlyph> {
        Ok(RenderedGlyph {
            width: 8,
            height: 8,
            left: 0,
            top: 8,
            xadvance: 8,
            yadvance: 0,
            pixels: vec![0xFF; 8 * 8],
        })
    }
}

fn run(args: Args) -> Result<()> {
    let config = gfx_config::load_from(args.config.clone())?;
    info!(
        target: "runtime",
        shm_pool_size = config.file.shm_pool_size,
        window_surface_policy = ?config.file.window_surface_policy,
        "configuration loaded"
    );

    let mut domain = SurfaceDomain::new(4);
    domain.register_pool(Box::new(SharedMemoryPool::new(config.file.shm_pool_size)))?;
    domain.register_pool(Box::new(VideoMemoryPool::new(1 << 20, PoolPriority::Prefered)))?;
    info!(target: "runtime", pools = domain.pool_count(), "surface pools registered");

    let registry = StackRegistry::new();
    let cleanup = Arc::new(DispatchCleanupQueue::new());
    let buffer_mode = config.window_surface_policy(false);
    let stack = WindowStack::create(
        StackContext {
            width: 1920,
            height: 1080,
            buffer_mode,
            gpu_blit_capable: false,
            initial_devices: Vec::new(),
        },
        Box::new(DemoWm::new()),
        &registry,
        cleanup,
    )?;
    info!(target: "runtime", "window stack created");

    let mut window = WindowHandle::new(stack.clone(), 1, Box::new(TracingSink));
    let shape = ShapeBitmap {
        width: 4,
        height: 4,
        pixels: vec![0xFF, 0x00, 0x00, 0x80; 16],
    };
    window.set_cursor_shape(&mut domain, &shape, true)?;
    info!(target: "runtime", cursor_visible = window.is_cursor_visible(), "cursor shape installed");

    let event_buffer = EventBuffer::new();
    let window_reactor: Reactor<WindowEvent> = Reactor::new();
    event_buffer.attach_window(window.window_id(), &window_reactor, &event_buffer);
    window_reactor.dispatch(&WindowEvent { window_id: window.window_id(), event_type: 0x1 });
    if event_buffer.has_event()? {
        let event = event_buffer.get_event()?;
        info!(target: "runtime", ?event, "event delivered through buffer");
    }
    window_reactor.dispatch(&WindowEvent {
        window_id: window.window_id(),
        event_type: WINDOW_EVENT_DESTROYED,
    });
    while event_buffer.has_event()? {
        let _ = event_buffer.get_event()?;
    }
    info!(target: "runtime", attached = window_reactor.len(), "window destroy reaction processed");

    let mut fonts = FontManager::new();
    let font_id = fonts.create_font(FontDescription {
        height: 16,
        pixel_format: PixelFormat::A8,
        color_space: ColorSpace::Rgb,
        surface_caps: SurfaceCaps::NONE,
        ascender: 14,
        descender: -2,
        max_advance: 8,
    });
    let source = DemoGlyphSource;
    let glyph = fonts.glyph_data(&mut domain, font_id, &source, 0, b'A' as u32)?;
    info!(target: "runtime", row = ?glyph.row, width = glyph.width, "glyph rendered and cached");

    let dummy_event = Event::Window(WindowEvent { window_id: window.window_id(), event_type: 0x2 });
    event_buffer.post_event(dummy_event)?;
    while event_buffer.has_event()? {
        let _ = event_buffer.get_event()?;
    }

    warn!(target: "runtime", "demo run complete, shutting down");
    Ok(())
}

fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();

    info!(target: "runtime", "startup");
    let args = Args::parse();

    let result = run(args);

    log_shutdown_stage("begin");
    log_shutdown_stage("complete");
    result
}
