//! The window façade (spec component C8): a ref-counted handle over a
//! window living on a `gfx_windowstack::WindowStack`, forwarding
//! configuration to the WM plugin and owning cursor-shape creation/resize
//! and focus propagation.

pub mod error;
pub mod handle;
pub mod pixels;
pub mod sink;
pub mod types;

pub use error::{WindowError, WindowResult};
pub use handle::WindowHandle;
pub use pixels::premultiply_argb8888;
pub use sink::{TracingSink, WindowSink};
pub use types::{CursorFlags, ShapeBitmap};
