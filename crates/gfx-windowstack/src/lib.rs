//! Window stack and cursor subsystem (spec components C6/C9): per-layer
//! device attach/detach, pointer-motion coalescing, layer-context
//! refcounted dispatch, background-image reactions, and cursor state.

pub mod coalesce;
pub mod cursor;
pub mod error;
pub mod registry;
pub mod stack;
pub mod types;

pub use coalesce::MotionCoalescer;
pub use cursor::{Cursor, CursorAcceleration};
pub use error::{StackError, StackResult};
pub use registry::{LayerContext, StackRegistry};
pub use stack::{BackgroundEvent, StackContext, WindowStack, WmStack};
pub use types::{Axis, InputEventFlags, RawInput, Rotation, StackEvent};
