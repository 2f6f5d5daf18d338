//! MPMC event queue over a tagged-union event record (spec component C7):
//! predicate filtering, replay-aware statistics, attach/detach for input
//! devices/windows/surfaces, and a pipe-mode transition for non-blocking
//! consumers.

pub mod attach;
pub mod buffer;
pub mod error;
pub mod stats;
pub mod types;

pub use buffer::EventBuffer;
pub use error::{EventBufferError, EventBufferResult};
pub use stats::Statistics;
pub use types::{
    Event, EventClass, InputEvent, SurfaceEvent, UniversalEvent, UserEvent, VideoProviderEvent, WindowEvent,
    RECORD_SIZE, SURFACE_EVENT_DESTROYED, SURFACE_EVENT_UPDATE, UNIVERSAL_HEADER_SIZE, WINDOW_EVENT_DESTROYED,
};
