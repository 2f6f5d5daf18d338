//! Tagged-union event record (spec §4.5 "Contract details").

use crate::error::{EventBufferError, EventBufferResult};

/// Minimum encoded size a [`UniversalEvent`] must declare (spec §6
/// "Bit-exact formats": "a self-describing size which must be ≥ minimum
/// header size").
pub const UNIVERSAL_HEADER_SIZE: usize = 8;

/// Fixed per-record size used by pipe mode; every written record is this
/// size regardless of the event's actual class, with the remainder zero
/// padded (spec §9 open question: "readers must cope with trailing
/// padding... the contract here is 'fixed record size'").
pub const RECORD_SIZE: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    Input,
    Window,
    Surface,
    User,
    VideoProvider,
    Universal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub device_id: u32,
    pub event_type: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEvent {
    pub window_id: u32,
    pub event_type: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceEvent {
    pub surface_id: u32,
    pub event_type: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEvent {
    pub event_type: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoProviderEvent {
    pub provider_id: u32,
    pub event_type: u32,
}

/// A self-describing record whose `size` must fall within
/// `[UNIVERSAL_HEADER_SIZE, RECORD_SIZE]` and match `data.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversalEvent {
    pub size: usize,
    pub data: Vec<u8>,
}

/// Symbolic type-tags used by the destroy-triggered reactions (spec §4.5
/// "Reactions remove themselves on DESTROYED / DWET_DESTROYED /
/// DSEVT_DESTROYED").
pub const WINDOW_EVENT_DESTROYED: u32 = 0xDE57_0001;
pub const SURFACE_EVENT_DESTROYED: u32 = 0xDE57_0002;
/// Synthesized on surface attach when the surface already has content
/// (spec §4.5 "Surface attach").
pub const SURFACE_EVENT_UPDATE: u32 = 0x0001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Input(InputEvent),
    Window(WindowEvent),
    Surface(SurfaceEvent),
    User(UserEvent),
    VideoProvider(VideoProviderEvent),
    Universal(UniversalEvent),
}

impl Event {
    pub fn class(&self) -> EventClass {
        match self {
            Event::Input(_) => EventClass::Input,
            Event::Window(_) => EventClass::Window,
            Event::Surface(_) => EventClass::Surface,
            Event::User(_) => EventClass::User,
            Event::VideoProvider(_) => EventClass::VideoProvider,
            Event::Universal(_) => EventClass::Universal,
        }
    }

    /// Per-class subtype, used as the statistics counter key (spec §4.5
    /// "Statistics... maintain a per-subtype counter").
    pub fn subtype(&self) -> u32 {
        match self {
            Event::Input(e) => e.event_type,
            Event::Window(e) => e.event_type,
            Event::Surface(e) => e.event_type,
            Event::User(e) => e.event_type,
            Event::VideoProvider(e) => e.event_type,
            Event::Universal(_) => 0,
        }
    }

    /// Rejects malformed universal-event sizes (spec §4.5 "PostEvent is
    /// rejected for unknown classes or malformed universal sizes"; unknown
    /// classes can't arise since `Event` is a closed enum).
    pub fn validate(&self) -> EventBufferResult<()> {
        if let Event::Universal(u) = self {
            if u.size < UNIVERSAL_HEADER_SIZE || u.size > RECORD_SIZE || u.size != u.data.len() {
                return Err(EventBufferError::InvArg("universal event size out of bounds"));
            }
        }
        Ok(())
    }
}
