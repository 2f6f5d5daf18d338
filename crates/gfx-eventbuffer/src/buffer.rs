//! `EventBuffer`: a thread-safe MPMC queue over the tagged-union `Event`,
//! with an optional predicate filter, statistics, attach/detach, and a
//! pipe-mode transition (spec §4.5).

use std::collections::VecDeque;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use gfx_ipc::{ReactionResult, Reactor};
use tracing::{debug, instrument, trace, warn};

use crate::attach::{AttachedDevice, AttachedSurface, AttachedWindow};
use crate::error::{EventBufferError, EventBufferResult};
use crate::stats::Statistics;
use crate::types::{
    Event, InputEvent, SurfaceEvent, WindowEvent, RECORD_SIZE, SURFACE_EVENT_DESTROYED, SURFACE_EVENT_UPDATE,
    WINDOW_EVENT_DESTROYED,
};

type Filter = Box<dyn Fn(&Event) -> bool + Send + Sync>;

struct PipeState {
    stop: bool,
}

struct Inner {
    queue: VecDeque<Event>,
    filter: Option<Filter>,
    stats: Statistics,
    pipe: Option<PipeState>,
    woken: bool,
    devices: Vec<AttachedDevice>,
    windows: Vec<AttachedWindow>,
    surfaces: Vec<AttachedSurface>,
}

pub struct EventBuffer {
    inner: Mutex<Inner>,
    condvar: Condvar,
    pipe_handle: Mutex<Option<JoinHandle<()>>>,
}

impl EventBuffer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                filter: None,
                stats: Statistics::default(),
                pipe: None,
                woken: false,
                devices: Vec::new(),
                windows: Vec::new(),
                surfaces: Vec::new(),
            }),
            condvar: Condvar::new(),
            pipe_handle: Mutex::new(None),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("event buffer poisoned")
    }

    pub fn set_filter(&self, filter: Option<Filter>) {
        self.lock().filter = filter;
    }

    /// Posts an event; rejected for a malformed universal-event size
    /// (spec §4.5 "PostEvent is rejected for... malformed universal
    /// sizes"). In pipe mode, universal events are silently dropped with a
    /// warning instead of being queued for the feeder.
    pub fn post_event(&self, event: Event) -> EventBufferResult<()> {
        event.validate()?;
        let mut inner = self.lock();

        if inner.pipe.is_some() && matches!(event, Event::Universal(_)) {
            warn!("universal event dropped in pipe mode");
            return Ok(());
        }
        if let Some(filter) = &inner.filter {
            if !filter(&event) {
                trace!("event rejected by filter");
                return Ok(());
            }
        }

        inner.stats.record(&event);
        inner.queue.push_back(event);
        drop(inner);
        self.condvar.notify_all();
        Ok(())
    }

    pub fn reset(&self) -> EventBufferResult<()> {
        let mut inner = self.lock();
        if inner.pipe.is_some() {
            return Err(EventBufferError::Unsupported);
        }
        inner.queue.clear();
        Ok(())
    }

    pub fn get_event(&self) -> EventBufferResult<Event> {
        let mut inner = self.lock();
        if inner.pipe.is_some() {
            return Err(EventBufferError::Unsupported);
        }
        inner.queue.pop_front().ok_or(EventBufferError::BufferEmpty)
    }

    pub fn peek_event(&self) -> EventBufferResult<Event> {
        let inner = self.lock();
        if inner.pipe.is_some() {
            return Err(EventBufferError::Unsupported);
        }
        inner.queue.front().cloned().ok_or(EventBufferError::BufferEmpty)
    }

    pub fn has_event(&self) -> EventBufferResult<bool> {
        let inner = self.lock();
        if inner.pipe.is_some() {
            return Err(EventBufferError::Unsupported);
        }
        Ok(!inner.queue.is_empty())
    }

    pub fn wait_for_event(&self) -> EventBufferResult<()> {
        let mut inner = self.lock();
        if inner.pipe.is_some() {
            return Err(EventBufferError::Unsupported);
        }
        while inner.queue.is_empty() && !inner.woken {
            inner = self.condvar.wait(inner).expect("event buffer poisoned");
        }
        inner.woken = false;
        Ok(())
    }

    /// Waits up to `timeout`; `TIMEOUT` on deadline expiry with no event,
    /// `INTERRUPTED` if woken via [`Self::wake_up`] with no event queued
    /// (spec §5 "Cancellation and timeouts").
    pub fn wait_for_event_with_timeout(&self, timeout: Duration) -> EventBufferResult<()> {
        let inner = self.lock();
        if inner.pipe.is_some() {
            return Err(EventBufferError::Unsupported);
        }
        let (mut inner, result) = self
            .condvar
            .wait_timeout_while(inner, timeout, |inner| inner.queue.is_empty() && !inner.woken)
            .expect("event buffer poisoned");

        if !inner.queue.is_empty() {
            inner.woken = false;
            return Ok(());
        }
        if inner.woken {
            inner.woken = false;
            return Err(EventBufferError::Interrupted);
        }
        debug_assert!(result.timed_out());
        Err(EventBufferError::Timeout)
    }

    /// Unblocks any waiter without requiring a queued event.
    pub fn wake_up(&self) {
        self.lock().woken = true;
        self.condvar.notify_all();
    }

    pub fn enable_statistics(&self, enabled: bool) {
        let mut inner = self.lock();
        let queue = inner.queue.clone();
        inner.stats.set_enabled(enabled, &queue);
    }

    pub fn statistics_count(&self, class: crate::types::EventClass, subtype: u32) -> u64 {
        self.lock().stats.count(class, subtype)
    }

    pub fn attach_device(&self, device_id: u32, reactor: &Reactor<InputEvent>, self_arc: &Arc<Self>) {
        let weak = Arc::downgrade(self_arc);
        let reaction = reactor.attach(move |event: &InputEvent| {
            let Some(buffer) = weak.upgrade() else { return ReactionResult::Remove };
            if event.device_id != device_id {
                return ReactionResult::Continue;
            }
            let _ = buffer.post_event(Event::Input(event.clone()));
            ReactionResult::Continue
        });
        self.lock().devices.push(AttachedDevice { device_id, reaction });
        debug!(device_id, "input device attached to event buffer");
    }

    pub fn detach_device(&self, device_id: u32, reactor: &Reactor<InputEvent>) {
        let mut inner = self.lock();
        if let Some(pos) = inner.devices.iter().position(|d| d.device_id == device_id) {
            let attached = inner.devices.remove(pos);
            reactor.detach(attached.reaction);
        }
    }

    /// Attaches a window; the reaction self-removes and tombstones its
    /// entry on `DESTROYED` rather than waiting for an explicit detach
    /// (spec §4.5 "windows destroyed while attached are marked null").
    pub fn attach_window(&self, window_id: u32, reactor: &Reactor<WindowEvent>, self_arc: &Arc<Self>) {
        let weak = Arc::downgrade(self_arc);
        let reaction = reactor.attach(move |event: &WindowEvent| {
            let Some(buffer) = weak.upgrade() else { return ReactionResult::Remove };
            if event.window_id != window_id {
                return ReactionResult::Continue;
            }
            let _ = buffer.post_event(Event::Window(event.clone()));
            if event.event_type == WINDOW_EVENT_DESTROYED {
                let mut inner = buffer.lock();
                if let Some(entry) = inner.windows.iter_mut().find(|w| w.window_id == Some(window_id)) {
                    entry.window_id = None;
                }
                return ReactionResult::Remove;
            }
            ReactionResult::Continue
        });
        self.lock().windows.push(AttachedWindow { window_id: Some(window_id), reaction });
        debug!(window_id, "window attached to event buffer");
    }

    /// `window_id = Some(id)` detaches that window explicitly;
    /// `window_id = None` sweeps every already-tombstoned entry (spec §4.5
    /// "DetachWindow with a NULL window param also clears any tombstoned
    /// window entries").
    pub fn detach_window(&self, window_id: Option<u32>, reactor: &Reactor<WindowEvent>) {
        let mut inner = self.lock();
        match window_id {
            Some(id) => {
                if let Some(pos) = inner.windows.iter().position(|w| w.window_id == Some(id)) {
                    let attached = inner.windows.remove(pos);
                    reactor.detach(attached.reaction);
                }
            }
            None => {
                inner.windows.retain(|w| w.window_id.is_some());
            }
        }
    }

    /// Attaches a surface; if it already has content (flip count > 0, or
    /// it is non-flipping), immediately synthesizes a full-surface
    /// `UPDATE` so the consumer sees current state without waiting for
    /// another repaint (spec §4.5 "Surface attach").
    pub fn attach_surface(
        &self,
        surface_id: u32,
        flip_count: u32,
        flipping: bool,
        reactor: &Reactor<SurfaceEvent>,
        self_arc: &Arc<Self>,
    ) {
        let weak = Arc::downgrade(self_arc);
        let reaction = reactor.attach(move |event: &SurfaceEvent| {
            let Some(buffer) = weak.upgrade() else { return ReactionResult::Remove };
            if event.surface_id != surface_id {
                return ReactionResult::Continue;
            }
            let _ = buffer.post_event(Event::Surface(event.clone()));
            if event.event_type == SURFACE_EVENT_DESTROYED {
                return ReactionResult::Remove;
            }
            ReactionResult::Continue
        });
        self.lock().surfaces.push(AttachedSurface { surface_id, reaction });

        if flip_count > 0 || !flipping {
            let _ = self.post_event(Event::Surface(SurfaceEvent { surface_id, event_type: SURFACE_EVENT_UPDATE }));
        }
        debug!(surface_id, flip_count, flipping, "surface attached to event buffer");
    }

    pub fn detach_surface(&self, surface_id: u32, reactor: &Reactor<SurfaceEvent>) {
        let mut inner = self.lock();
        if let Some(pos) = inner.surfaces.iter().position(|s| s.surface_id == surface_id) {
            let attached = inner.surfaces.remove(pos);
            reactor.detach(attached.reaction);
        }
    }

    /// Transitions to pipe mode: creates a local socket pair and spawns a
    /// feeder thread that drains the queue and writes one fixed-size
    /// record per event (spec §4.5 "CreateFileDescriptor").
    #[instrument(skip(self_arc))]
    pub fn create_file_descriptor(self_arc: &Arc<Self>) -> EventBufferResult<UnixStream> {
        let mut inner = self_arc.lock();
        if inner.pipe.is_some() {
            return Err(EventBufferError::Unsupported);
        }
        let (local, remote) = UnixStream::pair().map_err(|_| EventBufferError::Ipc)?;
        inner.pipe = Some(PipeState { stop: false });
        drop(inner);

        let weak = Arc::downgrade(self_arc);
        let handle = std::thread::spawn(move || feeder_loop(weak, local));
        *self_arc.pipe_handle.lock().expect("event buffer poisoned") = Some(handle);
        self_arc.condvar.notify_all();
        debug!("event buffer switched to pipe mode");
        Ok(remote)
    }

    /// Stops the feeder thread and joins it, so pipe-mode teardown never
    /// races a write against a closed socket (spec §4.5 "Destruction in
    /// pipe mode joins the feeder before closing the sockets").
    pub fn close_pipe(&self) {
        {
            let mut inner = self.lock();
            match &mut inner.pipe {
                Some(pipe) => pipe.stop = true,
                None => return,
            }
        }
        self.condvar.notify_all();
        if let Some(handle) = self.pipe_handle.lock().expect("event buffer poisoned").take() {
            let _ = handle.join();
        }
    }
}

fn feeder_loop(weak: Weak<EventBuffer>, mut sock: UnixStream) {
    loop {
        let Some(buffer) = weak.upgrade() else { break };
        let mut inner = buffer.lock();
        loop {
            if inner.pipe.as_ref().is_none_or(|p| p.stop) {
                return;
            }
            if !inner.queue.is_empty() {
                break;
            }
            inner = buffer.condvar.wait(inner).expect("event buffer poisoned");
        }
        let event = inner.queue.pop_front();
        drop(inner);

        if let Some(event) = event {
            let record = encode_record(&event);
            if sock.write_all(&record).is_err() {
                break;
            }
        }
    }
}

fn encode_record(event: &Event) -> [u8; RECORD_SIZE] {
    let mut record = [0u8; RECORD_SIZE];
    record[0] = event.class() as u8;
    record[1..5].copy_from_slice(&event.subtype().to_le_bytes());
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventClass;
    use std::io::Read;
    use std::time::Duration;

    #[test]
    fn get_event_is_fifo_for_a_single_producer() {
        let buffer = EventBuffer::new();
        buffer.post_event(Event::Input(InputEvent { device_id: 1, event_type: 1 })).unwrap();
        buffer.post_event(Event::Input(InputEvent { device_id: 1, event_type: 2 })).unwrap();
        buffer.post_event(Event::Input(InputEvent { device_id: 1, event_type: 3 })).unwrap();

        for expected in [1, 2, 3] {
            match buffer.get_event().unwrap() {
                Event::Input(e) => assert_eq!(e.event_type, expected),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(buffer.get_event(), Err(EventBufferError::BufferEmpty));
    }

    #[test]
    fn filter_rejects_events_before_they_are_queued() {
        let buffer = EventBuffer::new();
        buffer.set_filter(Some(Box::new(|event: &Event| !matches!(event, Event::Input(i) if i.event_type == 2))));
        buffer.post_event(Event::Input(InputEvent { device_id: 1, event_type: 1 })).unwrap();
        buffer.post_event(Event::Input(InputEvent { device_id: 1, event_type: 2 })).unwrap();
        buffer.post_event(Event::Input(InputEvent { device_id: 1, event_type: 3 })).unwrap();

        assert!(matches!(buffer.get_event().unwrap(), Event::Input(e) if e.event_type == 1));
        assert!(matches!(buffer.get_event().unwrap(), Event::Input(e) if e.event_type == 3));
        assert_eq!(buffer.get_event(), Err(EventBufferError::BufferEmpty));
    }

    #[test]
    fn statistics_replay_and_reset() {
        let buffer = EventBuffer::new();
        for _ in 0..3 {
            buffer.post_event(Event::Input(InputEvent { device_id: 1, event_type: 9 })).unwrap();
        }
        buffer.enable_statistics(true);
        assert_eq!(buffer.statistics_count(EventClass::Input, 9), 3);
        buffer.enable_statistics(false);
        assert_eq!(buffer.statistics_count(EventClass::Input, 9), 0);
    }

    #[test]
    fn wait_with_timeout_expires_when_nothing_is_posted() {
        let buffer = EventBuffer::new();
        assert_eq!(buffer.wait_for_event_with_timeout(Duration::from_millis(20)), Err(EventBufferError::Timeout));
    }

    #[test]
    fn wake_up_interrupts_a_waiter_with_no_event() {
        let buffer = EventBuffer::new();
        let waiter = buffer.clone();
        let handle = std::thread::spawn(move || waiter.wait_for_event_with_timeout(Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(20));
        buffer.wake_up();
        assert_eq!(handle.join().unwrap(), Err(EventBufferError::Interrupted));
    }

    #[test]
    fn scenario_s5_pipe_mode_round_trips_posted_events_and_degrades_sync_api() {
        let buffer = EventBuffer::new();
        for i in 0..3u32 {
            buffer.post_event(Event::Window(WindowEvent { window_id: 1, event_type: i })).unwrap();
        }

        let mut sock = EventBuffer::create_file_descriptor(&buffer).unwrap();
        let mut raw = vec![0u8; RECORD_SIZE * 3];
        sock.read_exact(&mut raw).unwrap();
        for (i, chunk) in raw.chunks(RECORD_SIZE).enumerate() {
            assert_eq!(chunk[0], EventClass::Window as u8);
            assert_eq!(u32::from_le_bytes(chunk[1..5].try_into().unwrap()), i as u32);
        }

        assert_eq!(buffer.reset(), Err(EventBufferError::Unsupported));
        buffer.close_pipe();
    }

    #[test]
    fn detach_window_with_none_clears_tombstoned_entries() {
        let buffer = EventBuffer::new();
        let reactor: Reactor<WindowEvent> = Reactor::new();
        buffer.attach_window(1, &reactor, &buffer);
        reactor.dispatch(&WindowEvent { window_id: 1, event_type: WINDOW_EVENT_DESTROYED });

        assert_eq!(buffer.lock().windows.len(), 1, "tombstoned, not yet swept");
        buffer.detach_window(None, &reactor);
        assert!(buffer.lock().windows.is_empty());
    }

    #[test]
    fn attaching_a_surface_with_pending_flips_synthesizes_an_update() {
        let buffer = EventBuffer::new();
        let reactor: Reactor<SurfaceEvent> = Reactor::new();
        buffer.attach_surface(5, 2, true, &reactor, &buffer);
        match buffer.get_event().unwrap() {
            Event::Surface(e) => {
                assert_eq!(e.surface_id, 5);
                assert_eq!(e.event_type, SURFACE_EVENT_UPDATE);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
