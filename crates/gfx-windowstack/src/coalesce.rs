//! Pointer-motion coalescing (spec §4.4, testable property 8, scenario S4).
//!
//! Two pending slots (X and Y), each accumulating relative motion or
//! latching an absolute value, until something forces a flush: the pending
//! pair is older than 10 ms, a different device's axis event arrives, a
//! non-axis event arrives, or the dispatcher's batch boundary is reached.

use crate::types::{Axis, InputEventFlags, RawInput, StackEvent};

const STALE_AFTER_MS: u64 = 10;

#[derive(Debug, Clone, Copy)]
struct PendingAxis {
    value: i32,
    absolute: bool,
}

#[derive(Debug, Default)]
pub struct MotionCoalescer {
    x: Option<PendingAxis>,
    y: Option<PendingAxis>,
    device_id: Option<u32>,
    ts_ms: Option<u64>,
}

impl MotionCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    /// Feeds one device's raw input through the coalescer. `now_ms` is the
    /// caller's monotonic clock reading (kept explicit rather than read
    /// internally, so the coalescing rule stays pure and deterministic to
    /// test). Returns any events that must be dispatched before this one
    /// (a forced flush), followed by this input's own dispatch if it was
    /// not itself absorbed into the pending pair.
    pub fn feed(&mut self, device_id: u32, input: RawInput, now_ms: u64) -> Vec<StackEvent> {
        let mut out = Vec::new();

        let stale = self.ts_ms.map(|ts| now_ms.saturating_sub(ts) >= STALE_AFTER_MS).unwrap_or(false);
        let other_device = self.device_id.map(|d| d != device_id).unwrap_or(false);
        if self.has_pending() && (stale || other_device) {
            out.extend(self.flush());
        }

        match input {
            RawInput::Axis { axis, value, absolute } => {
                self.device_id = Some(device_id);
                if self.ts_ms.is_none() {
                    self.ts_ms = Some(now_ms);
                }
                let slot = match axis {
                    Axis::X => &mut self.x,
                    Axis::Y => &mut self.y,
                };
                *slot = Some(match (absolute, *slot) {
                    (true, _) => PendingAxis { value, absolute: true },
                    (false, Some(existing)) if !existing.absolute => {
                        PendingAxis { value: existing.value + value, absolute: false }
                    }
                    (false, _) => PendingAxis { value, absolute: false },
                });
            }
            RawInput::Button { .. } | RawInput::Key { .. } => {
                if self.has_pending() {
                    out.extend(self.flush());
                }
                out.push(non_axis_event(device_id, input));
            }
        }

        out
    }

    /// Forces a flush regardless of staleness, e.g. at a dispatch-cleanup
    /// batch boundary (spec §4.4 "Flush happens also on dispatch-cleanup").
    pub fn flush(&mut self) -> Vec<StackEvent> {
        let Some(device_id) = self.device_id.take() else {
            return Vec::new();
        };
        self.ts_ms = None;

        let mut out = Vec::new();
        let x = self.x.take();
        let y = self.y.take();
        if let Some(x) = x {
            let flags = if y.is_some() { InputEventFlags::FOLLOW } else { InputEventFlags::NONE };
            out.push(StackEvent::AxisMotion { device_id, axis: Axis::X, axisrel: x.value, flags });
        }
        if let Some(y) = y {
            out.push(StackEvent::AxisMotion { device_id, axis: Axis::Y, axisrel: y.value, flags: InputEventFlags::NONE });
        }
        out
    }
}

fn non_axis_event(device_id: u32, input: RawInput) -> StackEvent {
    match input {
        RawInput::Button { code, pressed } => StackEvent::Button { device_id, code, pressed },
        RawInput::Key { code, pressed } => StackEvent::Key { device_id, code, pressed },
        RawInput::Axis { .. } => unreachable!("axis input never reaches non_axis_event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_relative_axis_events_on_same_device_coalesce() {
        let mut coalescer = MotionCoalescer::new();
        let first = coalescer.feed(1, RawInput::Axis { axis: Axis::X, value: 1, absolute: false }, 0);
        assert!(first.is_empty());
        let second = coalescer.feed(1, RawInput::Axis { axis: Axis::X, value: 1, absolute: false }, 1);
        assert!(second.is_empty(), "still within the coalescing window");

        let flushed = coalescer.flush();
        assert_eq!(flushed, vec![StackEvent::AxisMotion { device_id: 1, axis: Axis::X, axisrel: 2, flags: InputEventFlags::NONE }]);
    }

    #[test]
    fn scenario_s4_third_event_from_other_device_flushes_pending_pair_with_follow() {
        let mut coalescer = MotionCoalescer::new();
        let events1 = coalescer.feed(1, RawInput::Axis { axis: Axis::X, value: 3, absolute: false }, 0);
        assert!(events1.is_empty());
        let events2 = coalescer.feed(1, RawInput::Axis { axis: Axis::Y, value: -1, absolute: false }, 1);
        assert!(events2.is_empty());

        let events3 = coalescer.feed(2, RawInput::Axis { axis: Axis::X, value: 4, absolute: false }, 2);
        assert_eq!(
            events3,
            vec![
                StackEvent::AxisMotion { device_id: 1, axis: Axis::X, axisrel: 3, flags: InputEventFlags::FOLLOW },
                StackEvent::AxisMotion { device_id: 1, axis: Axis::Y, axisrel: -1, flags: InputEventFlags::NONE },
            ]
        );

        // Device 2's event started a new coalescing window, still pending.
        assert!(coalescer.has_pending());
        let flushed = coalescer.flush();
        assert_eq!(flushed, vec![StackEvent::AxisMotion { device_id: 2, axis: Axis::X, axisrel: 4, flags: InputEventFlags::NONE }]);
    }

    #[test]
    fn stale_pending_pair_flushes_before_a_new_event_is_absorbed() {
        let mut coalescer = MotionCoalescer::new();
        coalescer.feed(1, RawInput::Axis { axis: Axis::X, value: 1, absolute: false }, 0);
        let events = coalescer.feed(1, RawInput::Axis { axis: Axis::X, value: 5, absolute: false }, 11);
        assert_eq!(events, vec![StackEvent::AxisMotion { device_id: 1, axis: Axis::X, axisrel: 1, flags: InputEventFlags::NONE }]);
        assert!(coalescer.has_pending(), "the new event starts its own pending pair");
    }

    #[test]
    fn absolute_axis_event_overwrites_rather_than_accumulates() {
        let mut coalescer = MotionCoalescer::new();
        coalescer.feed(1, RawInput::Axis { axis: Axis::X, value: 100, absolute: true }, 0);
        coalescer.feed(1, RawInput::Axis { axis: Axis::X, value: 200, absolute: true }, 1);
        let flushed = coalescer.flush();
        assert_eq!(flushed, vec![StackEvent::AxisMotion { device_id: 1, axis: Axis::X, axisrel: 200, flags: InputEventFlags::NONE }]);
    }

    #[test]
    fn non_axis_event_forces_a_flush_then_dispatches_itself() {
        let mut coalescer = MotionCoalescer::new();
        coalescer.feed(1, RawInput::Axis { axis: Axis::X, value: 7, absolute: false }, 0);
        let events = coalescer.feed(1, RawInput::Button { code: 1, pressed: true }, 1);
        assert_eq!(
            events,
            vec![
                StackEvent::AxisMotion { device_id: 1, axis: Axis::X, axisrel: 7, flags: InputEventFlags::NONE },
                StackEvent::Button { device_id: 1, code: 1, pressed: true },
            ]
        );
    }
}
