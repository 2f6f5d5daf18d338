//! Per-subtype event statistics with replay-on-enable semantics (spec §4.5
//! "Statistics, when enabled, maintain a per-subtype counter; enabling
//! replays all currently-queued events through the counter; disabling
//! zeroes the counters", testable property 10).

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::types::{Event, EventClass};

#[derive(Debug, Default, Clone)]
pub struct Statistics {
    enabled: bool,
    counts: HashMap<(EventClass, u32), u64>,
}

impl Statistics {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn count(&self, class: EventClass, subtype: u32) -> u64 {
        self.counts.get(&(class, subtype)).copied().unwrap_or(0)
    }

    pub fn record(&mut self, event: &Event) {
        if !self.enabled {
            return;
        }
        *self.counts.entry((event.class(), event.subtype())).or_insert(0) += 1;
    }

    /// Enables statistics, replaying every currently queued event through
    /// the counters; disabling zeroes them.
    pub fn set_enabled(&mut self, enabled: bool, queue: &VecDeque<Event>) {
        self.counts.clear();
        self.enabled = enabled;
        if enabled {
            for event in queue {
                *self.counts.entry((event.class(), event.subtype())).or_insert(0) += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InputEvent, WindowEvent};

    #[test]
    fn enabling_replays_queued_events_and_disabling_resets() {
        let mut stats = Statistics::default();
        let mut queue = VecDeque::new();
        queue.push_back(Event::Input(InputEvent { device_id: 1, event_type: 7 }));
        queue.push_back(Event::Input(InputEvent { device_id: 1, event_type: 7 }));
        queue.push_back(Event::Window(WindowEvent { window_id: 1, event_type: 3 }));

        stats.set_enabled(true, &queue);
        assert_eq!(stats.count(EventClass::Input, 7), 2);
        assert_eq!(stats.count(EventClass::Window, 3), 1);

        stats.set_enabled(false, &queue);
        assert_eq!(stats.count(EventClass::Input, 7), 0);
        assert!(!stats.is_enabled());
    }
}
