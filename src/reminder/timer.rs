use std::collections::BTreeMap;

use crate::clock::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

/// Something that can hold one-shot timers on the caller's behalf.
pub trait TimerHost {
    fn arm(&mut self, now: Instant, delay_ms: u64) -> TimerHandle;
    /// Returns `false` when the handle was not armed.
    fn cancel(&mut self, handle: TimerHandle) -> bool;
    fn armed_count(&self) -> usize;
    /// Removes and returns every timer due at `now`, earliest deadline first.
    fn take_expired(&mut self, now: Instant) -> Vec<TimerHandle>;
}

/// Cooperative timer queue polled from the single driver loop.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_handle: u64,
    deadlines: BTreeMap<TimerHandle, Instant>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimerHost for TimerQueue {
    fn arm(&mut self, now: Instant, delay_ms: u64) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        let delay = i64::try_from(delay_ms).unwrap_or(i64::MAX);
        self.deadlines.insert(handle, now.saturating_add_ms(delay));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.deadlines.remove(&handle).is_some()
    }

    fn armed_count(&self) -> usize {
        self.deadlines.len()
    }

    fn take_expired(&mut self, now: Instant) -> Vec<TimerHandle> {
        let mut due = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(handle, deadline)| (*deadline, *handle))
            .collect::<Vec<_>>();
        due.sort();
        for (_, handle) in &due {
            self.deadlines.remove(handle);
        }
        due.into_iter().map(|(_, handle)| handle).collect()
    }
}
