use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};

use crate::clock::{Clock, Instant};
use crate::countdown::breakdown::compute_duration;
use crate::countdown::format::format_human;
use crate::reminder::notifier::{Notifier, ReminderPayload};
use crate::reminder::timer::{TimerHandle, TimerHost};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledReminder {
    pub offset_ms: u64,
    pub handle: TimerHandle,
    pub fire_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredReminder {
    pub offset_ms: u64,
    pub payload: ReminderPayload,
    pub delivered: bool,
}

/// Owns the armed reminder timers for one target.
///
/// Every `schedule` call starts from a clean slate, so repeating it with the same
/// inputs never leaves duplicate timers behind. Each armed offset fires at most once.
#[derive(Debug)]
pub struct ReminderScheduler {
    title: String,
    target: Option<Instant>,
    pending: BTreeMap<u64, ScheduledReminder>,
}

impl ReminderScheduler {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            target: None,
            pending: BTreeMap::new(),
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Re-arms one timer per distinct offset whose fire time is still ahead of the
    /// clock. Returns how many timers were armed.
    pub fn schedule<H, C, I>(
        &mut self,
        timers: &mut H,
        target: Instant,
        offsets: I,
        clock: &C,
    ) -> usize
    where
        H: TimerHost + ?Sized,
        C: Clock + ?Sized,
        I: IntoIterator<Item = u64>,
    {
        self.cancel_all(timers);
        self.target = Some(target);

        let now = clock.now();
        let offsets = offsets.into_iter().collect::<BTreeSet<_>>();
        for offset_ms in offsets {
            let lead_ms = i64::try_from(offset_ms).unwrap_or(i64::MAX);
            let fire_at = target.saturating_sub_ms(lead_ms);
            if fire_at <= now {
                debug!("skipping reminder {offset_ms}ms before target: already due at {fire_at}");
                continue;
            }
            let delay_ms = u64::try_from(fire_at - now).unwrap_or(0);
            let handle = timers.arm(now, delay_ms);
            debug!("armed reminder {offset_ms}ms before target, firing at {fire_at}");
            self.pending.insert(
                offset_ms,
                ScheduledReminder {
                    offset_ms,
                    handle,
                    fire_at,
                },
            );
        }
        self.pending.len()
    }

    /// Releases every armed timer. Returns how many were still pending.
    pub fn cancel_all<H>(&mut self, timers: &mut H) -> usize
    where
        H: TimerHost + ?Sized,
    {
        let released = self.pending.len();
        for (_, reminder) in std::mem::take(&mut self.pending) {
            timers.cancel(reminder.handle);
        }
        if released > 0 {
            debug!("cancelled {released} pending reminder(s)");
        }
        released
    }

    /// Handles an expired timer. Handles this scheduler did not arm, or has since
    /// cancelled, are ignored.
    pub fn on_timer<C, N>(
        &mut self,
        handle: TimerHandle,
        clock: &C,
        notifier: &mut N,
    ) -> Option<FiredReminder>
    where
        C: Clock + ?Sized,
        N: Notifier + ?Sized,
    {
        let target = self.target?;
        let offset_ms = self
            .pending
            .values()
            .find(|reminder| reminder.handle == handle)
            .map(|reminder| reminder.offset_ms)?;
        self.pending.remove(&offset_ms);

        let breakdown = compute_duration(target, clock.now());
        let payload = ReminderPayload {
            title: self.title.clone(),
            body: format_human(&breakdown),
        };
        let delivered = notifier.notify(&payload);
        if delivered {
            info!("reminder {offset_ms}ms before target delivered");
        } else {
            warn!("reminder {offset_ms}ms before target could not be delivered");
        }
        Some(FiredReminder {
            offset_ms,
            payload,
            delivered,
        })
    }

    pub fn pending(&self) -> impl Iterator<Item = &ScheduledReminder> {
        self.pending.values()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn next_fire_at(&self) -> Option<Instant> {
        self.pending.values().map(|reminder| reminder.fire_at).min()
    }
}
