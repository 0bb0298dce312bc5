use log::{debug, info, warn};

use crate::clock::Clock;
use crate::countdown::breakdown::{compute_duration, progress};
use crate::reminder::notifier::{Notifier, fallback_alert};
use crate::reminder::scheduler::ReminderScheduler;
use crate::reminder::timer::{TimerHost, TimerQueue};
use crate::render::{CountdownView, render_line};
use crate::settings::Settings;
use crate::theme::palette;
use crate::zone::{ZoneRef, to_naive_local};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutput {
    pub line: String,
    pub alerts: Vec<String>,
}

/// Ties the settings, clock, reminder timers and notifier together for the tick loop.
pub struct CountdownDriver<C: Clock, N: Notifier, T: TimerHost = TimerQueue> {
    settings: Settings,
    zone: ZoneRef,
    clock: C,
    notifier: N,
    timers: T,
    reminders: ReminderScheduler,
    permission_granted: bool,
    color: bool,
}

impl<C: Clock, N: Notifier> CountdownDriver<C, N> {
    /// Starts without notification permission; call [`CountdownDriver::set_permission`]
    /// once the answer is known.
    pub fn new(settings: Settings, zone: ZoneRef, clock: C, notifier: N, color: bool) -> Self {
        Self::with_timers(settings, zone, clock, notifier, TimerQueue::new(), color)
    }
}

impl<C: Clock, N: Notifier, T: TimerHost> CountdownDriver<C, N, T> {
    pub fn with_timers(
        settings: Settings,
        zone: ZoneRef,
        clock: C,
        notifier: N,
        timers: T,
        color: bool,
    ) -> Self {
        let reminders = ReminderScheduler::new(settings.title.clone());
        Self {
            settings,
            zone,
            clock,
            notifier,
            timers,
            reminders,
            permission_granted: false,
            color,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[cfg(test)]
    pub fn armed_timers(&self) -> usize {
        self.timers.armed_count()
    }

    pub fn set_permission(&mut self, granted: bool) {
        let was_granted = self.permission_granted;
        self.permission_granted = granted;
        if granted != was_granted {
            info!(
                "notification permission {}",
                if granted { "granted" } else { "revoked" }
            );
            self.reschedule();
        }
    }

    /// Replaces the settings and re-arms reminders when anything they depend on moved.
    pub fn apply_settings(&mut self, next: Settings) {
        let current = &self.settings;
        let needs_reschedule = current.target != next.target
            || current.reminders != next.reminders
            || current.notifications_enabled != next.notifications_enabled;
        if current.title != next.title {
            self.reminders.set_title(next.title.clone());
        }
        self.settings = next;
        if needs_reschedule {
            self.reschedule();
        }
    }

    /// Returns how many reminder timers are armed afterwards.
    pub fn reschedule(&mut self) -> usize {
        if !self.settings.notifications_enabled || !self.permission_granted {
            self.reminders.cancel_all(&mut self.timers);
            return 0;
        }
        let armed = self.reminders.schedule(
            &mut self.timers,
            self.settings.target,
            self.settings.reminders.iter().copied(),
            &self.clock,
        );
        match self.reminders.next_fire_at() {
            Some(next) => info!("{armed} reminder(s) armed, next at {next}"),
            None => info!("no reminders left to arm"),
        }
        armed
    }

    pub fn tick(&mut self) -> TickOutput {
        let mut alerts = Vec::new();
        for handle in self.timers.take_expired(self.clock.now()) {
            let Some(fired) = self
                .reminders
                .on_timer(handle, &self.clock, &mut self.notifier)
            else {
                debug!("ignoring stale timer {handle:?}");
                continue;
            };
            if !fired.delivered {
                warn!(
                    "reminder {} before target not delivered, showing it in place",
                    describe_offset(fired.offset_ms)
                );
                alerts.push(fallback_alert(&fired.payload));
            }
        }

        let now = self.clock.now();
        let breakdown = compute_duration(self.settings.target, now);
        let line = render_line(&CountdownView {
            title: &self.settings.title,
            breakdown: &breakdown,
            show_seconds: self.settings.show_seconds,
            progress: progress(self.settings.start, self.settings.target, now),
            palette: palette(self.settings.color_scheme),
            color: self.color,
        });
        TickOutput { line, alerts }
    }

    /// Milliseconds from `now` until the next whole second of the clock.
    pub fn millis_until_next_tick(&self) -> u64 {
        let into_second = self.clock.now().unix_millis().rem_euclid(1_000);
        (1_000 - into_second) as u64
    }

    /// The target as it would be pre-filled in an edit field.
    pub fn edit_value(&self) -> String {
        to_naive_local(self.settings.target, self.zone)
            .map(|local| local.to_string())
            .unwrap_or_default()
    }

    pub fn status_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Title: {}", self.settings.title),
            format!("Zone: {}", self.zone.id()),
            format!("Target: {}", self.edit_value()),
            format!(
                "Started: {}",
                to_naive_local(self.settings.start, self.zone)
                    .map(|local| local.to_string())
                    .unwrap_or_default()
            ),
            format!(
                "Notifications: {}",
                if self.settings.notifications_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            ),
            format!("Pending reminders: {}", self.reminders.pending_len()),
        ];
        for reminder in self.reminders.pending() {
            let fire_at = to_naive_local(reminder.fire_at, self.zone)
                .map(|local| local.to_string())
                .unwrap_or_default();
            lines.push(format!(
                "  {} before -> {fire_at}",
                describe_offset(reminder.offset_ms)
            ));
        }
        lines
    }
}

impl<C: Clock, N: Notifier, T: TimerHost> Drop for CountdownDriver<C, N, T> {
    fn drop(&mut self) {
        self.reminders.cancel_all(&mut self.timers);
    }
}

/// Renders an offset in the largest unit that divides it evenly.
pub fn describe_offset(offset_ms: u64) -> String {
    const UNITS: [(u64, &str); 5] = [
        (86_400_000, "d"),
        (3_600_000, "h"),
        (60_000, "m"),
        (1_000, "s"),
        (1, "ms"),
    ];
    if offset_ms == 0 {
        return "0s".to_string();
    }
    UNITS
        .iter()
        .find(|(unit_ms, _)| offset_ms % unit_ms == 0)
        .map(|(unit_ms, suffix)| format!("{}{suffix}", offset_ms / unit_ms))
        .unwrap_or_else(|| format!("{offset_ms}ms"))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::clock::{Instant, ManualClock};
    use crate::reminder::notifier::ReminderPayload;
    use crate::reminder::timer::TimerHandle;

    #[derive(Clone, Default)]
    struct SharedTimers(Rc<RefCell<TimerQueue>>);

    impl TimerHost for SharedTimers {
        fn arm(&mut self, now: Instant, delay_ms: u64) -> TimerHandle {
            self.0.borrow_mut().arm(now, delay_ms)
        }

        fn cancel(&mut self, handle: TimerHandle) -> bool {
            self.0.borrow_mut().cancel(handle)
        }

        fn armed_count(&self) -> usize {
            self.0.borrow().armed_count()
        }

        fn take_expired(&mut self, now: Instant) -> Vec<TimerHandle> {
            self.0.borrow_mut().take_expired(now)
        }
    }

    struct Outbox {
        accept: bool,
        sent: Vec<ReminderPayload>,
    }

    impl Notifier for Outbox {
        fn notify(&mut self, payload: &ReminderPayload) -> bool {
            self.sent.push(payload.clone());
            self.accept
        }
    }

    fn start() -> Instant {
        Instant::parse_rfc3339("2025-01-15T10:00:00Z").expect("valid")
    }

    fn settings() -> Settings {
        let mut settings = Settings::defaults_at(start());
        settings.title = "Physics".to_string();
        settings.target = Instant::parse_rfc3339("2025-01-15T10:30:00Z").expect("valid");
        settings.reminders = [600_000, 3_600_000].into_iter().collect();
        settings.notifications_enabled = true;
        settings
    }

    fn driver(accept: bool) -> CountdownDriver<ManualClock, Outbox> {
        CountdownDriver::new(
            settings(),
            ZoneRef::Kolkata,
            ManualClock::new(start()),
            Outbox {
                accept,
                sent: Vec::new(),
            },
            false,
        )
    }

    #[test]
    fn nothing_is_armed_until_permission_arrives() {
        let mut driver = driver(true);
        assert_eq!(driver.armed_timers(), 0);
        driver.set_permission(true);
        assert_eq!(driver.reminders.pending_len(), 1);
        assert_eq!(driver.armed_timers(), 1);
        driver.set_permission(false);
        assert_eq!(driver.armed_timers(), 0);
    }

    #[test]
    fn tick_renders_countdown_line() {
        let mut driver = driver(true);
        let output = driver.tick();
        assert_eq!(
            output.line,
            "Physics  00 : 00 : 30 : 00  30 minutes remaining.  [--------------------]   0%"
        );
        assert!(output.alerts.is_empty());
    }

    #[test]
    fn reminder_fires_once_through_notifier() {
        let mut driver = driver(true);
        driver.set_permission(true);
        driver.clock().advance_ms(20 * 60_000);
        let output = driver.tick();
        assert!(output.alerts.is_empty());
        assert_eq!(driver.notifier.sent.len(), 1);
        assert_eq!(driver.notifier.sent[0].body, "10 minutes remaining.");

        driver.clock().advance_ms(1_000);
        driver.tick();
        assert_eq!(driver.notifier.sent.len(), 1);
        assert_eq!(driver.armed_timers(), 0);
    }

    #[test]
    fn undeliverable_reminder_becomes_alert() {
        let mut driver = driver(false);
        driver.set_permission(true);
        driver.clock().advance_ms(20 * 60_000);
        let output = driver.tick();
        assert_eq!(
            output.alerts,
            vec!["[reminder] Physics: 10 minutes remaining.".to_string()]
        );
    }

    #[test]
    fn settings_changes_rearm_reminders() {
        let mut driver = driver(true);
        driver.set_permission(true);
        assert_eq!(driver.armed_timers(), 1);

        let mut later = driver.settings().clone();
        later.target = Instant::parse_rfc3339("2025-01-15T12:00:00Z").expect("valid");
        driver.apply_settings(later.clone());
        assert_eq!(driver.armed_timers(), 2);

        later.notifications_enabled = false;
        driver.apply_settings(later.clone());
        assert_eq!(driver.armed_timers(), 0);

        later.notifications_enabled = true;
        later.title = "Chemistry".to_string();
        driver.apply_settings(later);
        assert_eq!(driver.armed_timers(), 2);
        driver.clock().advance_ms(60 * 60_000);
        driver.tick();
        assert_eq!(driver.notifier.sent[0].title, "Chemistry");
    }

    #[test]
    fn edit_value_and_status_use_the_zone() {
        let mut driver = driver(true);
        driver.set_permission(true);
        assert_eq!(driver.edit_value(), "2025-01-15T16:00");
        let status = driver.status_lines();
        assert!(status.contains(&"Zone: Asia/Kolkata".to_string()));
        assert!(status.contains(&"Started: 2025-01-15T15:30".to_string()));
        assert!(status.contains(&"  10m before -> 2025-01-15T15:50".to_string()));
    }

    #[test]
    fn dropping_the_driver_cancels_its_timers() {
        let timers = SharedTimers::default();
        let mut driver = CountdownDriver::with_timers(
            settings(),
            ZoneRef::Kolkata,
            ManualClock::new(start()),
            Outbox {
                accept: true,
                sent: Vec::new(),
            },
            timers.clone(),
            false,
        );
        driver.set_permission(true);
        assert_eq!(timers.armed_count(), 1);

        drop(driver);
        assert_eq!(timers.armed_count(), 0);
    }

    #[test]
    fn next_tick_lands_on_whole_second() {
        let driver = driver(true);
        assert_eq!(driver.millis_until_next_tick(), 1_000);
        driver.clock().advance_ms(250);
        assert_eq!(driver.millis_until_next_tick(), 750);
    }

    #[test]
    fn offsets_use_largest_even_unit() {
        assert_eq!(describe_offset(86_400_000), "1d");
        assert_eq!(describe_offset(5_400_000), "90m");
        assert_eq!(describe_offset(1_500), "1500ms");
        assert_eq!(describe_offset(0), "0s");
    }
}
