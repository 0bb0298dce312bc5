use std::cell::Cell;
use std::fmt;
use std::ops::Sub;

use chrono::{DateTime, Utc};

/// A point in time with millisecond resolution, counted from the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(i64);

impl Instant {
    pub const fn from_unix_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub const fn unix_millis(self) -> i64 {
        self.0
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    /// `None` when the instant is outside the range chrono can represent.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }

    pub fn parse_rfc3339(text: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
    }

    pub fn to_rfc3339(self) -> Option<String> {
        self.to_datetime()
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
    }

    pub fn saturating_add_ms(self, ms: i64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    pub fn saturating_sub_ms(self, ms: i64) -> Self {
        Self(self.0.saturating_sub(ms))
    }
}

impl Sub for Instant {
    type Output = i64;

    fn sub(self, rhs: Self) -> i64 {
        self.0.saturating_sub(rhs.0)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Some(text) => f.write_str(&text),
            None => write!(f, "<invalid instant {}ms>", self.0),
        }
    }
}

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::from_unix_millis(Utc::now().timestamp_millis())
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now.set(self.now.get().saturating_add_ms(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtraction_yields_signed_millis() {
        let a = Instant::from_unix_millis(1_000);
        let b = Instant::from_unix_millis(4_500);
        assert_eq!(b - a, 3_500);
        assert_eq!(a - b, -3_500);
    }

    #[test]
    fn rfc3339_accepts_offsets_and_normalises_to_utc() {
        let utc = Instant::parse_rfc3339("2025-01-15T10:30:00.000Z").expect("utc");
        let ist = Instant::parse_rfc3339("2025-01-15T16:00:00+05:30").expect("ist");
        assert_eq!(utc, ist);
        assert_eq!(
            utc.to_rfc3339().as_deref(),
            Some("2025-01-15T10:30:00.000Z")
        );
        assert!(Instant::parse_rfc3339("yesterday").is_none());
    }

    #[test]
    fn out_of_range_instant_has_no_datetime() {
        assert!(Instant::from_unix_millis(i64::MAX).to_datetime().is_none());
    }

    #[test]
    fn system_clock_is_close_to_chrono_now() {
        let before = Utc::now().timestamp_millis();
        let now = SystemClock.now().unix_millis();
        let after = Utc::now().timestamp_millis();
        assert!(before <= now && now <= after);
    }

    #[test]
    fn manual_clock_only_moves_when_advanced() {
        let clock = ManualClock::new(Instant::from_unix_millis(10));
        assert_eq!(clock.now(), Instant::from_unix_millis(10));
        clock.advance_ms(990);
        assert_eq!(clock.now(), Instant::from_unix_millis(1_000));
        clock.advance_ms(-995);
        assert_eq!(clock.now(), Instant::from_unix_millis(5));
    }
}
