use crate::clock::Instant;

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Magnitude-only split of a signed millisecond delta.
///
/// `days`, `hours`, `minutes` and `seconds` always describe `|total_ms|`; the sign
/// lives in `total_ms` and `is_past`. A zero delta is not past.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationBreakdown {
    pub total_ms: i64,
    pub days: u64,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub is_past: bool,
}

impl DurationBreakdown {
    pub fn from_millis(total_ms: i64) -> Self {
        let mut rest = total_ms.unsigned_abs();
        let days = rest / MS_PER_DAY;
        rest %= MS_PER_DAY;
        let hours = rest / MS_PER_HOUR;
        rest %= MS_PER_HOUR;
        let minutes = rest / MS_PER_MINUTE;
        rest %= MS_PER_MINUTE;
        let seconds = rest / MS_PER_SECOND;

        Self {
            total_ms,
            days,
            hours: hours as u32,
            minutes: minutes as u32,
            seconds: seconds as u32,
            is_past: total_ms < 0,
        }
    }

    /// True while less than one whole second separates target and now.
    pub fn is_within_a_second(&self) -> bool {
        self.total_ms.unsigned_abs() < MS_PER_SECOND
    }
}

pub fn compute_duration(target: Instant, now: Instant) -> DurationBreakdown {
    DurationBreakdown::from_millis(target - now)
}

/// Elapsed share of the `start..target` span at `now`, clamped to `0.0..=1.0`.
pub fn progress(start: Instant, target: Instant, now: Instant) -> f64 {
    let span = target - start;
    if span <= 0 {
        return if now >= target { 1.0 } else { 0.0 };
    }
    let elapsed = now - start;
    (elapsed as f64 / span as f64).clamp(0.0, 1.0)
}
