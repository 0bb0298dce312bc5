//! Conversion between wall-clock `YYYY-MM-DDTHH:MM` strings and instants.
//!
//! Two zones exist. `Asia/Kolkata` is a fixed +05:30 offset with no DST, so the
//! conversion is a constant shift. The host zone is looked up once at startup with
//! [`AmbientZone::system`] and then passed around as a value; pin it with
//! [`AmbientZone::Pinned`] when results must not depend on the machine.

use std::env;
use std::fmt;

use chrono::{FixedOffset, Local, LocalResult, NaiveDateTime, Offset, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use log::{debug, warn};

use crate::clock::Instant;

pub const KOLKATA_ID: &str = "Asia/Kolkata";
pub const HOST_ID: &str = "host";
const KOLKATA_OFFSET_SECS: i32 = 5 * 3_600 + 30 * 60;
const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbientZone {
    /// IANA zone with its full DST rules.
    Named(Tz),
    Pinned(FixedOffset),
}

impl AmbientZone {
    /// Resolves the machine's zone from `TZ`, then the OS setting. When neither names
    /// a known IANA zone the current local offset is pinned for the whole run.
    pub fn system() -> Self {
        let from_env = env::var("TZ").ok();
        let detected = iana_time_zone::get_timezone()
            .map_err(|err| debug!("could not detect the system time zone: {err}"))
            .ok();
        match named_zone(from_env.as_deref(), detected.as_deref()) {
            Some(tz) => AmbientZone::Named(tz),
            None => {
                let offset = Local::now().offset().fix();
                warn!("host time zone is not a known IANA zone, pinning UTC{offset}");
                AmbientZone::Pinned(offset)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AmbientZone::Named(tz) => tz.name().to_string(),
            AmbientZone::Pinned(offset) => format!("pinned UTC{offset}"),
        }
    }
}

// `TZ` wins over the OS setting; a leading ':' is allowed as in POSIX.
fn named_zone(from_env: Option<&str>, detected: Option<&str>) -> Option<Tz> {
    let parse = |name: &str| name.trim().trim_start_matches(':').parse::<Tz>().ok();
    from_env
        .filter(|name| !name.trim().is_empty())
        .and_then(parse)
        .or_else(|| detected.and_then(parse))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneRef {
    Kolkata,
    Host(AmbientZone),
}

impl ZoneRef {
    pub fn id(&self) -> &'static str {
        match self {
            ZoneRef::Kolkata => KOLKATA_ID,
            ZoneRef::Host(_) => HOST_ID,
        }
    }
}

/// Wall-clock date and time at minute precision, with no zone attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaiveLocal(NaiveDateTime);

impl NaiveLocal {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        NaiveDateTime::parse_from_str(text, NAIVE_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
            .ok()
            .and_then(truncate_to_minute)
            .map(Self)
    }
}

impl fmt::Display for NaiveLocal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(NAIVE_FORMAT))
    }
}

pub fn kolkata_offset() -> Option<FixedOffset> {
    FixedOffset::east_opt(KOLKATA_OFFSET_SECS)
}

/// Parses `+HH:MM`, `-HH:MM`, `Z` or `UTC`.
pub fn parse_utc_offset(text: &str) -> Option<FixedOffset> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3_600 + minutes * 60))
}

pub fn to_naive_local(instant: Instant, zone: ZoneRef) -> Option<NaiveLocal> {
    let utc = instant.to_datetime()?.naive_utc();
    let wall = match zone {
        ZoneRef::Kolkata => wall_time(&kolkata_offset()?, utc),
        ZoneRef::Host(AmbientZone::Named(tz)) => wall_time(&tz, utc),
        ZoneRef::Host(AmbientZone::Pinned(offset)) => wall_time(&offset, utc),
    }?;
    truncate_to_minute(wall).map(NaiveLocal)
}

pub fn from_naive_local(text: &str, zone: ZoneRef) -> Option<Instant> {
    let local = NaiveLocal::parse(text)?;
    match zone {
        ZoneRef::Kolkata => resolve_instant(&kolkata_offset()?, local.0),
        ZoneRef::Host(AmbientZone::Named(tz)) => resolve_instant(&tz, local.0),
        ZoneRef::Host(AmbientZone::Pinned(offset)) => resolve_instant(&offset, local.0),
    }
}

pub fn is_valid(text: &str, zone: ZoneRef) -> bool {
    from_naive_local(text, zone).is_some()
}

fn truncate_to_minute(naive: NaiveDateTime) -> Option<NaiveDateTime> {
    naive.with_second(0)?.with_nanosecond(0)
}

// `None` when the shifted wall time leaves chrono's calendar range.
fn wall_time<Z>(timezone: &Z, utc: NaiveDateTime) -> Option<NaiveDateTime>
where
    Z: TimeZone,
{
    let offset = timezone.offset_from_utc_datetime(&utc).fix();
    utc.checked_add_offset(offset)
}

// Gaps resolve to nothing, folds to the earlier instant.
fn resolve_instant<Z>(timezone: &Z, naive: NaiveDateTime) -> Option<Instant>
where
    Z: TimeZone,
{
    let resolved = match timezone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(first, _second) => first,
        LocalResult::None => return None,
    };
    Some(Instant::from_datetime(resolved.with_timezone(&Utc)))
}
