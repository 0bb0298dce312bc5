use crate::countdown::breakdown::DurationBreakdown;

const ZERO_CLOCK: &str = "00 : 00 : 00";

pub fn format_clock(breakdown: &DurationBreakdown, show_seconds: bool) -> String {
    if !show_seconds && breakdown.is_within_a_second() {
        return ZERO_CLOCK.to_string();
    }

    let sign = if breakdown.is_past && breakdown.total_ms != 0 {
        "-"
    } else {
        ""
    };
    let mut text = format!(
        "{sign}{:02} : {:02} : {:02}",
        breakdown.days, breakdown.hours, breakdown.minutes
    );
    if show_seconds {
        text.push_str(&format!(" : {:02}", breakdown.seconds));
    }
    text
}

pub fn format_human(breakdown: &DurationBreakdown) -> String {
    if breakdown.is_within_a_second() {
        return if breakdown.is_past {
            "Exam passed a moment ago.".to_string()
        } else {
            "Less than a second remaining.".to_string()
        };
    }

    let parts = [
        (breakdown.days, "day"),
        (u64::from(breakdown.hours), "hour"),
        (u64::from(breakdown.minutes), "minute"),
    ]
    .into_iter()
    .filter(|(value, _)| *value > 0)
    .map(|(value, unit)| pluralize(value, unit))
    .collect::<Vec<_>>();

    if parts.is_empty() {
        return if breakdown.is_past {
            "Exam passed.".to_string()
        } else {
            "Less than a minute remaining.".to_string()
        };
    }

    let suffix = if breakdown.is_past { "ago" } else { "remaining" };
    format!("{} {suffix}.", parts.join(", "))
}

fn pluralize(value: u64, unit: &str) -> String {
    if value == 1 {
        format!("{value} {unit}")
    } else {
        format!("{value} {unit}s")
    }
}
