use crate::countdown::breakdown::DurationBreakdown;
use crate::countdown::format::{format_clock, format_human};
use crate::theme::{Palette, paint};

const PROGRESS_WIDTH: usize = 20;

pub struct CountdownView<'a> {
    pub title: &'a str,
    pub breakdown: &'a DurationBreakdown,
    pub show_seconds: bool,
    pub progress: f64,
    pub palette: Palette,
    pub color: bool,
}

pub fn render_line(view: &CountdownView<'_>) -> String {
    let clock = format_clock(view.breakdown, view.show_seconds);
    let clock_color = if view.breakdown.is_past {
        view.palette.past
    } else {
        view.palette.clock
    };
    let percent = (view.progress * 100.0).floor() as u32;
    format!(
        "{}  {}  {}  {} {percent:>3}%",
        paint(view.title, view.palette.title, view.color),
        paint(&clock, clock_color, view.color),
        paint(&format_human(view.breakdown), view.palette.detail, view.color),
        progress_bar(view.progress),
    )
}

fn progress_bar(progress: f64) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * PROGRESS_WIDTH as f64).floor() as usize)
        .min(PROGRESS_WIDTH);
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled)
    )
}
