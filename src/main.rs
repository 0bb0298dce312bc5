mod clock;
mod countdown;
mod driver;
mod logging;
mod reminder;
mod render;
mod settings;
mod theme;
mod zone;

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::FixedOffset;
use clap::{Parser, ValueEnum};
use log::{LevelFilter, info};

use crate::clock::{Clock, Instant, ManualClock, SystemClock};
use crate::driver::CountdownDriver;
use crate::reminder::notifier::{Notifier, TerminalNotifier};
use crate::settings::{ColorScheme, Settings, load_settings_or_default, save_settings_or_warn};
use crate::zone::{AmbientZone, ZoneRef, from_naive_local, is_valid, parse_utc_offset};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliZone {
    #[value(alias = "Asia/Kolkata")]
    Kolkata,
    Host,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliScheme {
    Default,
    Midnight,
    Ocean,
    Forest,
    Sunset,
}

impl From<CliScheme> for ColorScheme {
    fn from(value: CliScheme) -> Self {
        match value {
            CliScheme::Default => ColorScheme::Default,
            CliScheme::Midnight => ColorScheme::Midnight,
            CliScheme::Ocean => ColorScheme::Ocean,
            CliScheme::Forest => ColorScheme::Forest,
            CliScheme::Sunset => ColorScheme::Sunset,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(value: CliLogLevel) -> Self {
        match value {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "examclock",
    version,
    about = "Terminal exam countdown with reminder notifications"
)]
struct Cli {
    #[arg(long, default_value = "examclock.json")]
    settings: PathBuf,

    /// Zone used to read and show wall-clock datetimes.
    #[arg(long, value_enum, default_value_t = CliZone::Kolkata)]
    zone: CliZone,

    /// Pin the host zone to a fixed UTC offset such as +02:00.
    #[arg(long, allow_hyphen_values = true, value_parser = parse_offset_arg)]
    host_offset: Option<FixedOffset>,

    /// New target as YYYY-MM-DDTHH:MM in the selected zone.
    #[arg(long)]
    target: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    show_seconds: Option<bool>,

    #[arg(long, value_enum)]
    scheme: Option<CliScheme>,

    /// Reminder lead times such as 1d, 2h, 10m, 90s or 500ms. Replaces the saved set.
    #[arg(long, value_delimiter = ',', value_parser = parse_duration_token)]
    remind: Vec<u64>,

    #[arg(long, conflicts_with = "remind")]
    clear_reminders: bool,

    #[arg(long)]
    notifications: Option<bool>,

    /// Treat notification permission as denied.
    #[arg(long)]
    deny_notifications: bool,

    /// Run against a frozen clock starting at this RFC 3339 instant.
    #[arg(long, value_parser = parse_instant_arg)]
    now: Option<Instant>,

    /// Print the target as an editable local datetime and exit.
    #[arg(long)]
    print_target: bool,

    #[arg(long)]
    status: bool,

    #[arg(long)]
    once: bool,

    #[arg(long)]
    ticks: Option<u64>,

    #[arg(long)]
    no_color: bool,

    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level.into());
    if cli.ticks == Some(0) {
        bail!("--ticks must be greater than zero");
    }

    let zone = match cli.zone {
        CliZone::Kolkata => ZoneRef::Kolkata,
        CliZone::Host => ZoneRef::Host(match cli.host_offset {
            Some(offset) => AmbientZone::Pinned(offset),
            None => AmbientZone::system(),
        }),
    };
    if let ZoneRef::Host(ambient) = zone {
        info!("host zone resolved to {}", ambient.describe());
    }

    match cli.now {
        Some(start) => {
            let clock = ManualClock::new(start);
            start_driver(&cli, zone, clock, |clock, delay_ms| {
                clock.advance_ms(i64::try_from(delay_ms).unwrap_or(i64::MAX));
            })
        }
        None => start_driver(&cli, zone, SystemClock, |_, delay_ms| {
            thread::sleep(Duration::from_millis(delay_ms));
        }),
    }
}

fn start_driver<C, W>(cli: &Cli, zone: ZoneRef, clock: C, wait: W) -> Result<()>
where
    C: Clock,
    W: Fn(&C, u64),
{
    let now = clock.now();
    let settings = load_settings_or_default(&cli.settings, now);

    let stdout = io::stdout();
    let color = stdout.is_terminal() && !cli.no_color;
    let notifier = TerminalNotifier::stdout(stdout.is_terminal());
    let mut driver = CountdownDriver::new(settings, zone, clock, notifier, color);
    driver.set_permission(!cli.deny_notifications);

    let mut edited = driver.settings().clone();
    if apply_edits(cli, &mut edited, zone, now)? {
        save_settings_or_warn(&cli.settings, &edited);
        driver.apply_settings(edited);
    }

    if cli.print_target {
        writeln!(io::stdout(), "{}", driver.edit_value())?;
        return Ok(());
    }
    if cli.status {
        let mut out = io::stdout().lock();
        for line in driver.status_lines() {
            writeln!(out, "{line}")?;
        }
        return Ok(());
    }

    let limit = if cli.once { Some(1) } else { cli.ticks };
    run_ticks(&mut driver, limit, wait)
}

fn run_ticks<C, N, W>(
    driver: &mut CountdownDriver<C, N>,
    limit: Option<u64>,
    wait: W,
) -> Result<()>
where
    C: Clock,
    N: Notifier,
    W: Fn(&C, u64),
{
    let mut rendered = 0_u64;
    loop {
        let output = driver.tick();
        {
            let mut out = io::stdout().lock();
            for alert in &output.alerts {
                writeln!(out, "{alert}").context("failed to write reminder alert")?;
            }
            writeln!(out, "{}", output.line).context("failed to write countdown")?;
        }
        rendered += 1;
        if limit.is_some_and(|limit| rendered >= limit) {
            return Ok(());
        }
        wait(driver.clock(), driver.millis_until_next_tick());
    }
}

fn apply_edits(cli: &Cli, settings: &mut Settings, zone: ZoneRef, now: Instant) -> Result<bool> {
    let before = settings.clone();

    if let Some(text) = cli.target.as_deref() {
        if !is_valid(text, zone) {
            bail!(
                "invalid --target '{text}' for zone {}; expected YYYY-MM-DDTHH:MM",
                zone.id()
            );
        }
        if let Some(target) = from_naive_local(text, zone) {
            settings.target = target;
            settings.start = now;
        }
    }
    if let Some(title) = cli.title.as_deref() {
        let title = title.trim();
        if title.is_empty() {
            bail!("--title must not be empty");
        }
        settings.title = title.to_string();
    }
    if let Some(show_seconds) = cli.show_seconds {
        settings.show_seconds = show_seconds;
    }
    if let Some(scheme) = cli.scheme {
        settings.color_scheme = scheme.into();
    }
    if cli.clear_reminders {
        settings.reminders.clear();
    } else if !cli.remind.is_empty() {
        settings.reminders = cli.remind.iter().copied().collect();
    }
    if let Some(enabled) = cli.notifications {
        settings.notifications_enabled = enabled;
    }

    Ok(*settings != before)
}

fn parse_offset_arg(input: &str) -> Result<FixedOffset, String> {
    parse_utc_offset(input).ok_or_else(|| format!("invalid UTC offset '{input}', expected +HH:MM"))
}

fn parse_instant_arg(input: &str) -> Result<Instant, String> {
    Instant::parse_rfc3339(input)
        .ok_or_else(|| format!("invalid instant '{input}', expected RFC 3339"))
}

/// Parses a reminder lead time into milliseconds.
fn parse_duration_token(token: &str) -> Result<u64> {
    let token = token.trim();
    let (digits, unit_ms) = if let Some(raw) = token.strip_suffix("ms") {
        (raw, 1)
    } else if let Some(raw) = token.strip_suffix('s') {
        (raw, 1_000)
    } else if let Some(raw) = token.strip_suffix('m') {
        (raw, 60_000)
    } else if let Some(raw) = token.strip_suffix('h') {
        (raw, 3_600_000)
    } else if let Some(raw) = token.strip_suffix('d') {
        (raw, 86_400_000)
    } else {
        (token, 60_000)
    };
    let value: u64 = digits
        .parse()
        .with_context(|| format!("invalid reminder lead time '{token}'"))?;
    value
        .checked_mul(unit_ms)
        .with_context(|| format!("reminder lead time '{token}' is too large"))
}
