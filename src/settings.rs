use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Instant;

const DEFAULT_TITLE: &str = "Exam";
const DEFAULT_COUNTDOWN_MS: i64 = 30 * 86_400_000;
const DEFAULT_REMINDERS_MS: [u64; 2] = [86_400_000, 3_600_000];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Default,
    Midnight,
    Ocean,
    Forest,
    Sunset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub title: String,
    pub target: Instant,
    pub start: Instant,
    pub show_seconds: bool,
    pub color_scheme: ColorScheme,
    pub reminders: BTreeSet<u64>,
    pub notifications_enabled: bool,
}

impl Settings {
    pub fn defaults_at(now: Instant) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            target: now.saturating_add_ms(DEFAULT_COUNTDOWN_MS),
            start: now,
            show_seconds: true,
            color_scheme: ColorScheme::Default,
            reminders: DEFAULT_REMINDERS_MS.into_iter().collect(),
            notifications_enabled: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unable to read settings file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON at line {line}, column {column}: {source}")]
    Json {
        line: usize,
        column: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {field} '{value}', expected an RFC 3339 instant")]
    InvalidInstant { field: &'static str, value: String },
    #[error("unable to encode settings")]
    Encode(#[from] serde_json::Error),
    #[error("unable to write settings file {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SettingsError {
    fn is_missing_file(&self) -> bool {
        matches!(self, SettingsError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

pub fn load_settings(path: &Path, now: Instant) -> Result<Settings, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings_text(&content, now)
}

/// Loads settings, falling back to defaults on any failure.
pub fn load_settings_or_default(path: &Path, now: Instant) -> Settings {
    match load_settings(path, now) {
        Ok(settings) => settings,
        Err(err) if err.is_missing_file() => {
            info!("no settings at {}, using defaults", path.display());
            Settings::defaults_at(now)
        }
        Err(err) => {
            warn!("{}; using defaults", error_chain(&err));
            Settings::defaults_at(now)
        }
    }
}

pub fn parse_settings_text(content: &str, now: Instant) -> Result<Settings, SettingsError> {
    let raw = serde_json::from_str::<SettingsFile>(content).map_err(|source| {
        SettingsError::Json {
            line: source.line(),
            column: source.column(),
            source,
        }
    })?;

    let defaults = Settings::defaults_at(now);
    let target = parse_instant_field("targetDate", raw.target_date)?.unwrap_or(defaults.target);
    let start = parse_instant_field("startDate", raw.start_date)?.unwrap_or(defaults.start);

    Ok(Settings {
        title: raw.title.unwrap_or(defaults.title),
        target,
        start,
        show_seconds: raw.show_seconds.unwrap_or(defaults.show_seconds),
        color_scheme: raw.color_scheme.unwrap_or(defaults.color_scheme),
        reminders: raw
            .notification_reminders
            .map(|offsets| offsets.into_iter().collect())
            .unwrap_or(defaults.reminders),
        notifications_enabled: raw
            .notification_enabled
            .unwrap_or(defaults.notifications_enabled),
    })
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let payload = SettingsFile {
        title: Some(settings.title.clone()),
        target_date: Some(format_instant_field("targetDate", settings.target)?),
        start_date: Some(format_instant_field("startDate", settings.start)?),
        show_seconds: Some(settings.show_seconds),
        color_scheme: Some(settings.color_scheme),
        notification_reminders: Some(settings.reminders.iter().copied().collect()),
        notification_enabled: Some(settings.notifications_enabled),
    };
    let text = serde_json::to_string_pretty(&payload)?;
    fs::write(path, format!("{text}\n")).map_err(|source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Saves settings, logging instead of failing.
pub fn save_settings_or_warn(path: &Path, settings: &Settings) -> bool {
    match save_settings(path, settings) {
        Ok(()) => true,
        Err(err) => {
            warn!("{}; settings were not saved", error_chain(&err));
            false
        }
    }
}

fn parse_instant_field(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<Instant>, SettingsError> {
    let Some(value) = value else {
        return Ok(None);
    };
    Instant::parse_rfc3339(&value)
        .map(Some)
        .ok_or(SettingsError::InvalidInstant { field, value })
}

fn format_instant_field(field: &'static str, instant: Instant) -> Result<String, SettingsError> {
    instant
        .to_rfc3339()
        .ok_or_else(|| SettingsError::InvalidInstant {
            field,
            value: instant.unix_millis().to_string(),
        })
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    show_seconds: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color_scheme: Option<ColorScheme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notification_reminders: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notification_enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn now() -> Instant {
        Instant::parse_rfc3339("2025-01-01T00:00:00Z").expect("valid")
    }

    #[test]
    fn parses_full_record() {
        let json = r#"
{
  "title": "Physics final",
  "targetDate": "2025-01-15T10:30:00.000Z",
  "startDate": "2024-12-01T00:00:00.000Z",
  "showSeconds": false,
  "colorScheme": "ocean",
  "notificationReminders": [3600000, 86400000, 3600000],
  "notificationEnabled": true
}
"#;
        let settings = parse_settings_text(json, now()).expect("valid settings");
        assert_eq!(settings.title, "Physics final");
        assert_eq!(
            settings.target,
            Instant::parse_rfc3339("2025-01-15T16:00:00+05:30").expect("valid")
        );
        assert!(!settings.show_seconds);
        assert_eq!(settings.color_scheme, ColorScheme::Ocean);
        assert_eq!(
            settings.reminders.iter().copied().collect::<Vec<_>>(),
            vec![3_600_000, 86_400_000]
        );
        assert!(settings.notifications_enabled);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let settings = parse_settings_text(r#"{ "title": "Maths" }"#, now()).expect("valid");
        let defaults = Settings::defaults_at(now());
        assert_eq!(settings.title, "Maths");
        assert_eq!(settings.target, defaults.target);
        assert_eq!(settings.start, now());
        assert!(settings.show_seconds);
        assert_eq!(settings.color_scheme, ColorScheme::Default);
        assert_eq!(settings.reminders, defaults.reminders);
        assert!(!settings.notifications_enabled);
    }

    #[test]
    fn rejects_unparseable_target() {
        let err = parse_settings_text(r#"{ "targetDate": "not-a-date" }"#, now())
            .expect_err("invalid target should fail");
        assert!(err.to_string().contains("invalid targetDate"));
    }

    #[test]
    fn rejects_unknown_color_scheme() {
        let err = parse_settings_text(r#"{ "colorScheme": "plaid" }"#, now())
            .expect_err("unknown scheme should fail");
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn save_then_load_preserves_record() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let mut settings = Settings::defaults_at(now());
        settings.title = "Biology".to_string();
        settings.color_scheme = ColorScheme::Sunset;
        settings.reminders.insert(600_000);

        save_settings(&path, &settings).expect("save");
        let loaded = load_settings(&path, now()).expect("load");
        assert_eq!(loaded, settings);

        let text = fs::read_to_string(&path).expect("read back");
        assert!(text.contains("\"targetDate\": \"2025-01-31T00:00:00.000Z\""));
        assert!(text.contains("\"colorScheme\": \"sunset\""));
    }

    #[test]
    fn load_failures_fall_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("missing.json");
        assert_eq!(
            load_settings_or_default(&missing, now()),
            Settings::defaults_at(now())
        );

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ nope").expect("write");
        assert_eq!(
            load_settings_or_default(&broken, now()),
            Settings::defaults_at(now())
        );
    }

    #[test]
    fn save_failure_is_reported_not_fatal() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("no-such-dir").join("settings.json");
        assert!(!save_settings_or_warn(&path, &Settings::defaults_at(now())));
    }
}
