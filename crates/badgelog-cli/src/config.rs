//! Configuration loading and management.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use badgelog_core::{CalendarError, SwipeConfig, TermCalendar};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Base URL of the roster service for name resolution, if any.
    pub roster_url: Option<String>,
    /// Action label that opens a visit.
    pub entry_action: String,
    /// Action label that closes a visit.
    pub exit_action: String,
    /// First day of the term.
    pub term_start: NaiveDate,
    /// First calendar day of the term break.
    pub break_start: NaiveDate,
    /// Last calendar day of the term break.
    pub break_end: NaiveDate,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let defaults = SwipeConfig::default();
        Self {
            database_path: data_dir.join("badgelog.db"),
            roster_url: None,
            entry_action: defaults.entry_action,
            exit_action: defaults.exit_action,
            // Calendar dates change once per academic year; override in
            // config.toml when they do.
            term_start: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            break_start: NaiveDate::from_ymd_opt(2025, 12, 16).unwrap(),
            break_end: NaiveDate::from_ymd_opt(2026, 1, 28).unwrap(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (BADGELOG_*)
        figment = figment.merge(Env::prefixed("BADGELOG_"));

        figment.extract()
    }

    /// The entry/exit matching configuration for the engine.
    pub fn swipe_config(&self) -> SwipeConfig {
        SwipeConfig {
            entry_action: self.entry_action.clone(),
            exit_action: self.exit_action.clone(),
        }
    }

    /// The term-week calendar, validated.
    pub fn term_calendar(&self) -> Result<TermCalendar, CalendarError> {
        TermCalendar::new(self.term_start, self.break_start, self.break_end)
    }

    /// The roster URL, if one is configured and non-blank.
    pub fn roster_url(&self) -> Option<&str> {
        self.roster_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Returns the platform-specific config directory for badgelog.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("badgelog"))
}

/// Returns the platform-specific data directory for badgelog.
///
/// On Linux: `~/.local/share/badgelog`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("badgelog"))
}
