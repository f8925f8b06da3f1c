//! Shared helpers for CLI commands.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use clap::Args;

use badgelog_core::SwipeRow;
use badgelog_db::{Database, SwipeFilter};

/// Time range and category selection shared by the query commands.
#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    /// Earliest swipe to include (RFC 3339 or YYYY-MM-DD), inclusive.
    #[arg(long)]
    pub start: Option<String>,

    /// Latest swipe to include, exclusive.
    #[arg(long)]
    pub end: Option<String>,

    /// Restrict to this category label.
    #[arg(long)]
    pub category: Option<String>,
}

impl RangeArgs {
    /// Builds a storage filter from the parsed arguments.
    pub fn to_filter(&self) -> Result<SwipeFilter> {
        let start = self
            .start
            .as_deref()
            .map(parse_instant)
            .transpose()
            .context("invalid --start")?;
        let end = self
            .end
            .as_deref()
            .map(parse_instant)
            .transpose()
            .context("invalid --end")?;
        Ok(SwipeFilter {
            start,
            end,
            category: self.category.clone(),
        })
    }
}

/// Parses an RFC 3339 timestamp, or a bare date as UTC midnight.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("expected RFC 3339 timestamp or YYYY-MM-DD date, got '{value}'"))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

/// Formats a timestamp the way reports print them.
pub fn format_instant(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Formats milliseconds as a duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations are treated as 0m.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Renders "Display Name (id)" or just the id when no name is known.
pub fn subject_label(subject_id: &str, display_name: Option<&str>) -> String {
    display_name.map_or_else(
        || subject_id.to_string(),
        |name| format!("{name} ({subject_id})"),
    )
}

/// Fetches filtered swipes and converts them to engine rows.
pub fn load_rows(db: &Database, filter: &SwipeFilter) -> Result<Vec<SwipeRow>> {
    db.list_swipes_filtered(filter)
        .context("failed to list swipes")?
        .into_iter()
        .map(|stored| {
            let id = stored.id.clone();
            stored
                .into_row()
                .with_context(|| format!("failed to decode stored swipe {id}"))
        })
        .collect()
}
