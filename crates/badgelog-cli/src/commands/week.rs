//! Week command: translate dates to term weeks and back.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Args;

use crate::Config;

#[derive(Debug, Args)]
pub struct WeekArgs {
    /// Date to translate (YYYY-MM-DD); defaults to today.
    pub date: Option<NaiveDate>,

    /// Show the date range for this week number instead.
    #[arg(long, conflicts_with = "date")]
    pub number: Option<u32>,
}

pub fn run<W: Write>(writer: &mut W, config: &Config, args: &WeekArgs) -> Result<()> {
    let calendar = config
        .term_calendar()
        .context("invalid term calendar configuration")?;

    if let Some(number) = args.number {
        let range = calendar.week_range(number)?;
        writeln!(
            writer,
            "Week {}: {} through {}",
            range.week, range.start, range.end
        )?;
        return Ok(());
    }

    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    match calendar.week_of(date) {
        Some(week) if week == calendar.break_week() => {
            writeln!(writer, "{date} is term week {week} (term break)")?;
        }
        Some(week) => writeln!(writer, "{date} is term week {week}")?,
        None => writeln!(writer, "{date} is before the start of the term")?,
    }

    Ok(())
}
