//! Occupancy command: who is currently present and for how long.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;

use badgelog_core::resolve_current_occupancy;
use badgelog_db::Database;

use crate::Config;
use crate::commands::util::{self, RangeArgs};
use crate::enrich;

#[derive(Debug, Args)]
pub struct OccupancyArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Reference instant for elapsed time (default: now).
    #[arg(long)]
    pub as_of: Option<String>,

    /// Output JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Resolve display names via the subject directory and roster service.
    #[arg(long)]
    pub names: bool,
}

#[derive(Debug, Serialize)]
struct OccupancyReport {
    as_of: String,
    present: Vec<OccupancyLine>,
}

#[derive(Debug, Serialize)]
struct OccupancyLine {
    subject_id: String,
    display_name: Option<String>,
    entry_at: String,
    elapsed_ms: i64,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    args: &OccupancyArgs,
) -> Result<()> {
    let filter = args.range.to_filter()?;
    let rows = util::load_rows(db, &filter)?;
    let as_of = match args.as_of.as_deref() {
        Some(raw) => util::parse_instant(raw).context("invalid --as-of")?,
        None => Utc::now(),
    };

    let records = resolve_current_occupancy(
        &rows,
        &config.swipe_config(),
        args.range.category.as_deref(),
        as_of,
    );

    let mut lines: Vec<OccupancyLine> = records
        .iter()
        .map(|record| OccupancyLine {
            subject_id: record.subject_id.to_string(),
            display_name: record.display_name.clone(),
            entry_at: util::format_instant(record.entry_at),
            elapsed_ms: record.elapsed_ms,
        })
        .collect();

    if args.names {
        let ids: Vec<String> = lines.iter().map(|line| line.subject_id.clone()).collect();
        let names = enrich::resolve_names(db, config.roster_url(), &ids)?;
        for line in &mut lines {
            if let Some(name) = names.get(&line.subject_id) {
                line.display_name = Some(name.clone());
            }
        }
    }

    if args.json {
        let report = OccupancyReport {
            as_of: util::format_instant(as_of),
            present: lines,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    if lines.is_empty() {
        writeln!(writer, "No one is currently present.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "Currently present: {} (as of {})",
        lines.len(),
        util::format_instant(as_of)
    )?;
    for line in &lines {
        writeln!(
            writer,
            "- {}: entered {}, {}",
            util::subject_label(&line.subject_id, line.display_name.as_deref()),
            line.entry_at,
            util::format_duration(line.elapsed_ms)
        )?;
    }

    Ok(())
}
