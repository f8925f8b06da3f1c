//! Sessions command: completed visits with durations.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use badgelog_core::extract_completed_sessions;
use badgelog_db::Database;

use crate::Config;
use crate::commands::util::{self, RangeArgs};
use crate::enrich;

#[derive(Debug, Args)]
pub struct SessionsArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Output JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Resolve display names via the subject directory and roster service.
    #[arg(long)]
    pub names: bool,
}

#[derive(Debug, Serialize)]
struct SessionsReport {
    sessions: Vec<SessionLine>,
    totals: SessionTotals,
}

#[derive(Debug, Serialize)]
struct SessionLine {
    subject_id: String,
    display_name: Option<String>,
    entry_at: String,
    exit_at: String,
    duration_ms: i64,
}

#[derive(Debug, Serialize)]
struct SessionTotals {
    count: usize,
    duration_ms: i64,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    args: &SessionsArgs,
) -> Result<()> {
    let filter = args.range.to_filter()?;
    let rows = util::load_rows(db, &filter)?;

    let sessions = extract_completed_sessions(
        &rows,
        &config.swipe_config(),
        args.range.category.as_deref(),
    );

    let mut lines: Vec<SessionLine> = sessions
        .iter()
        .map(|session| SessionLine {
            subject_id: session.subject_id.to_string(),
            display_name: session.display_name.clone(),
            entry_at: util::format_instant(session.entry_at),
            exit_at: util::format_instant(session.exit_at),
            duration_ms: session.duration_ms,
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

    let total_ms: i64 = lines.iter().map(|line| line.duration_ms).sum();

    if args.json {
        let report = SessionsReport {
            totals: SessionTotals {
                count: lines.len(),
                duration_ms: total_ms,
            },
            sessions: lines,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    if lines.is_empty() {
        writeln!(writer, "No completed visits.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "Completed visits: {} (total {})",
        lines.len(),
        util::format_duration(total_ms)
    )?;
    for line in &lines {
        writeln!(
            writer,
            "- {}: {} to {} ({})",
            util::subject_label(&line.subject_id, line.display_name.as_deref()),
            line.entry_at,
            line.exit_at,
            util::format_duration(line.duration_ms)
        )?;
    }

    Ok(())
}
