//! Audit command: anomalous swipe sequences and partition counts.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use badgelog_core::{ClassifyOptions, SwipeRecord, classify_and_partition};
use badgelog_db::Database;

use crate::Config;
use crate::commands::util::{self, RangeArgs};

#[derive(Debug, Args)]
pub struct AuditArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Treat entries left open at the end of the period as errors
    /// (closed-period semantics).
    #[arg(long)]
    pub closed: bool,

    /// Output JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct AuditReport {
    rows: usize,
    clean: usize,
    errored: usize,
    unattributable: usize,
    subjects: Vec<AuditSubject>,
}

#[derive(Debug, Serialize)]
struct AuditSubject {
    subject_id: String,
    display_name: Option<String>,
    clean: usize,
    errors: Vec<AuditError>,
}

#[derive(Debug, Serialize)]
struct AuditError {
    row_id: String,
    error: String,
    occurred_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    open_entry_at: Option<String>,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    args: &AuditArgs,
) -> Result<()> {
    let filter = args.range.to_filter()?;
    let rows = util::load_rows(db, &filter)?;

    let options = ClassifyOptions {
        treat_unclosed_entry_as_error: args.closed,
        category: args.range.category.clone(),
    };
    let classified = classify_and_partition(&rows, &config.swipe_config(), &options);

    let subjects: Vec<AuditSubject> = classified
        .subjects()
        .map(|ledger| AuditSubject {
            subject_id: ledger.subject_id.to_string(),
            display_name: ledger.display_name.clone(),
            clean: ledger.clean.len(),
            errors: ledger
                .errored
                .iter()
                .map(|ticket| AuditError {
                    row_id: ticket.row.id().to_string(),
                    error: ticket.error.to_string(),
                    occurred_at: util::format_instant(ticket.row.occurred_at()),
                    open_entry_at: ticket.open_entry_at.map(util::format_instant),
                })
                .collect(),
        })
        .collect();

    let report = AuditReport {
        rows: classified.all_clean.len() + classified.all_errored.len() + classified.unattributable,
        clean: classified.all_clean.len(),
        errored: classified.all_errored.len(),
        unattributable: classified.unattributable,
        subjects,
    };

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    writeln!(
        writer,
        "Swipe audit: {} rows ({} clean, {} errored, {} unattributable)",
        report.rows, report.clean, report.errored, report.unattributable
    )?;

    if report.errored == 0 {
        writeln!(writer, "No anomalies found.")?;
        return Ok(());
    }

    for subject in report.subjects.iter().filter(|s| !s.errors.is_empty()) {
        writeln!(
            writer,
            "{}",
            util::subject_label(&subject.subject_id, subject.display_name.as_deref())
        )?;
        for error in &subject.errors {
            match &error.open_entry_at {
                Some(entry_at) => writeln!(
                    writer,
                    "  {} at {} (entry {})",
                    error.error, error.occurred_at, entry_at
                )?,
                None => writeln!(writer, "  {} at {}", error.error, error.occurred_at)?,
            }
        }
    }

    Ok(())
}
