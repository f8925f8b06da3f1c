//! Completed-session extraction.
//!
//! Emits one record per matched entry/exit pair in a subject's clean
//! tickets, with the exact millisecond duration between them.

use chrono::{DateTime, Utc};

use crate::classify::{ClassifyOptions, CleanTicket, classify_and_partition};
use crate::row::{SwipeConfig, SwipeRecord};
use crate::types::SubjectId;

/// A completed visit: a clean entry paired with a clean exit.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSession<'a, R> {
    /// Who visited.
    pub subject_id: SubjectId,
    /// Display name from the subject's earliest row, if recorded.
    pub display_name: Option<String>,
    /// The entry row that opened the visit.
    pub entry: &'a R,
    /// The exit row that closed it.
    pub exit: &'a R,
    /// When the visit started.
    pub entry_at: DateTime<Utc>,
    /// When the visit ended.
    pub exit_at: DateTime<Utc>,
    /// Exact elapsed milliseconds, `exit_at - entry_at`.
    pub duration_ms: i64,
}

/// Extracts completed entry/exit pairs with durations.
///
/// A session is emitted for every clean exit ticket that carries a paired
/// entry timestamp for which a clean entry ticket with exactly that
/// timestamp exists. Errored exits never reach this layer. Results are in
/// first-seen subject order, chronological within a subject.
pub fn extract_completed_sessions<'a, R: SwipeRecord>(
    rows: &'a [R],
    config: &SwipeConfig,
    category: Option<&str>,
) -> Vec<CompletedSession<'a, R>> {
    let options = ClassifyOptions {
        treat_unclosed_entry_as_error: false,
        category: category.map(str::to_string),
    };
    let classified = classify_and_partition(rows, config, &options);

    let mut sessions = Vec::new();
    for ledger in classified.subjects() {
        let mut entries: Vec<&CleanTicket<'a, R>> = ledger
            .clean
            .iter()
            .filter(|t| config.is_entry(t.row))
            .collect();
        let mut exits: Vec<&CleanTicket<'a, R>> = ledger
            .clean
            .iter()
            .filter(|t| config.is_exit(t.row))
            .collect();
        entries.sort_by_key(|t| t.row.occurred_at());
        exits.sort_by_key(|t| t.row.occurred_at());

        for exit in exits {
            let Some(entry_at) = exit.paired_entry_at else {
                continue;
            };
            let Some(entry) = entries
                .iter()
                .find(|t| t.row.occurred_at() == entry_at)
            else {
                continue;
            };

            let exit_at = exit.row.occurred_at();
            sessions.push(CompletedSession {
                subject_id: ledger.subject_id.clone(),
                display_name: ledger.display_name.clone(),
                entry: entry.row,
                exit: exit.row,
                entry_at,
                exit_at,
                duration_ms: (exit_at - entry_at).num_milliseconds(),
            });
        }
    }

    sessions
}
