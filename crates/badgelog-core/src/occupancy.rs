//! Current-occupancy resolution.
//!
//! Determines, per subject, the single unmatched entry (if any) representing
//! current presence. Clean tickets are already properly nested by the
//! classifier invariant (entries and exits alternate, with at most one
//! trailing open entry), so a greedy forward walk over the sorted exits
//! finds the dangling entry without full pairing.

use chrono::{DateTime, Utc};

use crate::classify::{ClassifyOptions, classify_and_partition};
use crate::row::{SwipeConfig, SwipeRecord};
use crate::types::SubjectId;

/// A subject currently present: a valid entry with no exit yet.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyRecord<'a, R> {
    /// Who is present.
    pub subject_id: SubjectId,
    /// Display name from the subject's earliest row, if recorded.
    pub display_name: Option<String>,
    /// The open entry row.
    pub entry: &'a R,
    /// When the open entry occurred.
    pub entry_at: DateTime<Utc>,
    /// Milliseconds present as of the reference instant, never negative.
    pub elapsed_ms: i64,
}

/// Resolves who is currently present and for how long.
///
/// `as_of` is the reference instant elapsed time is measured against. It is
/// always explicit: callers wanting "now" pass `Utc::now()` themselves, and
/// historical replays pass the instant under review.
///
/// Subjects whose clean entries are all matched produce no record. Results
/// are in first-seen subject order.
pub fn resolve_current_occupancy<'a, R: SwipeRecord>(
    rows: &'a [R],
    config: &SwipeConfig,
    category: Option<&str>,
    as_of: DateTime<Utc>,
) -> Vec<OccupancyRecord<'a, R>> {
    let options = ClassifyOptions {
        treat_unclosed_entry_as_error: false,
        category: category.map(str::to_string),
    };
    let classified = classify_and_partition(rows, config, &options);

    let mut records = Vec::new();
    for ledger in classified.subjects() {
        let mut entries: Vec<&'a R> = ledger
            .clean
            .iter()
            .map(|t| t.row)
            .filter(|row| config.is_entry(*row))
            .collect();
        let mut exits: Vec<&'a R> = ledger
            .clean
            .iter()
            .map(|t| t.row)
            .filter(|row| config.is_exit(*row))
            .collect();
        if entries.is_empty() {
            continue;
        }
        entries.sort_by_key(|row| row.occurred_at());
        exits.sort_by_key(|row| row.occurred_at());

        let mut exit_idx = 0;
        let mut last_unmatched: Option<&'a R> = None;
        for entry in entries {
            let entry_at = entry.occurred_at();
            while exit_idx < exits.len() && exits[exit_idx].occurred_at() <= entry_at {
                exit_idx += 1;
            }
            if exit_idx < exits.len() {
                exit_idx += 1;
                last_unmatched = None;
            } else {
                last_unmatched = Some(entry);
            }
        }

        if let Some(entry) = last_unmatched {
            let entry_at = entry.occurred_at();
            let elapsed_ms = (as_of - entry_at).num_milliseconds().max(0);
            records.push(OccupancyRecord {
                subject_id: ledger.subject_id.clone(),
                display_name: ledger.display_name.clone(),
                entry,
                entry_at,
                elapsed_ms,
            });
        }
    }

    records
}
