//! Ticket classification.
//!
//! Partitions swipe rows into clean and errored tickets, per subject, using
//! a sequential presence state machine.
//!
//! # Algorithm Summary
//!
//! 1. Filter rows by category (optional), drop rows without a subject id
//! 2. Group remaining rows by subject in first-seen order
//! 3. Sort each subject's rows by timestamp (stable: input order breaks ties)
//! 4. Walk each subject's rows through the presence machine, emitting one
//!    clean or errored ticket per row

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::row::{SwipeConfig, SwipeRecord};
use crate::ticket_error::TicketError;
use crate::types::SubjectId;

/// Options for [`classify_and_partition`].
#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    /// When true, a subject still marked present at the end of the sequence
    /// has the open entry reclassified as
    /// [`TicketError::EntryWithoutSameDayExit`]. Use for closed-period
    /// analysis (e.g. yesterday's data).
    pub treat_unclosed_entry_as_error: bool,

    /// Restrict classification to rows carrying this category tag.
    /// `None` or an empty string processes all rows.
    pub category: Option<String>,
}

/// A row that classified cleanly.
#[derive(Debug, PartialEq)]
pub struct CleanTicket<'a, R> {
    /// The classified row.
    pub row: &'a R,
    /// For successful exits: when the entry it closed occurred.
    pub paired_entry_at: Option<DateTime<Utc>>,
}

// Manual impls: tickets borrow the row, so cloning one never needs R: Clone.
impl<R> Clone for CleanTicket<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for CleanTicket<'_, R> {}

/// A row that classified as an anomaly.
#[derive(Debug, PartialEq)]
pub struct ErroredTicket<'a, R> {
    /// The classified row.
    pub row: &'a R,
    /// What went wrong.
    pub error: TicketError,
    /// Where meaningful, the entry that was open (double enter) or last
    /// seen (double exit) when the anomaly was observed.
    pub open_entry_at: Option<DateTime<Utc>>,
}

impl<R> Clone for ErroredTicket<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for ErroredTicket<'_, R> {}

/// One subject's classification result, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectLedger<'a, R> {
    /// The subject all tickets in this ledger belong to.
    pub subject_id: SubjectId,
    /// Display name from the subject's earliest row, if recorded.
    pub display_name: Option<String>,
    /// Clean tickets in chronological order.
    pub clean: Vec<CleanTicket<'a, R>>,
    /// Errored tickets in chronological order (closed-period
    /// reclassifications appended last).
    pub errored: Vec<ErroredTicket<'a, R>>,
}

/// Result of classifying a mixed-subject row collection.
///
/// Iteration order over subjects is first-seen order in the input, so
/// identical input always renders identical output.
#[derive(Debug, Clone)]
pub struct Classified<'a, R> {
    ledgers: HashMap<String, SubjectLedger<'a, R>>,
    order: Vec<String>,
    /// All clean tickets, per-subject order concatenated in first-seen
    /// subject order.
    pub all_clean: Vec<CleanTicket<'a, R>>,
    /// All errored tickets, same ordering as [`Self::all_clean`].
    pub all_errored: Vec<ErroredTicket<'a, R>>,
    /// Rows dropped because they carry no usable subject id.
    pub unattributable: usize,
}

impl<'a, R> Classified<'a, R> {
    /// Looks up one subject's ledger.
    pub fn subject(&self, subject_id: &str) -> Option<&SubjectLedger<'a, R>> {
        self.ledgers.get(subject_id)
    }

    /// Iterates ledgers in first-seen subject order.
    pub fn subjects(&self) -> impl Iterator<Item = &SubjectLedger<'a, R>> {
        self.order.iter().filter_map(|id| self.ledgers.get(id))
    }

    /// Number of distinct subjects classified.
    pub fn subject_count(&self) -> usize {
        self.order.len()
    }
}

/// Classifies rows into clean and errored tickets, grouped by subject.
///
/// Rows may arrive unsorted and mixed across subjects; each subject's rows
/// are sorted by timestamp before classification. The sort is stable, so
/// rows sharing a timestamp keep their input order; callers that need a
/// stronger tie-break should pre-order the collection.
///
/// Every input row with a usable subject id appears exactly once in the
/// output, as either a clean or an errored ticket.
pub fn classify_and_partition<'a, R: SwipeRecord>(
    rows: &'a [R],
    config: &SwipeConfig,
    options: &ClassifyOptions,
) -> Classified<'a, R> {
    let category = options
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let mut groups: Vec<Vec<&'a R>> = Vec::new();
    let mut order: Vec<&'a str> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut unattributable = 0usize;

    for row in rows {
        if let Some(wanted) = category {
            if row.category().map(str::trim) != Some(wanted) {
                continue;
            }
        }
        let Some(subject) = row.subject_id().map(str::trim).filter(|s| !s.is_empty()) else {
            unattributable += 1;
            continue;
        };
        let slot = *index.entry(subject).or_insert_with(|| {
            order.push(subject);
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }

    let mut ledgers = HashMap::with_capacity(groups.len());
    let mut all_clean = Vec::new();
    let mut all_errored = Vec::new();
    let mut subject_order = Vec::with_capacity(groups.len());

    for (subject, mut group) in order.into_iter().zip(groups) {
        group.sort_by_key(|row| row.occurred_at());

        let Ok(subject_id) = SubjectId::new(subject) else {
            // Unreachable given the filter above; counted rather than lost.
            unattributable += group.len();
            continue;
        };
        let display_name = group
            .first()
            .and_then(|row| row.subject_name())
            .map(str::to_string);

        let (clean, errored) =
            classify_subject(&group, config, options.treat_unclosed_entry_as_error);
        all_clean.extend(clean.iter().cloned());
        all_errored.extend(errored.iter().cloned());

        subject_order.push(subject.to_string());
        ledgers.insert(
            subject.to_string(),
            SubjectLedger {
                subject_id,
                display_name,
                clean,
                errored,
            },
        );
    }

    tracing::debug!(
        subjects = subject_order.len(),
        clean = all_clean.len(),
        errored = all_errored.len(),
        unattributable,
        "classified swipe rows"
    );

    Classified {
        ledgers,
        order: subject_order,
        all_clean,
        all_errored,
        unattributable,
    }
}

/// Presence state for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Out,
    In,
}

/// Walks one subject's time-sorted rows through the presence machine.
fn classify_subject<'a, R: SwipeRecord>(
    rows: &[&'a R],
    config: &SwipeConfig,
    treat_unclosed_entry_as_error: bool,
) -> (Vec<CleanTicket<'a, R>>, Vec<ErroredTicket<'a, R>>) {
    let mut clean = Vec::new();
    let mut errored = Vec::new();

    let mut presence = Presence::Out;
    // The entry an exit would close; forgotten once paired.
    let mut open_entry_at: Option<DateTime<Utc>> = None;
    // The most recent entry regardless of pairing; error context only.
    let mut last_entry_at: Option<DateTime<Utc>> = None;
    // Distinguishes a first unmatched exit from a repeated one.
    let mut previous_action_was_exit = false;

    for &row in rows {
        let is_entry = config.is_entry(row);
        let is_exit = config.is_exit(row);

        if !is_entry && !is_exit {
            clean.push(CleanTicket {
                row,
                paired_entry_at: None,
            });
            previous_action_was_exit = false;
            continue;
        }

        if is_entry {
            previous_action_was_exit = false;
            if presence == Presence::In {
                errored.push(ErroredTicket {
                    row,
                    error: TicketError::DoubleEnter,
                    open_entry_at,
                });
            } else {
                presence = Presence::In;
                open_entry_at = Some(row.occurred_at());
                last_entry_at = open_entry_at;
                clean.push(CleanTicket {
                    row,
                    paired_entry_at: None,
                });
            }
            continue;
        }

        // Exit.
        if presence == Presence::In {
            clean.push(CleanTicket {
                row,
                paired_entry_at: open_entry_at,
            });
            presence = Presence::Out;
            open_entry_at = None;
        } else if previous_action_was_exit {
            errored.push(ErroredTicket {
                row,
                error: TicketError::DoubleExit,
                open_entry_at: last_entry_at,
            });
        } else {
            errored.push(ErroredTicket {
                row,
                error: TicketError::ExitBeforeEnter,
                open_entry_at: None,
            });
        }
        previous_action_was_exit = true;
    }

    // A subject left present only counts as an anomaly under closed-period
    // semantics; the open entry moves from clean to errored.
    if treat_unclosed_entry_as_error && presence == Presence::In {
        if let Some(open_at) = open_entry_at {
            let position = clean
                .iter()
                .position(|t| config.is_entry(t.row) && t.row.occurred_at() == open_at);
            if let Some(idx) = position {
                let ticket = clean.remove(idx);
                errored.push(ErroredTicket {
                    row: ticket.row,
                    error: TicketError::EntryWithoutSameDayExit,
                    open_entry_at: None,
                });
            }
        }
    }

    (clean, errored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{CATEGORY_FRONT_DESK, CATEGORY_STUDY_HALL, SwipeRow};
    use crate::types::RowId;
    use chrono::{Duration, TimeZone};

    fn ts(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 6, 9, 0, 0)
            .single()
            .expect("valid test timestamp")
            + Duration::minutes(minutes)
    }

    fn swipe(id: &str, minutes: i64, subject: &str, action: &str) -> SwipeRow {
        SwipeRow {
            id: RowId::new(id).unwrap(),
            occurred_at: ts(minutes),
            subject_id: Some(SubjectId::new(subject).unwrap()),
            subject_name: None,
            action: Some(action.to_string()),
            category: None,
            extra: serde_json::Map::new(),
        }
    }

    fn entry(id: &str, minutes: i64, subject: &str) -> SwipeRow {
        swipe(id, minutes, subject, "Entry")
    }

    fn exit(id: &str, minutes: i64, subject: &str) -> SwipeRow {
        swipe(id, minutes, subject, "Exit")
    }

    fn tagged(mut row: SwipeRow, category: &str) -> SwipeRow {
        row.category = Some(category.to_string());
        row
    }

    fn named(mut row: SwipeRow, name: &str) -> SwipeRow {
        row.subject_name = Some(name.to_string());
        row
    }

    fn clean_ids<R: SwipeRecord>(tickets: &[CleanTicket<'_, R>]) -> Vec<String> {
        tickets.iter().map(|t| t.row.id().to_string()).collect()
    }

    #[test]
    fn partition_totality() {
        let rows = vec![
            entry("1", 0, "u-1"),
            exit("2", 5, "u-1"),
            exit("3", 6, "u-1"),
            swipe("4", 7, "u-1", "Door Held"),
            entry("5", 10, "u-2"),
            entry("6", 12, "u-2"),
        ];

        let result = classify_and_partition(&rows, &SwipeConfig::default(), &ClassifyOptions::default());

        assert_eq!(result.all_clean.len() + result.all_errored.len(), rows.len());
        let mut ids: Vec<String> = clean_ids(&result.all_clean);
        ids.extend(result.all_errored.iter().map(|t| t.row.id().to_string()));
        ids.sort();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn first_unmatched_exit_then_repeat() {
        let rows = vec![exit("1", 0, "u-1"), exit("2", 5, "u-1")];

        let result = classify_and_partition(&rows, &SwipeConfig::default(), &ClassifyOptions::default());
        let ledger = result.subject("u-1").unwrap();

        assert!(ledger.clean.is_empty());
        assert_eq!(ledger.errored[0].error, TicketError::ExitBeforeEnter);
        assert_eq!(ledger.errored[0].open_entry_at, None);
        assert_eq!(ledger.errored[1].error, TicketError::DoubleExit);
        assert_eq!(ledger.errored[1].open_entry_at, None);
    }

    #[test]
    fn double_entry_preserves_open_entry() {
        let rows = vec![
            entry("1", 0, "u-1"),
            entry("2", 5, "u-1"),
            exit("3", 10, "u-1"),
        ];

        let result = classify_and_partition(&rows, &SwipeConfig::default(), &ClassifyOptions::default());
        let ledger = result.subject("u-1").unwrap();

        assert_eq!(ledger.errored.len(), 1);
        assert_eq!(ledger.errored[0].error, TicketError::DoubleEnter);
        assert_eq!(ledger.errored[0].open_entry_at, Some(ts(0)));
        // The exit pairs with the original entry, not the rejected one.
        let exit_ticket = ledger.clean.last().unwrap();
        assert_eq!(exit_ticket.paired_entry_at, Some(ts(0)));
    }

    #[test]
    fn double_exit_after_completed_pair_keeps_entry_context() {
        // Entry 09:00, Exit 09:05, Exit 09:05 again, Entry 10:00.
        let rows = vec![
            entry("1", 0, "u-123"),
            exit("2", 5, "u-123"),
            exit("3", 5, "u-123"),
            entry("4", 60, "u-123"),
        ];

        let result = classify_and_partition(&rows, &SwipeConfig::default(), &ClassifyOptions::default());
        let ledger = result.subject("u-123").unwrap();

        assert_eq!(clean_ids(&ledger.clean), vec!["1", "2", "4"]);
        assert_eq!(ledger.errored.len(), 1);
        assert_eq!(ledger.errored[0].row.id(), "3");
        assert_eq!(ledger.errored[0].error, TicketError::DoubleExit);
        assert_eq!(ledger.errored[0].open_entry_at, Some(ts(0)));
    }

    #[test]
    fn neutral_rows_are_clean_and_reset_exit_flag() {
        let rows = vec![
            exit("1", 0, "u-1"),
            swipe("2", 1, "u-1", "Door Held"),
            exit("3", 2, "u-1"),
        ];

        let result = classify_and_partition(&rows, &SwipeConfig::default(), &ClassifyOptions::default());
        let ledger = result.subject("u-1").unwrap();

        assert_eq!(clean_ids(&ledger.clean), vec!["2"]);
        // The neutral row broke the consecutive-exit run.
        assert_eq!(ledger.errored[0].error, TicketError::ExitBeforeEnter);
        assert_eq!(ledger.errored[1].error, TicketError::ExitBeforeEnter);
    }

    #[test]
    fn closed_period_reclassifies_open_entry() {
        let rows = vec![entry("1", 0, "u-1")];

        let open = classify_and_partition(&rows, &SwipeConfig::default(), &ClassifyOptions::default());
        let ledger = open.subject("u-1").unwrap();
        assert_eq!(clean_ids(&ledger.clean), vec!["1"]);
        assert!(ledger.errored.is_empty());

        let closed = classify_and_partition(
            &rows,
            &SwipeConfig::default(),
            &ClassifyOptions {
                treat_unclosed_entry_as_error: true,
                category: None,
            },
        );
        let ledger = closed.subject("u-1").unwrap();
        assert!(ledger.clean.is_empty());
        assert_eq!(ledger.errored.len(), 1);
        assert_eq!(ledger.errored[0].error, TicketError::EntryWithoutSameDayExit);
        assert_eq!(ledger.errored[0].row.id(), "1");
    }

    #[test]
    fn closed_period_leaves_completed_pairs_alone() {
        let rows = vec![
            entry("1", 0, "u-1"),
            exit("2", 5, "u-1"),
            entry("3", 10, "u-1"),
        ];

        let result = classify_and_partition(
            &rows,
            &SwipeConfig::default(),
            &ClassifyOptions {
                treat_unclosed_entry_as_error: true,
                category: None,
            },
        );
        let ledger = result.subject("u-1").unwrap();

        assert_eq!(clean_ids(&ledger.clean), vec!["1", "2"]);
        assert_eq!(ledger.errored.len(), 1);
        assert_eq!(ledger.errored[0].row.id(), "3");
        assert_eq!(ledger.errored[0].error, TicketError::EntryWithoutSameDayExit);
    }

    #[test]
    fn category_filter_isolates_classification() {
        // Interleaved categories for the same subject: the study-hall exit
        // must not close the front-desk entry.
        let rows = vec![
            tagged(entry("1", 0, "u-1"), CATEGORY_FRONT_DESK),
            tagged(exit("2", 5, "u-1"), CATEGORY_STUDY_HALL),
            tagged(exit("3", 10, "u-1"), CATEGORY_FRONT_DESK),
        ];

        let front = classify_and_partition(
            &rows,
            &SwipeConfig::default(),
            &ClassifyOptions {
                treat_unclosed_entry_as_error: false,
                category: Some(CATEGORY_FRONT_DESK.to_string()),
            },
        );
        let ledger = front.subject("u-1").unwrap();
        assert_eq!(clean_ids(&ledger.clean), vec!["1", "3"]);
        assert!(ledger.errored.is_empty());

        let study = classify_and_partition(
            &rows,
            &SwipeConfig::default(),
            &ClassifyOptions {
                treat_unclosed_entry_as_error: false,
                category: Some(CATEGORY_STUDY_HALL.to_string()),
            },
        );
        let ledger = study.subject("u-1").unwrap();
        assert_eq!(ledger.errored.len(), 1);
        assert_eq!(ledger.errored[0].error, TicketError::ExitBeforeEnter);
    }

    #[test]
    fn empty_category_filter_is_passthrough() {
        let rows = vec![tagged(entry("1", 0, "u-1"), CATEGORY_STUDY_HALL)];
        let result = classify_and_partition(
            &rows,
            &SwipeConfig::default(),
            &ClassifyOptions {
                treat_unclosed_entry_as_error: false,
                category: Some(String::new()),
            },
        );
        assert_eq!(result.all_clean.len(), 1);
    }

    #[test]
    fn rows_without_subject_are_counted_not_classified() {
        let mut orphan = entry("1", 0, "u-1");
        orphan.subject_id = None;
        let rows = vec![orphan, entry("2", 5, "u-2")];

        let result = classify_and_partition(&rows, &SwipeConfig::default(), &ClassifyOptions::default());

        assert_eq!(result.unattributable, 1);
        assert_eq!(result.subject_count(), 1);
        assert_eq!(result.all_clean.len(), 1);
    }

    #[test]
    fn subjects_iterate_in_first_seen_order() {
        let rows = vec![
            named(entry("1", 10, "u-b"), "Blair Quinn"),
            entry("2", 0, "u-a"),
            exit("3", 20, "u-b"),
        ];

        let result = classify_and_partition(&rows, &SwipeConfig::default(), &ClassifyOptions::default());
        let order: Vec<&str> = result.subjects().map(|l| l.subject_id.as_str()).collect();
        assert_eq!(order, vec!["u-b", "u-a"]);
        assert_eq!(
            result.subject("u-b").unwrap().display_name.as_deref(),
            Some("Blair Quinn")
        );
    }

    #[test]
    fn display_name_comes_from_earliest_row() {
        let rows = vec![
            named(exit("2", 5, "u-1"), "Later Name"),
            named(entry("1", 0, "u-1"), "Earliest Name"),
        ];

        let result = classify_and_partition(&rows, &SwipeConfig::default(), &ClassifyOptions::default());
        assert_eq!(
            result.subject("u-1").unwrap().display_name.as_deref(),
            Some("Earliest Name")
        );
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        // Exit and entry share a timestamp; input order decides the outcome.
        let rows = vec![exit("1", 0, "u-1"), entry("2", 0, "u-1")];

        let result = classify_and_partition(&rows, &SwipeConfig::default(), &ClassifyOptions::default());
        let ledger = result.subject("u-1").unwrap();

        assert_eq!(ledger.errored.len(), 1);
        assert_eq!(ledger.errored[0].row.id(), "1");
        assert_eq!(ledger.errored[0].error, TicketError::ExitBeforeEnter);
        assert_eq!(clean_ids(&ledger.clean), vec!["2"]);
    }

    #[test]
    fn identical_input_yields_identical_output() {
        let rows = vec![
            entry("1", 0, "u-1"),
            exit("2", 5, "u-1"),
            exit("3", 6, "u-1"),
            entry("4", 10, "u-2"),
        ];

        let first = classify_and_partition(&rows, &SwipeConfig::default(), &ClassifyOptions::default());
        let second = classify_and_partition(&rows, &SwipeConfig::default(), &ClassifyOptions::default());

        assert_eq!(first.all_clean, second.all_clean);
        assert_eq!(first.all_errored, second.all_errored);
        let first_order: Vec<&str> = first.subjects().map(|l| l.subject_id.as_str()).collect();
        let second_order: Vec<&str> = second.subjects().map(|l| l.subject_id.as_str()).collect();
        assert_eq!(first_order, second_order);
    }

    #[test]
    fn custom_action_labels() {
        let config = SwipeConfig {
            entry_action: "IN".to_string(),
            exit_action: "OUT".to_string(),
        };
        let rows = vec![
            swipe("1", 0, "u-1", "IN"),
            swipe("2", 5, "u-1", "OUT"),
            // Default labels are neutral under this config.
            swipe("3", 6, "u-1", "Exit"),
        ];

        let result = classify_and_partition(&rows, &config, &ClassifyOptions::default());
        let ledger = result.subject("u-1").unwrap();
        assert_eq!(clean_ids(&ledger.clean), vec!["1", "2", "3"]);
        assert_eq!(ledger.clean[1].paired_entry_at, Some(ts(0)));
        assert!(ledger.errored.is_empty());
    }
}
