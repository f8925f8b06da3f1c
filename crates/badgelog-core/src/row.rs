//! Raw swipe rows and the matching configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{RowId, SubjectId};

/// Recognized category label for study hall visits.
pub const CATEGORY_STUDY_HALL: &str = "Study Hall";

/// Recognized category label for front desk shifts.
pub const CATEGORY_FRONT_DESK: &str = "Front Desk";

/// A row suitable for classification.
///
/// This trait allows the engine to work with different row representations
/// (e.g. rows loaded from storage, or test fixtures). Extra per-row fields a
/// source carries beyond this contract are opaque to the engine.
pub trait SwipeRecord {
    /// Returns the row's unique identifier.
    fn id(&self) -> &str;

    /// Returns when the swipe was observed.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Returns the subject identifier, if the row carries one.
    ///
    /// Rows returning `None` (or an empty/whitespace value) are excluded
    /// from grouping.
    fn subject_id(&self) -> Option<&str>;

    /// Returns the subject's display name as recorded on the row.
    fn subject_name(&self) -> Option<&str>;

    /// Returns the free-text action label (e.g. "Entry", "Exit").
    fn action(&self) -> Option<&str>;

    /// Returns the category tag, if any. Empty means "no category".
    fn category(&self) -> Option<&str>;
}

/// One observed badge swipe.
///
/// Extra fields present in the source data are preserved in [`Self::extra`]
/// and flow through serialization untouched; the engine never inspects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipeRow {
    /// Unique identifier for this row.
    pub id: RowId,
    /// When the swipe was observed.
    pub occurred_at: DateTime<Utc>,
    /// The badged subject, absent on unattributable rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    /// Display name as recorded at the reader, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    /// Free-text action label compared against [`SwipeConfig`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Optional category tag used for filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Additional source fields, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SwipeRecord for SwipeRow {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_ref().map(SubjectId::as_str)
    }

    fn subject_name(&self) -> Option<&str> {
        self.subject_name.as_deref()
    }

    fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// Configuration for matching entry/exit action labels.
///
/// Override when reconciling tables whose action vocabulary differs from the
/// default `"Entry"`/`"Exit"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeConfig {
    /// Action label that opens a visit.
    pub entry_action: String,
    /// Action label that closes a visit.
    pub exit_action: String,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            entry_action: "Entry".to_string(),
            exit_action: "Exit".to_string(),
        }
    }
}

impl SwipeConfig {
    /// Returns true if the row's action matches the configured entry label.
    pub fn is_entry<R: SwipeRecord>(&self, row: &R) -> bool {
        row.action().unwrap_or("").trim() == self.entry_action
    }

    /// Returns true if the row's action matches the configured exit label.
    pub fn is_exit<R: SwipeRecord>(&self, row: &R) -> bool {
        row.action().unwrap_or("").trim() == self.exit_action
    }
}
