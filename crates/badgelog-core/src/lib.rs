//! Core reconciliation engine for badge swipe logs.
//!
//! This crate contains the fundamental types and logic for:
//! - Classification: partitioning each subject's swipes into clean and
//!   errored tickets with a sequential presence state machine
//! - Occupancy: resolving who is currently present and for how long
//! - Sessions: extracting completed entry/exit pairs with durations
//! - Term weeks: the independent institution week-numbering utility
//!
//! The engine is pure: it performs no I/O, reads no ambient clock, and
//! returns freshly built structures referencing the caller's rows.

pub mod classify;
pub mod occupancy;
pub mod row;
pub mod sessions;
pub mod term_week;
pub mod ticket_error;
pub mod types;

pub use classify::{
    Classified, ClassifyOptions, CleanTicket, ErroredTicket, SubjectLedger, classify_and_partition,
};
pub use occupancy::{OccupancyRecord, resolve_current_occupancy};
pub use row::{CATEGORY_FRONT_DESK, CATEGORY_STUDY_HALL, SwipeConfig, SwipeRecord, SwipeRow};
pub use sessions::{CompletedSession, extract_completed_sessions};
pub use term_week::{CalendarError, TermCalendar, WeekRange};
pub use ticket_error::{TicketError, UnknownTicketError};
pub use types::{RowId, SubjectId, ValidationError};
