//! Term-week numbering.
//!
//! Buckets calendar dates into an institution's week numbering: Monday-based
//! weeks counted from the week containing the term start, with the entire
//! multi-week term break collapsing to a single week index. Self-contained;
//! nothing here touches the reconciliation engine.

use chrono::{Datelike, Duration, NaiveDate};
use thiserror::Error;

/// Calendar construction and lookup errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// The break ends before it starts.
    #[error("term break ends {end} before it starts {start}")]
    InvertedBreak { start: NaiveDate, end: NaiveDate },

    /// The break begins inside or before the first term week.
    #[error("term break starting {break_start} must begin after the first term week (Monday {week1_monday})")]
    BreakTooEarly {
        break_start: NaiveDate,
        week1_monday: NaiveDate,
    },

    /// Week numbers are 1-based.
    #[error("week number must be at least 1, got {week}")]
    WeekOutOfRange { week: u32 },
}

/// The date range a week number covers, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekRange {
    pub week: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One academic term's week numbering scheme.
///
/// - Week 1 is the Monday–Sunday week containing the term start.
/// - Weeks count up consecutively until the break.
/// - Every calendar day of the break shares one week index, however many
///   real weeks the break spans.
/// - Counting resumes with Monday-based weeks from the first Monday on or
///   after the day following the break; days after the break but before
///   that Monday belong to the first post-break week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermCalendar {
    week1_monday: NaiveDate,
    break_start: NaiveDate,
    break_end: NaiveDate,
    first_post_break_monday: NaiveDate,
    break_week: u32,
}

/// Monday of the week containing the given date.
fn monday_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

impl TermCalendar {
    /// Builds a calendar, rejecting inconsistent dates up front.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "week indexes are small non-negative day counts divided by 7"
    )]
    pub fn new(
        term_start: NaiveDate,
        break_start: NaiveDate,
        break_end: NaiveDate,
    ) -> Result<Self, CalendarError> {
        let week1_monday = monday_of_week(term_start);
        if break_end < break_start {
            return Err(CalendarError::InvertedBreak {
                start: break_start,
                end: break_end,
            });
        }
        if break_start <= week1_monday {
            return Err(CalendarError::BreakTooEarly {
                break_start,
                week1_monday,
            });
        }

        let day_before_break = break_start - Duration::days(1);
        let break_week = ((day_before_break - week1_monday).num_days() / 7) as u32 + 2;

        let day_after_break = break_end + Duration::days(1);
        let to_monday =
            (7 - i64::from(day_after_break.weekday().num_days_from_monday())) % 7;
        let first_post_break_monday = day_after_break + Duration::days(to_monday);

        Ok(Self {
            week1_monday,
            break_start,
            break_end,
            first_post_break_monday,
            break_week,
        })
    }

    /// The single week index covering the whole break.
    pub const fn break_week(&self) -> u32 {
        self.break_week
    }

    /// Monday of week 1.
    pub const fn week1_monday(&self) -> NaiveDate {
        self.week1_monday
    }

    /// Week number for a date, or `None` before week 1.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "week indexes are small non-negative day counts divided by 7"
    )]
    pub fn week_of(&self, date: NaiveDate) -> Option<u32> {
        if date < self.week1_monday {
            return None;
        }
        if date >= self.break_start && date <= self.break_end {
            return Some(self.break_week);
        }
        if date < self.break_start {
            let days = (date - self.week1_monday).num_days();
            return Some((days / 7) as u32 + 1);
        }
        if date < self.first_post_break_monday {
            return Some(self.break_week + 1);
        }
        let days = (date - self.first_post_break_monday).num_days();
        Some(self.break_week + 1 + (days / 7) as u32)
    }

    /// Inclusive date range for a week number.
    ///
    /// Note the post-break asymmetry: the first post-break week's range
    /// starts on its Monday, while [`Self::week_of`] also assigns the
    /// preceding stray days (between break end and that Monday) to it.
    pub fn week_range(&self, week: u32) -> Result<WeekRange, CalendarError> {
        if week == 0 {
            return Err(CalendarError::WeekOutOfRange { week });
        }
        if week < self.break_week {
            let start = self.week1_monday + Duration::days(i64::from(week - 1) * 7);
            return Ok(WeekRange {
                week,
                start,
                end: start + Duration::days(6),
            });
        }
        if week == self.break_week {
            return Ok(WeekRange {
                week,
                start: self.break_start,
                end: self.break_end,
            });
        }
        let start = self.first_post_break_monday
            + Duration::days(i64::from(week - self.break_week - 1) * 7);
        Ok(WeekRange {
            week,
            start,
            end: start + Duration::days(6),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> TermCalendar {
        // Term starts Monday Sep 1; break Dec 16 through Jan 28.
        TermCalendar::new(date(2025, 9, 1), date(2025, 12, 16), date(2026, 1, 28)).unwrap()
    }

    #[test]
    fn dates_before_week_one_have_no_week() {
        assert_eq!(calendar().week_of(date(2025, 8, 31)), None);
    }

    #[test]
    fn week_one_spans_monday_through_sunday() {
        let cal = calendar();
        assert_eq!(cal.week_of(date(2025, 9, 1)), Some(1));
        assert_eq!(cal.week_of(date(2025, 9, 7)), Some(1));
        assert_eq!(cal.week_of(date(2025, 9, 8)), Some(2));
    }

    #[test]
    fn mid_week_term_start_counts_from_its_monday() {
        let cal =
            TermCalendar::new(date(2025, 9, 3), date(2025, 12, 16), date(2026, 1, 28)).unwrap();
        assert_eq!(cal.week1_monday(), date(2025, 9, 1));
        assert_eq!(cal.week_of(date(2025, 9, 1)), Some(1));
    }

    #[test]
    fn last_week_before_break() {
        assert_eq!(calendar().week_of(date(2025, 12, 15)), Some(16));
    }

    #[test]
    fn every_break_day_shares_one_index() {
        let cal = calendar();
        assert_eq!(cal.break_week(), 17);
        assert_eq!(cal.week_of(date(2025, 12, 16)), Some(17));
        assert_eq!(cal.week_of(date(2026, 1, 1)), Some(17));
        assert_eq!(cal.week_of(date(2026, 1, 28)), Some(17));
    }

    #[test]
    fn stray_days_after_break_join_first_post_break_week() {
        let cal = calendar();
        // Break ends Wednesday Jan 28; Thursday–Sunday belong to week 18,
        // which then runs Monday Feb 2 through Sunday Feb 8.
        assert_eq!(cal.week_of(date(2026, 1, 29)), Some(18));
        assert_eq!(cal.week_of(date(2026, 2, 1)), Some(18));
        assert_eq!(cal.week_of(date(2026, 2, 2)), Some(18));
        assert_eq!(cal.week_of(date(2026, 2, 8)), Some(18));
        assert_eq!(cal.week_of(date(2026, 2, 9)), Some(19));
    }

    #[test]
    fn week_ranges_match_week_of() {
        let cal = calendar();

        let first = cal.week_range(1).unwrap();
        assert_eq!(first.start, date(2025, 9, 1));
        assert_eq!(first.end, date(2025, 9, 7));

        let brk = cal.week_range(17).unwrap();
        assert_eq!(brk.start, date(2025, 12, 16));
        assert_eq!(brk.end, date(2026, 1, 28));

        let spring = cal.week_range(18).unwrap();
        assert_eq!(spring.start, date(2026, 2, 2));
        assert_eq!(spring.end, date(2026, 2, 8));

        let later = cal.week_range(20).unwrap();
        assert_eq!(later.start, date(2026, 2, 16));
        assert_eq!(later.end, date(2026, 2, 22));
    }

    #[test]
    fn week_zero_is_rejected() {
        assert_eq!(
            calendar().week_range(0),
            Err(CalendarError::WeekOutOfRange { week: 0 })
        );
    }

    #[test]
    fn inverted_break_is_rejected() {
        let err =
            TermCalendar::new(date(2025, 9, 1), date(2025, 12, 16), date(2025, 12, 1)).unwrap_err();
        assert!(matches!(err, CalendarError::InvertedBreak { .. }));
    }

    #[test]
    fn break_inside_first_week_is_rejected() {
        let err =
            TermCalendar::new(date(2025, 9, 3), date(2025, 9, 1), date(2026, 1, 28)).unwrap_err();
        assert!(matches!(err, CalendarError::BreakTooEarly { .. }));
    }
}
