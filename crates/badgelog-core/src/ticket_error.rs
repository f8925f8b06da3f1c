//! Ticket error kinds as the single source of truth for anomaly names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Anomaly kinds for invalid swipe sequences.
///
/// This vocabulary is a stable, closed set: reporting layers may match on it
/// exhaustively. `ExitWithoutEnter` is reserved; the classifier currently
/// reports the first unmatched exit as `ExitBeforeEnter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketError {
    /// Second consecutive exit with no intervening entry.
    DoubleExit,
    /// Entry while the subject is still marked present.
    DoubleEnter,
    /// Exit with no entry ever recorded before it.
    ExitBeforeEnter,
    /// Exit with no matching entry.
    ExitWithoutEnter,
    /// Entry left open at the end of a closed reporting period.
    EntryWithoutSameDayExit,
}

impl fmt::Display for TicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DoubleExit => "DOUBLE_EXIT",
            Self::DoubleEnter => "DOUBLE_ENTER",
            Self::ExitBeforeEnter => "EXIT_BEFORE_ENTER",
            Self::ExitWithoutEnter => "EXIT_WITHOUT_ENTER",
            Self::EntryWithoutSameDayExit => "ENTRY_WITHOUT_SAME_DAY_EXIT",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TicketError {
    type Err = UnknownTicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DOUBLE_EXIT" => Ok(Self::DoubleExit),
            "DOUBLE_ENTER" => Ok(Self::DoubleEnter),
            "EXIT_BEFORE_ENTER" => Ok(Self::ExitBeforeEnter),
            "EXIT_WITHOUT_ENTER" => Ok(Self::ExitWithoutEnter),
            "ENTRY_WITHOUT_SAME_DAY_EXIT" => Ok(Self::EntryWithoutSameDayExit),
            _ => Err(UnknownTicketError(s.to_string())),
        }
    }
}

impl Serialize for TicketError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TicketError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown ticket error names.
#[derive(Debug, Clone)]
pub struct UnknownTicketError(String);

impl fmt::Display for UnknownTicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown ticket error: {}", self.0)
    }
}

impl std::error::Error for UnknownTicketError {}
