//! Error types for term-engine operations.

use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};
use thiserror::Error;

/// The civil-time hazard hit while attaching a timezone to a wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalTimeHazard {
    /// The local time falls in a spring-forward gap and never happens.
    Nonexistent,
    /// The local time falls in a fall-back overlap and happens twice.
    Ambiguous,
}

impl fmt::Display for LocalTimeHazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalTimeHazard::Nonexistent => f.write_str("nonexistent"),
            LocalTimeHazard::Ambiguous => f.write_str("ambiguous"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TermError {
    /// The pattern string violates the grammar. `column` is 1-based and counts
    /// characters of the original input.
    #[error("Pattern syntax error at column {column}: {message}")]
    PatternSyntax { column: usize, message: String },

    /// A multiplier clause (`xN`) could not be resolved against a group template.
    #[error("Unresolved multiplier x{count}: {reason}")]
    UnresolvedMultiplier { count: u32, reason: String },

    /// A group template string is not a single full atom.
    #[error("Invalid group template: {0}")]
    InvalidTemplate(String),

    #[error("No term dates for academic year {0}")]
    NoSuchYear(i32),

    /// An occurrence would end on the day after it starts.
    #[error("Overnight event: {start} to {end} crosses midnight")]
    OvernightEvent { start: NaiveTime, end: NaiveTime },

    #[error("{hazard} local time {datetime} in {timezone}")]
    AmbiguousOrNonexistentLocalTime {
        datetime: NaiveDateTime,
        timezone: String,
        hazard: LocalTimeHazard,
    },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid calendar: {0}")]
    InvalidCalendar(String),

    #[error("Date out of range: {0}")]
    DateOutOfRange(String),
}

pub type Result<T> = std::result::Result<T, TermError>;
