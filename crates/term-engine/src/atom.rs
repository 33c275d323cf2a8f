//! Parsed pattern values: week sets, day sets, time specs and the atoms built
//! from them.
//!
//! Every type here renders back to the canonical pattern text through
//! `Display`, and the canonical text parses to an equal value.

use std::fmt;

use chrono::{Duration, NaiveTime, Timelike, Weekday};
use serde::Serialize;

use crate::calendar::TermName;
use crate::error::{Result, TermError};

/// Largest week number (in either direction) a pattern may name.
pub const MAX_WEEK: i32 = 52;

/// Length of an occurrence whose pattern gives only a start time.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

const DAY_CODES: [(Weekday, &str); 7] = [
    (Weekday::Mon, "M"),
    (Weekday::Tue, "Tu"),
    (Weekday::Wed, "W"),
    (Weekday::Thu, "Th"),
    (Weekday::Fri, "F"),
    (Weekday::Sat, "Sa"),
    (Weekday::Sun, "Su"),
];

/// The pattern code for a weekday (`M`, `Tu`, `W`, `Th`, `F`, `Sa`, `Su`).
pub fn day_code(day: Weekday) -> &'static str {
    DAY_CODES[day.num_days_from_monday() as usize].1
}

/// Parse a day code, ignoring case.
pub fn day_from_code(code: &str) -> Option<Weekday> {
    DAY_CODES
        .iter()
        .find(|(_, c)| c.eq_ignore_ascii_case(code))
        .map(|&(day, _)| day)
}

// ── WeekSpec ────────────────────────────────────────────────────────────────

/// A non-empty, ascending set of term-week numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WeekSpec(Vec<i32>);

impl WeekSpec {
    /// Build from any collection of weeks. Returns `None` when empty or when a
    /// week lies outside `-MAX_WEEK..=MAX_WEEK`.
    pub fn new(weeks: impl IntoIterator<Item = i32>) -> Option<WeekSpec> {
        let mut weeks: Vec<i32> = weeks.into_iter().collect();
        if weeks.is_empty() || weeks.iter().any(|w| w.abs() > MAX_WEEK) {
            return None;
        }
        weeks.sort_unstable();
        weeks.dedup();
        Some(WeekSpec(weeks))
    }

    /// `count` consecutive weeks beginning at `first`.
    ///
    /// Returns `None` for a zero count or when the run leaves
    /// `-MAX_WEEK..=MAX_WEEK`. Bounds are checked before any week is collected.
    pub fn consecutive(first: i32, count: u32) -> Option<WeekSpec> {
        let count = i32::try_from(count).ok().filter(|&c| c > 0)?;
        let last = first.checked_add(count - 1)?;
        if first.abs() > MAX_WEEK || last > MAX_WEEK {
            return None;
        }
        WeekSpec::new(first..=last)
    }

    pub fn first(&self) -> i32 {
        self.0[0]
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for WeekSpec {
    /// Consecutive runs collapse into ranges: `1-3,5`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut runs: Vec<(i32, i32)> = Vec::new();
        for week in self.iter() {
            match runs.last_mut() {
                Some(run) if run.1 + 1 == week => run.1 = week,
                _ => runs.push((week, week)),
            }
        }
        for (i, (lo, hi)) in runs.into_iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if lo == hi {
                write!(f, "{lo}")?;
            } else {
                write!(f, "{lo}-{hi}")?;
            }
        }
        Ok(())
    }
}

// ── DaySpec ─────────────────────────────────────────────────────────────────

/// A non-empty set of weekdays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DaySpec(u8);

impl DaySpec {
    pub fn new(days: impl IntoIterator<Item = Weekday>) -> Option<DaySpec> {
        let bits = days
            .into_iter()
            .fold(0u8, |bits, day| bits | 1 << day.num_days_from_monday());
        (bits != 0).then_some(DaySpec(bits))
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The days in the order they occur within a week that begins on `week_start`.
    pub fn iter_from(self, week_start: Weekday) -> impl Iterator<Item = Weekday> {
        std::iter::successors(Some(week_start), |day| Some(day.succ()))
            .take(7)
            .filter(move |&day| self.contains(day))
    }
}

impl fmt::Display for DaySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for day in self.iter_from(Weekday::Mon) {
            f.write_str(day_code(day))?;
        }
        Ok(())
    }
}

impl Serialize for DaySpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── TimeSpec ────────────────────────────────────────────────────────────────

/// Wall-clock time of day for every occurrence of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimeSpec {
    /// Explicit start and end (`10-12`).
    Range { start: NaiveTime, end: NaiveTime },
    /// Start plus a length in minutes (`10x1.30`, or a bare `10`).
    Duration { start: NaiveTime, minutes: u32 },
}

impl TimeSpec {
    /// A start time with the default one-hour length.
    pub fn starting_at(start: NaiveTime) -> TimeSpec {
        TimeSpec::Duration {
            start,
            minutes: DEFAULT_DURATION_MINUTES,
        }
    }

    pub fn start(&self) -> NaiveTime {
        match *self {
            TimeSpec::Range { start, .. } | TimeSpec::Duration { start, .. } => start,
        }
    }

    /// Start and end times on the same day.
    ///
    /// # Errors
    /// Returns `TermError::OvernightEvent` if the end would fall on the next day:
    /// an explicit end earlier than the start, or a duration that reaches or
    /// passes midnight.
    pub fn bounds(&self) -> Result<(NaiveTime, NaiveTime)> {
        match *self {
            TimeSpec::Range { start, end } => {
                if end < start {
                    return Err(TermError::OvernightEvent { start, end });
                }
                Ok((start, end))
            }
            TimeSpec::Duration { start, minutes } => {
                let (end, wrapped) =
                    start.overflowing_add_signed(Duration::minutes(i64::from(minutes)));
                if wrapped != 0 {
                    return Err(TermError::OvernightEvent { start, end });
                }
                Ok((start, end))
            }
        }
    }
}

/// Renders a time so it parses back to itself. Hours 1-7 would be read as
/// afternoon, so morning times in that band carry an explicit `am`.
fn fmt_time(f: &mut fmt::Formatter<'_>, time: NaiveTime) -> fmt::Result {
    let (hour, minute) = (time.hour(), time.minute());
    if minute == 0 {
        write!(f, "{hour}")?;
    } else {
        write!(f, "{hour}.{minute:02}")?;
    }
    if (1..=7).contains(&hour) {
        f.write_str("am")?;
    }
    Ok(())
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TimeSpec::Range { start, end } => {
                fmt_time(f, start)?;
                f.write_str("-")?;
                fmt_time(f, end)
            }
            TimeSpec::Duration { start, minutes } => {
                fmt_time(f, start)?;
                if minutes == DEFAULT_DURATION_MINUTES {
                    return Ok(());
                }
                let (hours, rest) = (minutes / 60, minutes % 60);
                if rest == 0 {
                    write!(f, "x{hours}")
                } else {
                    write!(f, "x{hours}.{rest:02}")
                }
            }
        }
    }
}

// ── Atoms ───────────────────────────────────────────────────────────────────

/// One full clause: every (week, day) pair of the cartesian product is an
/// occurrence at `time`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Atom {
    /// `None` means the atom applies to all three terms.
    pub term: Option<TermName>,
    pub weeks: WeekSpec,
    pub days: DaySpec,
    pub time: TimeSpec,
}

impl Atom {
    /// Number of occurrences per term.
    pub fn slots_per_term(&self) -> usize {
        self.weeks.len() * self.days.len()
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(term) = self.term {
            f.write_str(term.code())?;
        }
        write!(f, "{} {} {}", self.weeks, self.days, self.time)
    }
}

/// `xN`: N repetitions in the shape of the group template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Multiplier {
    pub count: u32,
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Clause {
    Atom(Atom),
    Multiplier(Multiplier),
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Atom(atom) => atom.fmt(f),
            Clause::Multiplier(multiplier) => multiplier.fmt(f),
        }
    }
}

/// A parsed pattern: clauses in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Pattern {
    clauses: Vec<Clause>,
}

impl Pattern {
    pub fn new(clauses: Vec<Clause>) -> Pattern {
        Pattern { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn into_clauses(self) -> Vec<Clause> {
        self.clauses
    }

    pub fn has_multiplier(&self) -> bool {
        self.clauses
            .iter()
            .any(|clause| matches!(clause, Clause::Multiplier(_)))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            clause.fmt(f)?;
        }
        Ok(())
    }
}
