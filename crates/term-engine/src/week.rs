//! Term-week arithmetic -- (term, week, day) to calendar dates and back.
//!
//! Week 1 of a term begins on the configured week-start weekday on or before
//! the term's start date (with the default Thursday start and Thursday term
//! dates, that is the start date itself). Week 0 is the week before it and
//! negative weeks continue backwards, so every date has exactly one
//! `(week, day)` position relative to a given term.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::atom::day_code;
use crate::calendar::{Term, TermCalendar};
use crate::error::{Result, TermError};

/// Cambridge lecture weeks run Thursday to Wednesday.
pub const DEFAULT_WEEK_START: Weekday = Weekday::Thu;

/// Weeks of full term, used as a term's nominal span when inferring terms.
pub const FULL_TERM_WEEKS: i64 = 8;

/// How many days `day` is after `week_start`, wrapping within the week.
fn day_offset(day: Weekday, week_start: Weekday) -> i64 {
    let diff = i64::from(day.num_days_from_monday()) - i64::from(week_start.num_days_from_monday());
    diff.rem_euclid(7)
}

fn week_one_start(term: &Term, week_start: Weekday) -> Result<NaiveDate> {
    let back = day_offset(term.start.weekday(), week_start);
    term.start
        .checked_sub_signed(Duration::days(back))
        .ok_or_else(|| TermError::DateOutOfRange(format!("week 1 of {} {}", term.name, term.year)))
}

/// Date of `day` in term week `week`, using the default Thursday week start.
pub fn week_day_to_date(term: &Term, week: i32, day: Weekday) -> Result<NaiveDate> {
    week_day_to_date_with_start(term, week, day, DEFAULT_WEEK_START)
}

/// Date of `day` in term week `week` for weeks beginning on `week_start`.
///
/// # Errors
/// Returns `TermError::DateOutOfRange` if the result is outside chrono's
/// representable dates.
pub fn week_day_to_date_with_start(
    term: &Term,
    week: i32,
    day: Weekday,
    week_start: Weekday,
) -> Result<NaiveDate> {
    let anchor = week_one_start(term, week_start)?;
    let days = 7 * (i64::from(week) - 1) + day_offset(day, week_start);
    anchor.checked_add_signed(Duration::days(days)).ok_or_else(|| {
        TermError::DateOutOfRange(format!(
            "week {week} {} of {} {}",
            day_code(day),
            term.name,
            term.year
        ))
    })
}

/// Term week and weekday of `date` relative to `term`, default week start.
pub fn date_to_week_day(date: NaiveDate, term: &Term) -> Result<(i32, Weekday)> {
    date_to_week_day_with_start(date, term, DEFAULT_WEEK_START)
}

/// Inverse of [`week_day_to_date_with_start`].
pub fn date_to_week_day_with_start(
    date: NaiveDate,
    term: &Term,
    week_start: Weekday,
) -> Result<(i32, Weekday)> {
    let anchor = week_one_start(term, week_start)?;
    let days = (date - anchor).num_days();
    let week = i32::try_from(days.div_euclid(7) + 1)
        .map_err(|_| TermError::DateOutOfRange(format!("{date} relative to {}", term.name)))?;
    Ok((week, date.weekday()))
}

/// A date expressed as a term-relative position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TermWeekDay {
    pub term: Term,
    pub week: i32,
    pub day: Weekday,
}

impl fmt::Display for TermWeekDay {
    /// Renders as a pattern fragment, e.g. `Mi1 Th`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {}", self.term.name.code(), self.week, day_code(self.day))
    }
}

/// Locate `date` in the term it most plausibly belongs to.
///
/// A date inside a term's eight full-term weeks belongs to that term. Any
/// other date goes to the term whose full-term span is nearest; a tie goes to
/// the later term.
///
/// # Errors
/// Returns `TermError::NoSuchYear` if neither academic year that could
/// contain `date` is in `calendar`.
pub fn locate(calendar: &TermCalendar, date: NaiveDate, week_start: Weekday) -> Result<TermWeekDay> {
    let term = infer_term(calendar, date, week_start)?;
    let (week, day) = date_to_week_day_with_start(date, &term, week_start)?;
    Ok(TermWeekDay { term, week, day })
}

/// The term nearest to `date`; see [`locate`].
pub fn infer_term(calendar: &TermCalendar, date: NaiveDate, week_start: Weekday) -> Result<Term> {
    let candidates: Vec<Term> = [date.year() - 1, date.year()]
        .into_iter()
        .filter_map(|year| calendar.resolve(year).ok())
        .flat_map(|ay| *ay.terms())
        .collect();

    let mut best: Option<(i64, Term)> = None;
    for term in candidates {
        let first = week_one_start(&term, week_start)?;
        let last = first
            .checked_add_signed(Duration::days(7 * FULL_TERM_WEEKS - 1))
            .unwrap_or(NaiveDate::MAX);
        let distance = if date < first {
            (first - date).num_days()
        } else if date > last {
            (date - last).num_days()
        } else {
            0
        };
        // Candidates are in chronological order, so `<=` lets a tie go to the later term.
        if best.is_none_or(|(d, _)| distance <= d) {
            best = Some((distance, term));
        }
    }

    best.map(|(_, term)| term)
        .ok_or(TermError::NoSuchYear(date.year()))
}
