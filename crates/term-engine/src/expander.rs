//! Pattern expansion -- converts pattern strings into concrete occurrences.
//!
//! Expansion walks each atom's terms, weeks and days in that nesting order,
//! so the occurrences of one atom come out in ascending order. Atoms are not
//! merged or re-sorted against each other: output follows source order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::atom::{Atom, Clause};
use crate::calendar::{AcademicYear, Term, TermCalendar};
use crate::dst::{localize_with_policy, parse_timezone, DstPolicy};
use crate::error::{Result, TermError};
use crate::parser::parse;
use crate::template::{resolve_clauses, GroupTemplate};
use crate::week::{week_day_to_date_with_start, DEFAULT_WEEK_START};

/// A single occurrence with start and end times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Occurrence<T> {
    pub start: T,
    pub end: T,
}

/// Wall-clock occurrence with no timezone attached.
pub type NaiveOccurrence = Occurrence<NaiveDateTime>;

/// Occurrence localized to an IANA timezone.
pub type ZonedOccurrence = Occurrence<DateTime<Tz>>;

/// Settings shared by every expansion entry point.
#[derive(Debug, Clone, Copy)]
pub struct ExpandOptions<'a> {
    pub calendar: &'a TermCalendar,
    pub week_start: Weekday,
    pub dst_policy: DstPolicy,
}

impl Default for ExpandOptions<'static> {
    fn default() -> Self {
        ExpandOptions {
            calendar: TermCalendar::builtin(),
            week_start: DEFAULT_WEEK_START,
            dst_policy: DstPolicy::Reject,
        }
    }
}

/// Expands atoms against one academic year.
#[derive(Debug, Clone)]
pub struct Expander {
    year: AcademicYear,
    week_start: Weekday,
}

impl Expander {
    /// # Errors
    /// Returns `TermError::NoSuchYear` if `year` is not in the options' calendar.
    pub fn new(year: i32, options: &ExpandOptions<'_>) -> Result<Expander> {
        Ok(Expander {
            year: options.calendar.resolve(year)?,
            week_start: options.week_start,
        })
    }

    pub fn academic_year(&self) -> &AcademicYear {
        &self.year
    }

    /// Lazily expand `atoms`. The iterator stops after the first error.
    pub fn occurrences<'a>(&'a self, atoms: &'a [Atom]) -> Occurrences<'a> {
        Occurrences {
            expander: self,
            atoms: atoms.iter(),
            current: None,
            done: false,
        }
    }

    fn cursor(&self, atom: &Atom) -> Result<AtomCursor> {
        let (start, end) = atom.time.bounds()?;
        let terms = match atom.term {
            Some(name) => vec![self.year.term(name)],
            None => self.year.terms().to_vec(),
        };
        Ok(AtomCursor {
            terms,
            weeks: atom.weeks.as_slice().to_vec(),
            days: atom.days.iter_from(self.week_start).collect(),
            start,
            end,
            term_idx: 0,
            week_idx: 0,
            day_idx: 0,
        })
    }
}

/// Position inside one atom's term x week x day product.
#[derive(Debug)]
struct AtomCursor {
    terms: Vec<Term>,
    weeks: Vec<i32>,
    days: Vec<Weekday>,
    start: NaiveTime,
    end: NaiveTime,
    term_idx: usize,
    week_idx: usize,
    day_idx: usize,
}

impl AtomCursor {
    fn next_slot(&mut self) -> Option<(Term, i32, Weekday)> {
        let slot = (
            *self.terms.get(self.term_idx)?,
            *self.weeks.get(self.week_idx)?,
            *self.days.get(self.day_idx)?,
        );
        self.day_idx += 1;
        if self.day_idx == self.days.len() {
            self.day_idx = 0;
            self.week_idx += 1;
            if self.week_idx == self.weeks.len() {
                self.week_idx = 0;
                self.term_idx += 1;
            }
        }
        Some(slot)
    }

    fn occurrence_on(&self, date: NaiveDate) -> NaiveOccurrence {
        Occurrence {
            start: date.and_time(self.start),
            end: date.and_time(self.end),
        }
    }
}

/// Iterator returned by [`Expander::occurrences`].
#[derive(Debug)]
pub struct Occurrences<'a> {
    expander: &'a Expander,
    atoms: std::slice::Iter<'a, Atom>,
    current: Option<AtomCursor>,
    done: bool,
}

impl Occurrences<'_> {
    fn fail(&mut self, err: TermError) -> Option<Result<NaiveOccurrence>> {
        self.done = true;
        Some(Err(err))
    }
}

impl Iterator for Occurrences<'_> {
    type Item = Result<NaiveOccurrence>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(cursor) = self.current.as_mut() {
                if let Some((term, week, day)) = cursor.next_slot() {
                    let date = match week_day_to_date_with_start(&term, week, day, self.expander.week_start) {
                        Ok(date) => date,
                        Err(err) => return self.fail(err),
                    };
                    return Some(Ok(cursor.occurrence_on(date)));
                }
            }
            let Some(atom) = self.atoms.next() else {
                self.done = true;
                return None;
            };
            match self.expander.cursor(atom) {
                Ok(cursor) => self.current = Some(cursor),
                Err(err) => return self.fail(err),
            }
        }
    }
}

/// Attach `tz` to both ends of an occurrence.
pub fn localize_occurrence(occurrence: NaiveOccurrence, tz: Tz, policy: DstPolicy) -> Result<ZonedOccurrence> {
    Ok(Occurrence {
        start: localize_with_policy(occurrence.start, tz, policy)?,
        end: localize_with_policy(occurrence.end, tz, policy)?,
    })
}

/// Parse `pattern` and resolve its multipliers into atoms.
///
/// The group template is parsed here, fresh, and only if a multiplier needs it.
///
/// # Errors
/// Syntax errors propagate. A multiplier with no template, or with a template
/// that does not parse, is `TermError::UnresolvedMultiplier`.
pub fn pattern_atoms(pattern: &str, group_template: Option<&str>) -> Result<Vec<Atom>> {
    let pattern = parse(pattern)?;
    let template = match (pattern.has_multiplier(), group_template) {
        (true, Some(text)) => Some(GroupTemplate::parse(text).map_err(|err| {
            let count = first_multiplier_count(pattern.clauses());
            TermError::UnresolvedMultiplier {
                count,
                reason: format!("group template unusable: {err}"),
            }
        })?),
        _ => None,
    };
    resolve_clauses(pattern.into_clauses(), template)
}

fn first_multiplier_count(clauses: &[Clause]) -> u32 {
    clauses
        .iter()
        .find_map(|clause| match clause {
            Clause::Multiplier(m) => Some(m.count),
            Clause::Atom(_) => None,
        })
        .unwrap_or_default()
}

/// Expand a pattern for an academic year into wall-clock occurrences.
///
/// # Arguments
/// - `pattern` -- pattern text (e.g., "Mi1-8 MWF 10; Le1 F 9")
/// - `year` -- starting calendar year of the academic year (e.g., 2012)
/// - `group_template` -- optional single-atom template for `xN` clauses
///
/// # Errors
/// Returns `TermError::PatternSyntax` or `TermError::OvernightEvent` for bad
/// pattern text, `TermError::UnresolvedMultiplier` for a multiplier without a
/// usable template, and `TermError::NoSuchYear` for a year missing from the
/// builtin calendar.
///
/// # Examples
///
/// ```
/// use term_engine::expand;
///
/// let events = expand("Mi1 Th 10 ; Le1 F 9", 2012, None).unwrap();
/// assert_eq!(events.len(), 2);
/// assert_eq!(events[0].start.to_string(), "2012-10-04 10:00:00");
/// assert_eq!(events[1].start.to_string(), "2013-01-18 09:00:00");
/// ```
pub fn expand(pattern: &str, year: i32, group_template: Option<&str>) -> Result<Vec<NaiveOccurrence>> {
    expand_with_options(pattern, year, group_template, &ExpandOptions::default())
}

/// [`expand`] with explicit calendar and week start.
pub fn expand_with_options(
    pattern: &str,
    year: i32,
    group_template: Option<&str>,
    options: &ExpandOptions<'_>,
) -> Result<Vec<NaiveOccurrence>> {
    let atoms = pattern_atoms(pattern, group_template)?;
    let expander = Expander::new(year, options)?;
    let occurrences = expander.occurrences(&atoms).collect::<Result<Vec<_>>>()?;
    tracing::debug!(pattern, year, count = occurrences.len(), "expanded pattern");
    Ok(occurrences)
}

/// Expand a pattern and localize every occurrence into `timezone`.
///
/// # Errors
/// As [`expand`], plus `TermError::InvalidTimezone` for a name that is not an
/// IANA timezone and `TermError::AmbiguousOrNonexistentLocalTime` when an
/// occurrence falls in a DST gap or overlap.
pub fn expand_in_timezone(
    pattern: &str,
    year: i32,
    group_template: Option<&str>,
    timezone: &str,
) -> Result<Vec<ZonedOccurrence>> {
    expand_in_timezone_with_options(pattern, year, group_template, timezone, &ExpandOptions::default())
}

/// [`expand_in_timezone`] with explicit calendar, week start and DST policy.
pub fn expand_in_timezone_with_options(
    pattern: &str,
    year: i32,
    group_template: Option<&str>,
    timezone: &str,
    options: &ExpandOptions<'_>,
) -> Result<Vec<ZonedOccurrence>> {
    let tz = parse_timezone(timezone)?;
    expand_with_options(pattern, year, group_template, options)?
        .into_iter()
        .map(|occurrence| localize_occurrence(occurrence, tz, options.dst_policy))
        .collect()
}

/// Expand several patterns independently, one result list per input.
///
/// Each pattern gets its own group template parsed from `group_template`.
/// The first failing pattern aborts the whole call.
pub fn expand_many(
    patterns: &[&str],
    year: i32,
    group_template: Option<&str>,
) -> Result<Vec<Vec<NaiveOccurrence>>> {
    expand_many_with_options(patterns, year, group_template, &ExpandOptions::default())
}

/// [`expand_many`] with explicit calendar and week start.
pub fn expand_many_with_options(
    patterns: &[&str],
    year: i32,
    group_template: Option<&str>,
    options: &ExpandOptions<'_>,
) -> Result<Vec<Vec<NaiveOccurrence>>> {
    patterns
        .iter()
        .map(|pattern| expand_with_options(pattern, year, group_template, options))
        .collect()
}

/// [`expand_many`] with localization into `timezone`.
pub fn expand_many_in_timezone(
    patterns: &[&str],
    year: i32,
    group_template: Option<&str>,
    timezone: &str,
) -> Result<Vec<Vec<ZonedOccurrence>>> {
    expand_many_in_timezone_with_options(patterns, year, group_template, timezone, &ExpandOptions::default())
}

/// [`expand_many_in_timezone`] with explicit calendar, week start and DST policy.
///
/// The timezone is checked once, before any pattern is expanded.
pub fn expand_many_in_timezone_with_options(
    patterns: &[&str],
    year: i32,
    group_template: Option<&str>,
    timezone: &str,
    options: &ExpandOptions<'_>,
) -> Result<Vec<Vec<ZonedOccurrence>>> {
    parse_timezone(timezone)?;
    patterns
        .iter()
        .map(|pattern| expand_in_timezone_with_options(pattern, year, group_template, timezone, options))
        .collect()
}
