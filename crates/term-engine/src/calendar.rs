//! Term calendar -- maps an academic year to its three term start dates.
//!
//! An academic year is identified by the calendar year it starts in (2013 is
//! 2013-2014). Each year has exactly three terms in fixed order. The start date
//! recorded for a term is the Thursday of full-term week 1, which is the anchor
//! day for term-week arithmetic (see [`crate::week`]).
//!
//! The builtin table is process-wide static data, built once on first use and
//! never mutated. Deployments with different dates build their own
//! [`TermCalendar`] with [`TermCalendar::from_entries`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TermError};

/// One of the three terms of an academic year, in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TermName {
    Michaelmas,
    Lent,
    Easter,
}

impl TermName {
    pub const ALL: [TermName; 3] = [TermName::Michaelmas, TermName::Lent, TermName::Easter];

    /// The two-letter code used in patterns.
    pub fn code(self) -> &'static str {
        match self {
            TermName::Michaelmas => "Mi",
            TermName::Lent => "Le",
            TermName::Easter => "Ea",
        }
    }

    /// Parse a two-letter term code, ignoring case.
    pub fn from_code(code: &str) -> Option<TermName> {
        TermName::ALL
            .into_iter()
            .find(|name| name.code().eq_ignore_ascii_case(code))
    }

    fn index(self) -> usize {
        match self {
            TermName::Michaelmas => 0,
            TermName::Lent => 1,
            TermName::Easter => 2,
        }
    }
}

impl fmt::Display for TermName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TermName::Michaelmas => "Michaelmas",
            TermName::Lent => "Lent",
            TermName::Easter => "Easter",
        };
        f.write_str(name)
    }
}

/// A term of a specific academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Term {
    /// Starting calendar year of the academic year this term belongs to.
    pub year: i32,
    pub name: TermName,
    /// Thursday of full-term week 1.
    pub start: NaiveDate,
}

/// The three terms of one academic year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcademicYear {
    pub year: i32,
    terms: [Term; 3],
}

impl AcademicYear {
    pub fn term(&self, name: TermName) -> Term {
        self.terms[name.index()]
    }

    /// Terms in chronological order.
    pub fn terms(&self) -> &[Term; 3] {
        &self.terms
    }

    pub fn term_starts(&self) -> (NaiveDate, NaiveDate, NaiveDate) {
        (
            self.terms[0].start,
            self.terms[1].start,
            self.terms[2].start,
        )
    }
}

/// A single row of a term calendar, as read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearEntry {
    pub year: i32,
    pub michaelmas: NaiveDate,
    pub lent: NaiveDate,
    pub easter: NaiveDate,
}

/// Full-term week 1 Thursdays. Michaelmas falls in the starting year, Lent and
/// Easter in the following one.
const BUILTIN_TERM_DATES: &[(i32, [(u32, u32); 3])] = &[
    (2011, [(10, 6), (1, 19), (4, 26)]),
    (2012, [(10, 4), (1, 17), (4, 25)]),
    (2013, [(10, 10), (1, 16), (4, 24)]),
    (2014, [(10, 9), (1, 15), (4, 23)]),
    (2015, [(10, 8), (1, 14), (4, 21)]),
    (2016, [(10, 6), (1, 19), (4, 27)]),
    (2017, [(10, 5), (1, 18), (4, 26)]),
    (2018, [(10, 4), (1, 17), (4, 25)]),
    (2019, [(10, 10), (1, 16), (4, 23)]),
    (2020, [(10, 8), (1, 21), (4, 29)]),
    (2021, [(10, 7), (1, 20), (4, 28)]),
    (2022, [(10, 6), (1, 19), (4, 27)]),
    (2023, [(10, 5), (1, 18), (4, 25)]),
    (2024, [(10, 10), (1, 23), (5, 1)]),
    (2025, [(10, 9), (1, 22), (4, 30)]),
    (2026, [(10, 8), (1, 21), (4, 29)]),
    (2027, [(10, 7), (1, 20), (4, 27)]),
    (2028, [(10, 5), (1, 18), (4, 26)]),
    (2029, [(10, 4), (1, 17), (4, 25)]),
];

static BUILTIN: LazyLock<TermCalendar> = LazyLock::new(|| {
    let years = BUILTIN_TERM_DATES
        .iter()
        .filter_map(|&(year, [mi, le, ea])| {
            Some((
                year,
                [
                    NaiveDate::from_ymd_opt(year, mi.0, mi.1)?,
                    NaiveDate::from_ymd_opt(year + 1, le.0, le.1)?,
                    NaiveDate::from_ymd_opt(year + 1, ea.0, ea.1)?,
                ],
            ))
        })
        .collect();
    TermCalendar { years }
});

/// Immutable lookup table from academic year to term start dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermCalendar {
    years: BTreeMap<i32, [NaiveDate; 3]>,
}

impl TermCalendar {
    /// The builtin calendar (2011-2029).
    pub fn builtin() -> &'static TermCalendar {
        &BUILTIN
    }

    /// Build a calendar from configuration rows.
    ///
    /// # Errors
    /// Returns `TermError::InvalidCalendar` if a year appears twice, if the terms
    /// of a year are out of order, or if Lent/Easter are not in the year after
    /// Michaelmas.
    pub fn from_entries(entries: impl IntoIterator<Item = YearEntry>) -> Result<TermCalendar> {
        let mut years = BTreeMap::new();
        for entry in entries {
            let starts = [entry.michaelmas, entry.lent, entry.easter];
            if entry.michaelmas.year() != entry.year {
                return Err(TermError::InvalidCalendar(format!(
                    "Michaelmas {} starts {}, outside {}",
                    entry.year, entry.michaelmas, entry.year
                )));
            }
            if entry.lent.year() != entry.year + 1 || entry.easter.year() != entry.year + 1 {
                return Err(TermError::InvalidCalendar(format!(
                    "Lent and Easter of {} must fall in {}",
                    entry.year,
                    entry.year + 1
                )));
            }
            if !starts.windows(2).all(|pair| pair[0] < pair[1]) {
                return Err(TermError::InvalidCalendar(format!(
                    "terms of {} are not in Michaelmas, Lent, Easter order",
                    entry.year
                )));
            }
            if years.insert(entry.year, starts).is_some() {
                return Err(TermError::InvalidCalendar(format!(
                    "year {} listed twice",
                    entry.year
                )));
            }
        }
        Ok(TermCalendar { years })
    }

    /// Look up an academic year.
    ///
    /// # Errors
    /// Returns `TermError::NoSuchYear` if the year is not in the table.
    pub fn resolve(&self, year: i32) -> Result<AcademicYear> {
        let Some(starts) = self.years.get(&year) else {
            tracing::trace!(year, "academic year missing from term calendar");
            return Err(TermError::NoSuchYear(year));
        };
        let terms = [0, 1, 2].map(|i| Term {
            year,
            name: TermName::ALL[i],
            start: starts[i],
        });
        Ok(AcademicYear { year, terms })
    }

    /// Michaelmas, Lent and Easter start dates for `year`.
    pub fn term_starts(&self, year: i32) -> Result<(NaiveDate, NaiveDate, NaiveDate)> {
        self.resolve(year).map(|ay| ay.term_starts())
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = YearEntry> + '_ {
        self.years.iter().map(|(&year, starts)| YearEntry {
            year,
            michaelmas: starts[0],
            lent: starts[1],
            easter: starts[2],
        })
    }
}

/// Look up an academic year in the builtin calendar.
pub fn resolve(year: i32) -> Result<AcademicYear> {
    TermCalendar::builtin().resolve(year)
}

/// Term start dates for `year` from the builtin calendar.
pub fn term_starts(year: i32) -> Result<(NaiveDate, NaiveDate, NaiveDate)> {
    TermCalendar::builtin().term_starts(year)
}
