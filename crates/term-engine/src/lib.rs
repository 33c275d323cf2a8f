//! # term-engine
//!
//! Academic-calendar date patterns for university timetables.
//!
//! Lecture lists describe recurring events in a compact notation:
//! `"Mi1-8 MWF 10"` is 10:00-11:00 on Mondays, Wednesdays and Fridays of
//! Michaelmas weeks 1 to 8. This crate parses that notation and expands it into
//! concrete occurrences for a given academic year, anchored to the term start
//! dates of that year, with optional DST-aware localization via `chrono-tz`.
//!
//! ## Modules
//!
//! - [`calendar`]: Academic years and their term start dates
//! - [`week`]: (term, week, day) ↔ calendar date arithmetic
//! - [`atom`]: Parsed pattern values (weeks, days, times, atoms)
//! - [`parser`]: Pattern text → [`Pattern`]
//! - [`template`]: Group templates for `xN` multiplier clauses
//! - [`expander`]: Pattern → list of concrete occurrences
//! - [`dst`]: Localization and DST transition policies
//! - [`error`]: Error types

pub mod atom;
pub mod calendar;
pub mod dst;
pub mod error;
pub mod expander;
pub mod parser;
pub mod template;
pub mod week;

pub use atom::{Atom, Clause, DaySpec, Multiplier, Pattern, TimeSpec, WeekSpec};
pub use calendar::{AcademicYear, Term, TermCalendar, TermName, YearEntry};
pub use dst::{localize, localize_with_policy, DstPolicy};
pub use error::{LocalTimeHazard, TermError};
pub use expander::{
    expand, expand_in_timezone, expand_in_timezone_with_options, expand_many,
    expand_many_in_timezone, expand_many_in_timezone_with_options, expand_many_with_options,
    expand_with_options, ExpandOptions, Expander, NaiveOccurrence, Occurrence, ZonedOccurrence,
};
pub use parser::parse;
pub use template::GroupTemplate;
pub use week::{date_to_week_day, locate, week_day_to_date, TermWeekDay};
