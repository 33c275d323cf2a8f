//! Pattern parser -- converts pattern text into a [`Pattern`] of clauses.
//!
//! Grammar (term and day codes are case-insensitive):
//!
//! ```text
//! pattern    := clause (";" clause)*
//! clause     := multiplier | atom
//! multiplier := "x" INTEGER
//! atom       := term_code? week_list day_set time_spec
//! term_code  := "Mi" | "Le" | "Ea"
//! week_list  := week_item ("," week_item)*
//! week_item  := SIGNED ("-" SIGNED)?
//! day_set    := ("M" | "Tu" | "W" | "Th" | "F" | "Sa" | "Su")+
//! time_spec  := time (("-" time) | ("x" duration))?
//! time       := HOUR ((":" | ".") MINUTE)? ("am" | "pm")?
//! duration   := HOURS ((":" | ".") MINUTES)?
//! ```
//!
//! Whitespace may separate the components of an atom and surround `;`, but
//! not appear inside a week list, time or duration. A bare hour from 1 to 7
//! means the afternoon (`Tu 2-4` is 14:00-16:00); use `am` for early mornings.
//! The end of a range that starts in the afternoon stays in the afternoon, so
//! `7-9` is 19:00-21:00.
//!
//! # Key design decisions
//!
//! - **Single cursor**: one [`Scanner`] walks the original input, so every
//!   error carries the column of the offending character in the caller's text.
//! - **Fail closed**: anything the grammar does not accept is an error. There
//!   is no partial result.

use std::str::FromStr;

use chrono::{NaiveTime, Timelike, Weekday};

use crate::atom::{
    day_from_code, Atom, Clause, DaySpec, Multiplier, Pattern, TimeSpec, WeekSpec, MAX_WEEK,
};
use crate::calendar::TermName;
use crate::error::{Result, TermError};

/// Parse a pattern string.
///
/// # Errors
/// Returns `TermError::PatternSyntax` for any input outside the grammar, and
/// `TermError::OvernightEvent` for a time range or duration that ends on the
/// following day.
///
/// # Examples
///
/// ```
/// use term_engine::parse;
///
/// let pattern = parse("Mi1-8 MWF 10; x5").unwrap();
/// assert_eq!(pattern.clauses().len(), 2);
/// assert_eq!(pattern.to_string(), "Mi1-8 MWF 10; x5");
/// ```
pub fn parse(pattern: &str) -> Result<Pattern> {
    let mut scanner = Scanner::new(pattern);
    scanner.skip_ws();
    if scanner.at_end() {
        return Err(scanner.error("empty pattern"));
    }

    let mut clauses = Vec::new();
    loop {
        clauses.push(parse_clause(&mut scanner)?);
        scanner.skip_ws();
        match scanner.peek() {
            None => break,
            Some(';') => scanner.bump(),
            Some(c) => return Err(scanner.error(format!("unexpected '{c}'"))),
        }
    }
    Ok(Pattern::new(clauses))
}

impl FromStr for Pattern {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Pattern> {
        parse(s)
    }
}

/// Byte cursor over the input with case-insensitive lookahead helpers.
struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Scanner { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume `lit` if the input continues with it, ignoring ASCII case.
    fn eat_ci(&mut self, lit: &str) -> bool {
        let matches = self
            .rest()
            .get(..lit.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(lit));
        if matches {
            self.pos += lit.len();
        }
        matches
    }

    fn digits(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn error(&self, message: impl Into<String>) -> TermError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> TermError {
        TermError::PatternSyntax {
            column: self.src[..pos].chars().count() + 1,
            message: message.into(),
        }
    }
}

fn parse_clause(s: &mut Scanner<'_>) -> Result<Clause> {
    s.skip_ws();
    match s.peek() {
        None | Some(';') => Err(s.error("empty clause")),
        Some('x' | 'X') => parse_multiplier(s).map(Clause::Multiplier),
        Some(_) => parse_atom(s).map(Clause::Atom),
    }
}

fn parse_multiplier(s: &mut Scanner<'_>) -> Result<Multiplier> {
    let start = s.pos;
    s.bump();
    let digits = s.digits();
    if digits.is_empty() {
        return Err(s.error("expected repetition count after 'x'"));
    }
    let count: u32 = digits
        .parse()
        .map_err(|_| s.error_at(start, "repetition count too large"))?;
    if count == 0 {
        return Err(s.error_at(start, "repetition count must be at least 1"));
    }
    Ok(Multiplier { count })
}

fn parse_atom(s: &mut Scanner<'_>) -> Result<Atom> {
    let term = parse_term(s)?;
    s.skip_ws();
    let weeks = parse_weeks(s)?;
    s.skip_ws();
    let days = parse_days(s)?;
    s.skip_ws();
    let time = parse_time_spec(s)?;
    Ok(Atom {
        term,
        weeks,
        days,
        time,
    })
}

fn parse_term(s: &mut Scanner<'_>) -> Result<Option<TermName>> {
    if !s.peek().is_some_and(|c| c.is_alphabetic()) {
        return Ok(None);
    }
    let code: String = s.rest().chars().take(2).collect();
    match TermName::from_code(&code) {
        Some(term) => {
            s.pos += code.len();
            Ok(Some(term))
        }
        None => Err(s.error(format!("unknown term code '{code}'"))),
    }
}

fn parse_week_number(s: &mut Scanner<'_>) -> Result<i32> {
    let start = s.pos;
    let negative = s.eat('-');
    let digits = s.digits();
    if digits.is_empty() {
        return Err(s.error("expected week number"));
    }
    let magnitude = digits
        .parse::<u32>()
        .ok()
        .and_then(|n| i32::try_from(n).ok())
        .filter(|&n| n <= MAX_WEEK)
        .ok_or_else(|| s.error_at(start, format!("week {digits} out of range")))?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn parse_weeks(s: &mut Scanner<'_>) -> Result<WeekSpec> {
    let list_start = s.pos;
    let mut weeks = Vec::new();
    loop {
        let item_start = s.pos;
        let lo = parse_week_number(s)?;
        let hi = if s.eat('-') {
            parse_week_number(s)?
        } else {
            lo
        };
        if hi < lo {
            return Err(s.error_at(item_start, format!("descending week range {lo}-{hi}")));
        }
        weeks.extend(lo..=hi);
        if !s.eat(',') {
            break;
        }
    }
    WeekSpec::new(weeks).ok_or_else(|| s.error_at(list_start, "invalid week list"))
}

fn parse_days(s: &mut Scanner<'_>) -> Result<DaySpec> {
    let list_start = s.pos;
    let mut days: Vec<Weekday> = Vec::new();
    while s.peek().is_some_and(|c| c.is_alphabetic()) {
        let code_start = s.pos;
        let day = ["Tu", "Th", "Sa", "Su", "M", "W", "F"]
            .into_iter()
            .find(|code| s.eat_ci(code))
            .and_then(day_from_code);
        let Some(day) = day else {
            let c = s.peek().unwrap_or_default();
            return Err(s.error(format!("unknown day code starting '{c}'")));
        };
        if days.contains(&day) {
            return Err(s.error_at(code_start, format!("day {day} repeated")));
        }
        days.push(day);
    }
    DaySpec::new(days).ok_or_else(|| s.error_at(list_start, "expected day codes"))
}

/// Optional `:MM` or `.MM` suffix.
fn parse_minutes(s: &mut Scanner<'_>) -> Result<u32> {
    if !(s.eat(':') || s.eat('.')) {
        return Ok(0);
    }
    let start = s.pos;
    let digits = s.digits();
    match digits.parse::<u32>() {
        Ok(minutes) if digits.len() == 2 && minutes < 60 => Ok(minutes),
        _ => Err(s.error_at(start, "minutes must be two digits from 00 to 59")),
    }
}

/// Parse a clock time. `after` is the start time when parsing the end of a
/// range: a bare end hour below 12 after an afternoon start is afternoon too.
fn parse_clock(s: &mut Scanner<'_>, what: &str, after: Option<NaiveTime>) -> Result<NaiveTime> {
    let start = s.pos;
    let digits = s.digits();
    if digits.is_empty() {
        return Err(s.error(format!("expected {what}")));
    }
    let hour: u32 = digits
        .parse()
        .map_err(|_| s.error_at(start, format!("{what} out of range")))?;
    let minute = parse_minutes(s)?;

    let hour = if s.eat_ci("am") {
        match hour {
            12 => Some(0),
            1..=11 => Some(hour),
            _ => None,
        }
    } else if s.eat_ci("pm") {
        match hour {
            12 => Some(12),
            1..=11 => Some(hour + 12),
            _ => None,
        }
    } else {
        let afternoon_start = after.is_some_and(|start| start.hour() >= 12);
        match hour {
            0..=11 if afternoon_start => Some(hour + 12),
            1..=7 => Some(hour + 12),
            0..=23 => Some(hour),
            _ => None,
        }
    };

    hour.and_then(|h| NaiveTime::from_hms_opt(h, minute, 0))
        .ok_or_else(|| s.error_at(start, format!("{what} out of range")))
}

fn parse_duration(s: &mut Scanner<'_>) -> Result<u32> {
    let start = s.pos;
    let digits = s.digits();
    if digits.is_empty() {
        return Err(s.error("expected duration after 'x'"));
    }
    let minutes = digits
        .parse::<u32>()
        .ok()
        .filter(|&hours| hours < 24)
        .map(|hours| hours * 60)
        .ok_or_else(|| s.error_at(start, "duration must be under 24 hours"))?;
    let minutes = minutes + parse_minutes(s)?;
    if minutes == 0 {
        return Err(s.error_at(start, "duration must be positive"));
    }
    Ok(minutes)
}

fn parse_time_spec(s: &mut Scanner<'_>) -> Result<TimeSpec> {
    let start = parse_clock(s, "start time", None)?;
    let spec = if s.eat('-') {
        let end_pos = s.pos;
        let end = parse_clock(s, "end time", Some(start))?;
        if end == start {
            return Err(s.error_at(end_pos, "time range is empty"));
        }
        TimeSpec::Range { start, end }
    } else if s.eat('x') || s.eat('X') {
        TimeSpec::Duration {
            start,
            minutes: parse_duration(s)?,
        }
    } else {
        TimeSpec::starting_at(start)
    };
    spec.bounds()?;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn scanner_reports_character_columns() {
        let err = parse("Mi1 Ä 10").unwrap_err();
        assert_eq!(
            err,
            TermError::PatternSyntax {
                column: 5,
                message: "unknown day code starting 'Ä'".to_string()
            }
        );
    }

    #[test]
    fn afternoon_convention_for_small_hours() {
        let mut s = Scanner::new("2");
        assert_eq!(parse_clock(&mut s, "start time", None).unwrap(), time(14, 0));
        let mut s = Scanner::new("2am");
        assert_eq!(parse_clock(&mut s, "start time", None).unwrap(), time(2, 0));
        let mut s = Scanner::new("12pm");
        assert_eq!(parse_clock(&mut s, "start time", None).unwrap(), time(12, 0));
        let mut s = Scanner::new("12am");
        assert_eq!(parse_clock(&mut s, "start time", None).unwrap(), time(0, 0));
        let mut s = Scanner::new("9.30");
        assert_eq!(parse_clock(&mut s, "start time", None).unwrap(), time(9, 30));
    }

    #[test]
    fn end_hour_follows_afternoon_start() {
        let mut s = Scanner::new("9");
        assert_eq!(parse_clock(&mut s, "end time", Some(time(19, 0))).unwrap(), time(21, 0));
        let mut s = Scanner::new("9");
        assert_eq!(parse_clock(&mut s, "end time", Some(time(10, 0))).unwrap(), time(9, 0));
        let mut s = Scanner::new("9am");
        assert_eq!(parse_clock(&mut s, "end time", Some(time(19, 0))).unwrap(), time(9, 0));
    }

    #[test]
    fn duration_accepts_hours_and_minutes() {
        let mut s = Scanner::new("1.30");
        assert_eq!(parse_duration(&mut s).unwrap(), 90);
        let mut s = Scanner::new("0:45");
        assert_eq!(parse_duration(&mut s).unwrap(), 45);
        let mut s = Scanner::new("0");
        assert!(parse_duration(&mut s).is_err());
    }
}
