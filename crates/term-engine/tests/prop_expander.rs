//! Property-based tests for term-week arithmetic, parsing and expansion.
//!
//! These tests verify invariants that should hold for *any* valid input,
//! not just the specific examples in the other test files.

use chrono::{Datelike, Duration, Weekday};
use proptest::prelude::*;
use term_engine::week::{date_to_week_day_with_start, week_day_to_date_with_start};
use term_engine::{expand, parse, TermCalendar, TermName};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

const DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const DAY_CODES: [&str; 7] = ["M", "Tu", "W", "Th", "F", "Sa", "Su"];

fn arb_year() -> impl Strategy<Value = i32> {
    2011i32..=2029
}

fn arb_term() -> impl Strategy<Value = TermName> {
    prop_oneof![
        Just(TermName::Michaelmas),
        Just(TermName::Lent),
        Just(TermName::Easter),
    ]
}

fn arb_weekday() -> impl Strategy<Value = Weekday> {
    (0usize..7).prop_map(|i| DAYS[i])
}

/// Non-empty day set as a bitmask over Monday..Sunday.
fn arb_day_mask() -> impl Strategy<Value = u8> {
    1u8..128
}

fn day_codes(mask: u8) -> String {
    (0..7)
        .filter(|i| mask & (1 << i) != 0)
        .map(|i| DAY_CODES[i])
        .collect()
}

/// A time spec in working hours that never crosses midnight.
fn arb_time_spec() -> impl Strategy<Value = String> {
    (8u32..=18, prop_oneof![Just(0u32), Just(15), Just(30), Just(45)], 0usize..3).prop_map(
        |(h, m, form)| {
            let start = if m == 0 {
                format!("{h}")
            } else {
                format!("{h}.{m:02}")
            };
            match form {
                0 => start,
                1 => format!("{start}-{}", h + 2),
                _ => format!("{start}x1.30"),
            }
        },
    )
}

fn arb_atom() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just(""), Just("Mi"), Just("Le"), Just("Ea")],
        -2i32..=10,
        0i32..=5,
        arb_day_mask(),
        arb_time_spec(),
    )
        .prop_map(|(term, lo, len, mask, time)| {
            let weeks = if len == 0 {
                format!("{lo}")
            } else {
                format!("{lo}-{}", lo + len)
            };
            format!("{term}{weeks} {} {time}", day_codes(mask))
        })
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Property 1: (week, day) -> date -> (week, day) round-trips
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn week_day_round_trip(
        year in arb_year(),
        name in arb_term(),
        week in -2i32..=12,
        day in arb_weekday(),
        week_start in arb_weekday(),
    ) {
        let term = TermCalendar::builtin().resolve(year).unwrap().term(name);
        let date = week_day_to_date_with_start(&term, week, day, week_start).unwrap();
        let back = date_to_week_day_with_start(date, &term, week_start).unwrap();
        prop_assert_eq!(back, (week, day));
    }
}

// ---------------------------------------------------------------------------
// Property 2: ascending weeks with a fixed day expand in strictly increasing order
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn ascending_weeks_are_chronological(
        year in arb_year(),
        lo in -2i32..=8,
        len in 1i32..=6,
        mask in arb_day_mask(),
        code in prop_oneof![Just("Mi"), Just("Le"), Just("Ea")],
    ) {
        let pattern = format!("{code}{lo}-{} {} 10", lo + len, day_codes(mask));
        let events = expand(&pattern, year, None).unwrap();
        prop_assert_eq!(events.len(), (len as usize + 1) * mask.count_ones() as usize);
        for pair in events.windows(2) {
            prop_assert!(
                pair[0].start < pair[1].start,
                "{}: {:?} not before {:?}", pattern, pair[0].start, pair[1].start
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Property 3: every occurrence lands on a requested weekday, same day start/end
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn occurrences_fall_on_requested_days(
        year in arb_year(),
        atom in arb_atom(),
    ) {
        let parsed = parse(&atom).unwrap();
        let events = expand(&atom, year, None).unwrap();
        let term_atom = match &parsed.clauses()[0] {
            term_engine::Clause::Atom(a) => a.clone(),
            other => panic!("unexpected clause {other:?}"),
        };
        for ev in &events {
            prop_assert!(term_atom.days.contains(ev.start.weekday()));
            prop_assert_eq!(ev.start.date(), ev.end.date());
            prop_assert!(ev.start < ev.end);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 4: multiplier count gives weekly repetitions of the template
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn multiplier_count_respected(
        year in arb_year(),
        count in 1u32..=10,
        first in -2i32..=8,
        day in 0usize..7,
    ) {
        let template = format!("Mi{first} {} 10", DAY_CODES[day]);
        let events = expand(&format!("x{count}"), year, Some(&template)).unwrap();
        prop_assert_eq!(events.len(), count as usize);
        for pair in events.windows(2) {
            prop_assert_eq!(pair[1].start - pair[0].start, Duration::weeks(1));
        }
        let single = expand(&template, year, None).unwrap();
        prop_assert_eq!(events[0], single[0]);
    }
}

// ---------------------------------------------------------------------------
// Property 5: parsing is idempotent and canonical text parses back equal
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn parse_is_idempotent_and_canonical(
        atoms in prop::collection::vec(arb_atom(), 1..4),
    ) {
        let text = atoms.join(" ; ");
        let first = parse(&text).unwrap();
        let second = parse(&text).unwrap();
        prop_assert_eq!(&first, &second);
        let canonical = first.to_string();
        prop_assert_eq!(parse(&canonical).unwrap(), first);
    }
}

// ---------------------------------------------------------------------------
// Property 6: arbitrary text never panics the parser
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn parser_never_panics(text in "\\PC{0,40}") {
        let _ = parse(&text);
    }
}
