//! Tests for pattern expansion against the builtin term calendar.

use chrono::{NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc};
use term_engine::{
    expand, expand_in_timezone, expand_in_timezone_with_options, expand_many,
    expand_many_in_timezone, expand_many_in_timezone_with_options, expand_many_with_options,
    expand_with_options, DstPolicy, ExpandOptions, LocalTimeHazard, TermCalendar, TermError,
    YearEntry,
};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

// ---------------------------------------------------------------------------
// Single atoms
// ---------------------------------------------------------------------------

#[test]
fn michaelmas_week_one_thursday() {
    let result = expand("Mi1 Th 10", 2012, None).expect("should expand");
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].start, at(2012, 10, 4, 10, 0));
    assert_eq!(result[0].end, at(2012, 10, 4, 11, 0));
}

#[test]
fn mwf_across_eight_weeks() {
    let result = expand("Mi1-8 MWF 10", 2012, None).expect("should expand");
    assert_eq!(result.len(), 24, "8 weeks x 3 days");

    // Weeks run Thursday to Wednesday, so week 1 is Fri 5, Mon 8, Wed 10.
    assert_eq!(result[0].start, at(2012, 10, 5, 10, 0));
    assert_eq!(result[1].start, at(2012, 10, 8, 10, 0));
    assert_eq!(result[2].start, at(2012, 10, 10, 10, 0));
    assert_eq!(result[3].start, at(2012, 10, 12, 10, 0));
    assert_eq!(result[23].start, at(2012, 11, 28, 10, 0));
}

#[test]
fn afternoon_hours_and_explicit_end() {
    let result = expand("Le1 Tu 2-4", 2012, None).expect("should expand");
    // Lent 2013 week 1 starts Thu 17 Jan; its Tuesday is the 22nd.
    assert_eq!(result[0].start, at(2013, 1, 22, 14, 0));
    assert_eq!(result[0].end, at(2013, 1, 22, 16, 0));
}

#[test]
fn duration_form_sets_end() {
    let result = expand("Ea1 W 9.30x1.30", 2012, None).expect("should expand");
    // Easter 2013 week 1 starts Thu 25 Apr; its Wednesday is 1 May.
    assert_eq!(result[0].start, at(2013, 5, 1, 9, 30));
    assert_eq!(result[0].end, at(2013, 5, 1, 11, 0));
}

#[test]
fn week_zero_and_negative_weeks_precede_term() {
    let result = expand("Mi-1-0 Th 10", 2012, None).expect("should expand");
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].start, at(2012, 9, 20, 10, 0));
    assert_eq!(result[1].start, at(2012, 9, 27, 10, 0));
}

#[test]
fn termless_atom_covers_all_three_terms() {
    let result = expand("1 Th 10", 2012, None).expect("should expand");
    let starts: Vec<NaiveDateTime> = result.iter().map(|o| o.start).collect();
    assert_eq!(
        starts,
        vec![
            at(2012, 10, 4, 10, 0),
            at(2013, 1, 17, 10, 0),
            at(2013, 4, 25, 10, 0),
        ]
    );
}

#[test]
fn weekly_pattern_is_seven_days_apart() {
    let result = expand("Mi1-8 Th 10", 2013, None).expect("should expand");
    for pair in result.windows(2) {
        assert_eq!(pair[1].start - pair[0].start, chrono::Duration::days(7));
    }
    assert_eq!(result[0].start, at(2013, 10, 10, 10, 0));
}

// ---------------------------------------------------------------------------
// Semicolon composition and ordering
// ---------------------------------------------------------------------------

#[test]
fn semicolon_composes_independent_atoms() {
    let result = expand("Mi1 Th 10 ; Le1 F 9", 2012, None).expect("should expand");
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].start, at(2012, 10, 4, 10, 0));
    assert_eq!(result[0].end, at(2012, 10, 4, 11, 0));
    assert_eq!(result[1].start, at(2013, 1, 18, 9, 0));
    assert_eq!(result[1].end, at(2013, 1, 18, 10, 0));
}

#[test]
fn atoms_keep_source_order() {
    // Lent written first stays first; no global re-sort.
    let result = expand("Le1 F 9; Mi1 Th 10", 2012, None).expect("should expand");
    assert_eq!(result[0].start, at(2013, 1, 18, 9, 0));
    assert_eq!(result[1].start, at(2012, 10, 4, 10, 0));
}

#[test]
fn expand_many_keeps_inputs_separate() {
    let result = expand_many(&["Mi1 Th 10", "Le1-2 F 9", "x2"], 2012, Some("Ea1 M 12"))
        .expect("should expand");
    assert_eq!(result.len(), 3);
    assert_eq!(result[0].len(), 1);
    assert_eq!(result[1].len(), 2);
    assert_eq!(result[2].len(), 2);
    // Easter 2013 week 1 Monday is 29 Apr.
    assert_eq!(result[2][0].start, at(2013, 4, 29, 12, 0));
}

#[test]
fn expand_many_fails_on_first_bad_input() {
    let err = expand_many(&["Mi1 Th 10", "Mi1 Q 10"], 2012, None).unwrap_err();
    assert!(matches!(err, TermError::PatternSyntax { .. }), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// Multipliers
// ---------------------------------------------------------------------------

#[test]
fn multiplier_follows_template_shape() {
    let result = expand("x5", 2012, Some("Mi 1 Th 10")).expect("should expand");
    assert_eq!(result.len(), 5);
    for (i, occurrence) in result.iter().enumerate() {
        let start = at(2012, 10, 4, 10, 0) + chrono::Duration::weeks(i as i64);
        assert_eq!(occurrence.start, start, "occurrence {i}");
        assert_eq!(occurrence.end - occurrence.start, chrono::Duration::hours(1));
    }
}

#[test]
fn multiplier_starts_at_template_first_week() {
    let result = expand("x3", 2012, Some("Le3-4 MW 9-11")).expect("should expand");
    assert_eq!(result.len(), 6, "3 weeks x 2 days");
    // Lent week 3 starts Thu 31 Jan 2013: Mon 4 Feb, Wed 6 Feb.
    assert_eq!(result[0].start, at(2013, 2, 4, 9, 0));
    assert_eq!(result[0].end, at(2013, 2, 4, 11, 0));
    assert_eq!(result[5].start, at(2013, 2, 20, 9, 0));
}

#[test]
fn multiplier_mixed_with_atoms() {
    let result = expand("Mi1 Th 10; x2", 2012, Some("Le1 F 9")).expect("should expand");
    let starts: Vec<NaiveDateTime> = result.iter().map(|o| o.start).collect();
    assert_eq!(
        starts,
        vec![
            at(2012, 10, 4, 10, 0),
            at(2013, 1, 18, 9, 0),
            at(2013, 1, 25, 9, 0),
        ]
    );
}

#[test]
fn multiplier_without_template_fails() {
    let err = expand("x5", 2012, None).unwrap_err();
    assert_eq!(
        err,
        TermError::UnresolvedMultiplier {
            count: 5,
            reason: "no group template supplied".to_string()
        }
    );
}

#[test]
fn multiplier_with_unparsable_template_fails() {
    let err = expand("x5", 2012, Some("Mi1 Q 10")).unwrap_err();
    assert!(
        matches!(err, TermError::UnresolvedMultiplier { count: 5, .. }),
        "got: {err:?}"
    );

    let err = expand("x5", 2012, Some("Mi1 Th 10; Le1 F 9")).unwrap_err();
    assert!(matches!(err, TermError::UnresolvedMultiplier { .. }), "got: {err:?}");
}

#[test]
fn unused_template_is_not_parsed() {
    let result = expand("Mi1 Th 10", 2012, Some("not a pattern")).expect("should expand");
    assert_eq!(result.len(), 1);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn unknown_year_fails_closed() {
    let err = expand("Mi1 Th 10", 1899, None).unwrap_err();
    assert_eq!(err, TermError::NoSuchYear(1899));
}

#[test]
fn inverted_time_range_is_rejected() {
    let err = expand("Mi1 Th 10-9", 2012, None).unwrap_err();
    assert!(matches!(err, TermError::OvernightEvent { .. }), "got: {err:?}");
}

#[test]
fn duration_past_midnight_is_rejected() {
    let err = expand("Mi1 Th 23x2", 2012, None).unwrap_err();
    assert!(matches!(err, TermError::OvernightEvent { .. }), "got: {err:?}");
}

#[test]
fn syntax_error_is_not_an_empty_result() {
    let err = expand("Mi1-8 MWF", 2012, None).unwrap_err();
    assert!(matches!(err, TermError::PatternSyntax { .. }), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// Timezones
// ---------------------------------------------------------------------------

#[test]
fn bst_to_gmt_transition_shifts_utc_offset() {
    // BST ended on Sunday 28 Oct 2012.
    let result = expand_in_timezone("Mi1-5 Tu 12", 2012, None, "Europe/London")
        .expect("should expand");
    assert_eq!(result.len(), 5);

    let offsets: Vec<i32> = result
        .iter()
        .map(|o| o.start.offset().fix().local_minus_utc())
        .collect();
    assert_eq!(offsets, vec![3600, 3600, 3600, 0, 0]);

    // 12:00 BST is 11:00 UTC; 12:00 GMT is 12:00 UTC.
    assert_eq!(result[2].start.with_timezone(&Utc).hour(), 11);
    assert_eq!(result[3].start.with_timezone(&Utc).hour(), 12);
    assert_eq!(
        result[3].start,
        chrono_tz::Europe::London
            .with_ymd_and_hms(2012, 10, 30, 12, 0, 0)
            .unwrap()
    );
    for occurrence in &result {
        assert_eq!(occurrence.start.timezone(), chrono_tz::Europe::London);
    }
}

#[test]
fn nonexistent_local_time_is_an_error() {
    // Clocks went forward at 01:00 on Sunday 31 Mar 2013 (Lent week 11).
    let err = expand_in_timezone("Le11 Su 1.30am", 2012, None, "Europe/London").unwrap_err();
    assert_eq!(
        err,
        TermError::AmbiguousOrNonexistentLocalTime {
            datetime: at(2013, 3, 31, 1, 30),
            timezone: "Europe/London".to_string(),
            hazard: LocalTimeHazard::Nonexistent,
        }
    );
}

#[test]
fn ambiguous_local_time_is_an_error_by_default() {
    // Clocks went back at 02:00 on Sunday 28 Oct 2012 (Michaelmas week 4).
    let err = expand_in_timezone("Mi4 Su 1.30am", 2012, None, "Europe/London").unwrap_err();
    assert!(
        matches!(
            err,
            TermError::AmbiguousOrNonexistentLocalTime {
                hazard: LocalTimeHazard::Ambiguous,
                ..
            }
        ),
        "got: {err:?}"
    );
}

#[test]
fn explicit_policy_resolves_overlap() {
    let options = ExpandOptions {
        dst_policy: DstPolicy::Latest,
        ..ExpandOptions::default()
    };
    let result =
        expand_in_timezone_with_options("Mi4 Su 1.30am", 2012, None, "Europe/London", &options)
            .expect("latest policy should resolve");
    assert_eq!(
        result[0].start.with_timezone(&Utc),
        Utc.with_ymd_and_hms(2012, 10, 28, 1, 30, 0).unwrap()
    );
}

#[test]
fn invalid_timezone_is_rejected() {
    let err = expand_in_timezone("Mi1 Th 10", 2012, None, "Mars/Olympus").unwrap_err();
    assert_eq!(err, TermError::InvalidTimezone("Mars/Olympus".to_string()));
}

#[test]
fn expand_many_in_timezone_localizes_each_list() {
    let result = expand_many_in_timezone(&["Mi1 Th 10", "Le1 F 9"], 2012, None, "Europe/London")
        .expect("should expand");
    assert_eq!(result[0][0].start.offset().fix().local_minus_utc(), 3600);
    assert_eq!(result[1][0].start.offset().fix().local_minus_utc(), 0);
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[test]
fn monday_week_start_moves_week_boundaries() {
    let options = ExpandOptions {
        week_start: chrono::Weekday::Mon,
        ..ExpandOptions::default()
    };
    // Week 1 now runs Mon 1 Oct to Sun 7 Oct 2012.
    let result = expand_with_options("Mi1 M 10", 2012, None, &options).expect("should expand");
    assert_eq!(result[0].start, at(2012, 10, 1, 10, 0));
}

#[test]
fn custom_calendar_is_used() {
    let calendar = TermCalendar::from_entries([YearEntry {
        year: 1899,
        michaelmas: NaiveDate::from_ymd_opt(1899, 10, 12).unwrap(),
        lent: NaiveDate::from_ymd_opt(1900, 1, 18).unwrap(),
        easter: NaiveDate::from_ymd_opt(1900, 4, 26).unwrap(),
    }])
    .expect("valid calendar");
    let options = ExpandOptions {
        calendar: &calendar,
        ..ExpandOptions::default()
    };
    let result = expand_with_options("Mi1 Th 10", 1899, None, &options).expect("should expand");
    assert_eq!(result[0].start, at(1899, 10, 12, 10, 0));
}

#[test]
fn expand_many_with_options_applies_week_start_to_every_pattern() {
    let options = ExpandOptions {
        week_start: chrono::Weekday::Mon,
        ..ExpandOptions::default()
    };
    let result = expand_many_with_options(&["Mi1 M 10", "x2"], 2012, Some("Le1 M 9"), &options)
        .expect("should expand");
    assert_eq!(result.len(), 2);
    assert_eq!(result[0][0].start, at(2012, 10, 1, 10, 0));
    // Lent week 1 now starts Mon 14 Jan 2013.
    assert_eq!(result[1][0].start, at(2013, 1, 14, 9, 0));
    assert_eq!(result[1][1].start, at(2013, 1, 21, 9, 0));
}

#[test]
fn expand_many_in_timezone_with_options_applies_dst_policy() {
    let options = ExpandOptions {
        dst_policy: DstPolicy::Latest,
        ..ExpandOptions::default()
    };
    let result = expand_many_in_timezone_with_options(
        &["Mi1 Th 10", "Mi4 Su 1.30am"],
        2012,
        None,
        "Europe/London",
        &options,
    )
    .expect("overlap resolved");
    assert_eq!(
        result[1][0].start.with_timezone(&Utc),
        Utc.with_ymd_and_hms(2012, 10, 28, 1, 30, 0).unwrap()
    );
}

#[test]
fn expand_many_in_timezone_checks_timezone_first() {
    let err = expand_many_in_timezone_with_options(
        &["Mi1 Q 10"],
        2012,
        None,
        "Mars/Olympus",
        &ExpandOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err, TermError::InvalidTimezone("Mars/Olympus".to_string()));
}
