//! `termdates` CLI: expand, parse and inspect academic term-week date patterns.
//!
//! ## Usage
//!
//! ```sh
//! # Expand a pattern for the 2012-13 academic year
//! termdates expand "Mi1-8 MWF 10" --year 2012
//!
//! # Several patterns sharing a group template, localized to London
//! termdates expand "x5" "Le1 F 9" --year 2012 --template "Mi1 Th 10" \
//!     --timezone Europe/London --format json
//!
//! # Canonical form of a pattern
//! termdates parse "mi 1-3,5 mwf 9.30-11"
//!
//! # Which term week a date falls in
//! termdates week 2012-11-01
//!
//! # Term start dates, optionally from a custom calendar file
//! termdates terms 2030 --calendar terms.json
//! ```
//!
//! Logging goes to stderr. `RUST_LOG` sets the filter (default `warn`) and
//! `-v` forces `debug`.

use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Weekday};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use term_engine::atom::day_from_code;
use term_engine::{
    expand_many_in_timezone_with_options, expand_many_with_options, locate, parse, DstPolicy,
    ExpandOptions, Occurrence, TermCalendar, YearEntry, ZonedOccurrence,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(
    name = "termdates",
    version,
    about = "Academic term-week date pattern expander"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand patterns into concrete occurrences
    Expand {
        /// One or more patterns, each expanded independently
        #[arg(required = true)]
        patterns: Vec<String>,
        /// Academic year (the calendar year Michaelmas falls in)
        #[arg(short, long)]
        year: i32,
        /// Group template used to resolve `xN` clauses
        #[arg(short, long)]
        template: Option<String>,
        /// IANA timezone to localize occurrences into
        #[arg(long)]
        timezone: Option<String>,
        /// Weekday on which term weeks begin
        #[arg(long, value_parser = parse_weekday, default_value = "Th")]
        week_start: Weekday,
        /// How to treat local times in a DST gap or overlap
        #[arg(long, value_enum, default_value_t = DstArg::Reject)]
        dst: DstArg,
        /// JSON file of term dates to use instead of the builtin table ("-" for stdin)
        #[arg(long)]
        calendar: Option<String>,
    },
    /// Parse a pattern and print its canonical form
    Parse {
        pattern: String,
    },
    /// Show the term, week and day a date falls in
    Week {
        /// Date as YYYY-MM-DD
        date: NaiveDate,
        #[arg(long, value_parser = parse_weekday, default_value = "Th")]
        week_start: Weekday,
        #[arg(long)]
        calendar: Option<String>,
    },
    /// Show the term start dates of an academic year
    Terms {
        year: i32,
        #[arg(long)]
        calendar: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum DstArg {
    Reject,
    Earliest,
    Latest,
    ShiftForward,
}

impl From<DstArg> for DstPolicy {
    fn from(arg: DstArg) -> DstPolicy {
        match arg {
            DstArg::Reject => DstPolicy::Reject,
            DstArg::Earliest => DstPolicy::Earliest,
            DstArg::Latest => DstPolicy::Latest,
            DstArg::ShiftForward => DstPolicy::ShiftForward,
        }
    }
}

/// Occurrence with ISO 8601 strings, the shape printed by `--format json`.
#[derive(Serialize)]
struct OccurrenceDto {
    start: String,
    end: String,
}

impl From<Occurrence<NaiveDateTime>> for OccurrenceDto {
    fn from(occurrence: Occurrence<NaiveDateTime>) -> Self {
        OccurrenceDto {
            start: occurrence.start.format("%Y-%m-%dT%H:%M:%S").to_string(),
            end: occurrence.end.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

impl From<ZonedOccurrence> for OccurrenceDto {
    fn from(occurrence: ZonedOccurrence) -> Self {
        OccurrenceDto {
            start: occurrence.start.to_rfc3339(),
            end: occurrence.end.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct WeekDto {
    year: i32,
    term: String,
    week: i32,
    day: String,
    label: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Expand {
            patterns,
            year,
            template,
            timezone,
            week_start,
            dst,
            calendar,
        } => {
            let custom = load_calendar(calendar.as_deref())?;
            let options = ExpandOptions {
                calendar: custom.as_ref().unwrap_or_else(|| TermCalendar::builtin()),
                week_start,
                dst_policy: dst.into(),
            };

            let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
            let blocks: Vec<Vec<OccurrenceDto>> = match timezone.as_deref() {
                Some(tz) => expand_many_in_timezone_with_options(
                    &patterns,
                    year,
                    template.as_deref(),
                    tz,
                    &options,
                )
                .context("Failed to expand patterns")?
                .into_iter()
                .map(|block| block.into_iter().map(OccurrenceDto::from).collect())
                .collect(),
                None => expand_many_with_options(&patterns, year, template.as_deref(), &options)
                    .context("Failed to expand patterns")?
                    .into_iter()
                    .map(|block| block.into_iter().map(OccurrenceDto::from).collect())
                    .collect(),
            };

            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&blocks)?),
                Format::Text => {
                    for (i, block) in blocks.iter().enumerate() {
                        if i > 0 {
                            println!();
                        }
                        for occurrence in block {
                            println!("{}\t{}", occurrence.start, occurrence.end);
                        }
                    }
                }
            }
        }
        Commands::Parse { pattern } => {
            let parsed = parse(&pattern).context("Failed to parse pattern")?;
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&parsed)?),
                Format::Text => println!("{parsed}"),
            }
        }
        Commands::Week {
            date,
            week_start,
            calendar,
        } => {
            let custom = load_calendar(calendar.as_deref())?;
            let calendar = custom.as_ref().unwrap_or_else(|| TermCalendar::builtin());
            let found = locate(calendar, date, week_start)
                .with_context(|| format!("Failed to locate {date} in a term"))?;
            match cli.format {
                Format::Json => {
                    let dto = WeekDto {
                        year: found.term.year,
                        term: found.term.name.to_string(),
                        week: found.week,
                        day: found.day.to_string(),
                        label: found.to_string(),
                    };
                    println!("{}", serde_json::to_string_pretty(&dto)?);
                }
                Format::Text => println!("{} {}", found.term.year, found),
            }
        }
        Commands::Terms { year, calendar } => {
            let custom = load_calendar(calendar.as_deref())?;
            let calendar = custom.as_ref().unwrap_or_else(|| TermCalendar::builtin());
            let academic_year = calendar.resolve(year)?;
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&academic_year)?),
                Format::Text => {
                    for term in academic_year.terms() {
                        println!("{}\t{}", term.name, term.start);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Install a stderr subscriber. `-v` wins over `RUST_LOG`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let console_layer = fmt::layer()
        .compact()
        .with_writer(io::stderr)
        .with_target(true)
        .with_filter(filter);
    tracing_subscriber::registry().with(console_layer).init();
}

/// Accepts pattern day codes (`Th`) as well as chrono names (`thu`, `Thursday`).
fn parse_weekday(raw: &str) -> std::result::Result<Weekday, String> {
    day_from_code(raw)
        .or_else(|| raw.parse::<Weekday>().ok())
        .ok_or_else(|| format!("unknown weekday '{raw}'"))
}

fn load_calendar(path: Option<&str>) -> Result<Option<TermCalendar>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let json = read_input(path)?;
    let entries: Vec<YearEntry> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse calendar JSON: {path}"))?;
    let calendar = TermCalendar::from_entries(entries)
        .with_context(|| format!("Invalid calendar: {path}"))?;
    tracing::debug!(path, years = calendar.years().count(), "loaded custom calendar");
    Ok(Some(calendar))
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(Path::new(path)).with_context(|| format!("Failed to read file: {path}"))
}
