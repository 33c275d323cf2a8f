//! DST handling -- attaching a civil timezone to wall-clock datetimes.
//!
//! Expansion works in local wall-clock time. Localizing a wall-clock time can
//! hit a spring-forward gap (the time never happens) or a fall-back overlap
//! (it happens twice). The default policy reports both as errors; the other
//! policies are explicit choices the caller opts into.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::error::{LocalTimeHazard, Result, TermError};

/// Longest gap to search across under [`DstPolicy::ShiftForward`].
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// Policy for wall-clock times that fall in a DST transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DstPolicy {
    /// Fail with `AmbiguousOrNonexistentLocalTime` for gaps and overlaps.
    #[default]
    Reject,
    /// Take the first instant of an overlap; gaps still fail.
    Earliest,
    /// Take the second instant of an overlap; gaps still fail.
    Latest,
    /// Move a gap time to the first valid minute after the gap; overlaps take
    /// the first instant.
    ShiftForward,
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse()
        .map_err(|_| TermError::InvalidTimezone(name.to_string()))
}

/// Localize with [`DstPolicy::Reject`].
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>> {
    localize_with_policy(naive, tz, DstPolicy::Reject)
}

/// Attach `tz` to a wall-clock datetime.
///
/// # Errors
/// Returns `TermError::AmbiguousOrNonexistentLocalTime` when `naive` falls in a
/// gap or overlap that `policy` does not resolve.
pub fn localize_with_policy(naive: NaiveDateTime, tz: Tz, policy: DstPolicy) -> Result<DateTime<Tz>> {
    let mapped = tz.from_local_datetime(&naive);
    if let Some(dt) = mapped.single() {
        return Ok(dt);
    }

    let hazard = if mapped.earliest().is_some() {
        LocalTimeHazard::Ambiguous
    } else {
        LocalTimeHazard::Nonexistent
    };

    let resolved = match (policy, hazard) {
        (DstPolicy::Reject, _) => None,
        (DstPolicy::Earliest | DstPolicy::ShiftForward, LocalTimeHazard::Ambiguous) => mapped.earliest(),
        (DstPolicy::Latest, LocalTimeHazard::Ambiguous) => mapped.latest(),
        (DstPolicy::ShiftForward, LocalTimeHazard::Nonexistent) => shift_past_gap(naive, tz),
        (DstPolicy::Earliest | DstPolicy::Latest, LocalTimeHazard::Nonexistent) => None,
    };

    resolved.ok_or_else(|| {
        tracing::debug!(%naive, timezone = %tz.name(), %hazard, "local time hazard");
        TermError::AmbiguousOrNonexistentLocalTime {
            datetime: naive,
            timezone: tz.name().to_string(),
            hazard,
        }
    })
}

/// First wall-clock minute after `naive` that exists in `tz`.
fn shift_past_gap(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    (1..=MAX_GAP_MINUTES).find_map(|minutes| {
        let candidate = naive.checked_add_signed(Duration::minutes(minutes))?;
        tz.from_local_datetime(&candidate).earliest()
    })
}
