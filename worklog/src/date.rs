use chrono::offset::LocalResult;
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::WorklogError;

/// Source of the current instant, injected so that runs are reproducible under test
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Attaches `tz` to a wall clock time.
///
/// An ambiguous time (the repeated hour when DST ends) resolves to the earlier
/// instant. A time inside the DST gap keeps the offset in effect right before it.
///
/// # Errors
/// Only if no offset can be determined at all
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<FixedOffset>, WorklogError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
            Ok(dt.with_timezone(&dt.offset().fix()))
        }
        LocalResult::None => {
            let before_gap = tz
                .from_local_datetime(&(naive - Duration::hours(1)))
                .earliest()
                .ok_or_else(|| {
                    WorklogError::BadInput(format!("{naive} does not exist in {tz}"))
                })?;
            let offset = before_gap.offset().fix();
            offset.from_local_datetime(&naive).single().ok_or_else(|| {
                WorklogError::BadInput(format!("{naive} does not exist in {tz}"))
            })
        }
    }
}

/// Parses the name of an IANA timezone, e.g. `Europe/Oslo`
///
/// # Errors
/// If the name is unknown
pub fn parse_timezone(name: &str) -> Result<Tz, WorklogError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| WorklogError::InvalidTimezone(name.to_string()))
}

/// Parses the start of a synchronization window, supplied as
/// `2024-03-01` (midnight), `2024-03-01T08:30` or `2024-03-01 08:30`
///
/// # Errors
/// If the input matches none of the formats
#[allow(clippy::missing_panics_doc)]
pub fn str_to_naive_date_time(s: &str) -> Result<NaiveDateTime, WorklogError> {
    lazy_static! {
        static ref DATE_EXPR: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
        static ref DATE_TIME_EXPR: Regex =
            Regex::new(r"^(\d{4}-\d{2}-\d{2})[T ](\d{1,2}:\d{2})$").unwrap();
    }
    let s = s.trim();

    if DATE_EXPR.is_match(s) {
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| WorklogError::BadInput(format!("{s}: {e}")))?;
        Ok(date.and_time(NaiveTime::default()))
    } else if let Some(caps) = DATE_TIME_EXPR.captures(s) {
        let text = format!("{}T{}", &caps[1], &caps[2]);
        NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M")
            .map_err(|e| WorklogError::BadInput(format!("{s}: {e}")))
    } else {
        Err(WorklogError::BadInput(format!(
            "Unable to parse '{s}', expected yyyy-mm-dd or yyyy-mm-ddThh:mm"
        )))
    }
}

/// Whole days between `since` and `now`, seen from the user's timezone
#[must_use]
pub fn days_between(since: DateTime<Utc>, now: DateTime<Utc>, tz: Tz) -> i64 {
    (now.with_timezone(&tz) - since.with_timezone(&tz)).num_days()
}
