//! Period resolution
//!
//! Maps a granularity and a reference date onto the local-time interval the
//! trend view covers. Calendar arithmetic (leap years, month lengths) is
//! delegated to chrono.

use crate::error::ComputeError;
use crate::types::Granularity;
use chrono::{
    DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// First day of the calendar week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

/// Local calendar used to resolve periods and day keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    pub offset: FixedOffset,
    pub week_start: WeekStart,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl Calendar {
    pub fn new(offset: FixedOffset, week_start: WeekStart) -> Self {
        Self { offset, week_start }
    }

    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
            week_start: WeekStart::Sunday,
        }
    }

    /// Local calendar date of an instant
    pub fn local_date(&self, instant: &DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Local wall-clock time of an instant
    pub fn local_datetime(&self, instant: &DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local()
    }

    fn localize(&self, naive: NaiveDateTime) -> DateTime<FixedOffset> {
        self.offset
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| self.offset.from_utc_datetime(&naive))
    }
}

/// Parse a UTC offset such as `"UTC"`, `"Z"`, `"+05:30"` or `"-0800"`
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, ComputeError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("utc") || trimmed.eq_ignore_ascii_case("z") {
        return Ok(Utc.fix());
    }
    FixedOffset::from_str(trimmed).map_err(|_| ComputeError::InvalidTimezone(value.to_string()))
}

/// Inclusive local-time interval covered by a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<FixedOffset>,
    /// Last representable millisecond of the period (23:59:59.999)
    pub end: DateTime<FixedOffset>,
}

impl Interval {
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        let instant = instant.with_timezone(&self.start.timezone());
        self.start <= instant && instant <= self.end
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }
}

/// Resolve the interval for `granularity` around `reference`
pub fn resolve_period(
    granularity: Granularity,
    reference: NaiveDate,
    calendar: &Calendar,
) -> Interval {
    let first = snap_to_unit_start(reference, granularity, calendar.week_start);
    let last = match granularity {
        Granularity::Day => first,
        Granularity::Week => first.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX),
        Granularity::Month => first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX),
        Granularity::Year => {
            NaiveDate::from_ymd_opt(first.year(), 12, 31).unwrap_or(NaiveDate::MAX)
        }
    };

    Interval {
        start: calendar.localize(start_of_day(first)),
        end: calendar.localize(end_of_day(last)),
    }
}

/// Snap a date to the first day of its week, month or year
pub fn snap_to_unit_start(
    date: NaiveDate,
    granularity: Granularity,
    week_start: WeekStart,
) -> NaiveDate {
    match granularity {
        Granularity::Day => date,
        Granularity::Week => {
            let back = match week_start {
                WeekStart::Sunday => date.weekday().num_days_from_sunday(),
                WeekStart::Monday => date.weekday().num_days_from_monday(),
            };
            date.checked_sub_days(Days::new(back as u64)).unwrap_or(date)
        }
        Granularity::Month => date.with_day(1).unwrap_or(date),
        Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| start_of_day(date))
}
