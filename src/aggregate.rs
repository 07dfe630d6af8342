//! Bucketing and aggregation
//!
//! Turns a record set into a chart-ready series:
//! - `day` granularity keeps one point per record (time-of-day labels)
//! - `week`, `month` and `year` collapse records into one bucket per local
//!   calendar day, reduced with the metric's `Reduction`

use crate::period::{Calendar, Interval};
use crate::types::{Bucket, Granularity, HealthRecord, Reduction};
use chrono::{Days, NaiveDate, NaiveTime};
use std::collections::BTreeMap;

/// Build the chart series for `records`.
///
/// Records are stably sorted by `start_time` first, so records sharing a
/// timestamp keep their input order. Records whose extractor yields `None` or
/// a non-finite value are skipped.
pub fn to_series<F>(
    records: &[HealthRecord],
    granularity: Granularity,
    calendar: &Calendar,
    value_of: F,
    reduction: Reduction,
) -> Vec<Bucket>
where
    F: Fn(&HealthRecord) -> Option<f64>,
{
    let mut sorted: Vec<&HealthRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.start_time);

    let points = sorted.into_iter().filter_map(|r| {
        value_of(r)
            .filter(|v| v.is_finite())
            .map(|value| (r, value))
    });

    match granularity {
        Granularity::Day => points
            .map(|(record, value)| {
                let local = calendar.local_datetime(&record.start_time);
                Bucket {
                    label: local.format("%H:%M").to_string(),
                    value,
                    sort_key: local,
                    count: 1,
                }
            })
            .collect(),
        _ => {
            let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
            for (record, value) in points {
                by_day
                    .entry(calendar.local_date(&record.start_time))
                    .or_default()
                    .push(value);
            }

            by_day
                .into_iter()
                .map(|(day, values)| Bucket {
                    label: day_label(day, granularity),
                    value: reduction.reduce(&values),
                    sort_key: day.and_time(NaiveTime::default()),
                    count: values.len(),
                })
                .collect()
        }
    }
}

/// Calendar-day key (`YYYY-MM-DD`) used to group records
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Chart label for a daily bucket
pub fn day_label(day: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => day_key(day),
        Granularity::Week => day.format("%a").to_string(),
        Granularity::Month => day.format("%-d").to_string(),
        Granularity::Year => day.format("%b %-d").to_string(),
    }
}

/// Insert zero-valued buckets for days in `interval` that have no data.
///
/// Only applies to daily series; a `day` series is returned unchanged.
pub fn fill_missing_days(
    series: Vec<Bucket>,
    interval: &Interval,
    granularity: Granularity,
) -> Vec<Bucket> {
    if granularity == Granularity::Day {
        return series;
    }

    let mut by_day: BTreeMap<NaiveDate, Bucket> = series
        .into_iter()
        .map(|b| (b.sort_key.date(), b))
        .collect();

    let first = interval.start.date_naive();
    let last = interval.end.date_naive();
    let mut day = first;
    while day <= last {
        by_day.entry(day).or_insert_with(|| Bucket {
            label: day_label(day, granularity),
            value: 0.0,
            sort_key: day.and_time(NaiveTime::default()),
            count: 0,
        });
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }

    by_day.into_values().collect()
}
