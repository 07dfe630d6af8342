//! Record filtering by period

use crate::period::Interval;
use crate::types::{HealthRecord, MetricKind};

/// Keep the records whose `start_time` falls inside `interval` (both ends
/// inclusive), preserving input order.
pub fn filter_by_period(records: &[HealthRecord], interval: &Interval) -> Vec<HealthRecord> {
    records
        .iter()
        .filter(|r| interval.contains(&r.start_time))
        .cloned()
        .collect()
}

/// Keep the records carrying a value for `metric`
pub fn filter_by_metric(records: &[HealthRecord], metric: MetricKind) -> Vec<HealthRecord> {
    records
        .iter()
        .filter(|r| metric.value_of(r).is_some())
        .cloned()
        .collect()
}
