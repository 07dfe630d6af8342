//! Health-data provider boundary
//!
//! The platform provider (Health Connect, HealthKit) lives outside this crate.
//! Views talk to it through `HealthDataProvider`; `StaticProvider` serves an
//! in-memory record set for the CLI, FFI and tests.

use crate::error::ProviderError;
use crate::types::{HealthRecord, MetricKind};
use chrono::{DateTime, Utc};

/// Platform health-data source
pub trait HealthDataProvider {
    /// Prepare the provider. Must succeed (return `Ok(true)`) before any fetch.
    fn initialize(&mut self) -> Result<bool, ProviderError>;

    /// Fetch the records of `metric` starting within `[start, end]`
    fn fetch_records(
        &self,
        metric: MetricKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HealthRecord>, ProviderError>;
}

/// Provider backed by a fixed record set
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    records: Vec<HealthRecord>,
    initialized: bool,
    init_error: Option<ProviderError>,
    fetch_error: Option<ProviderError>,
}

impl StaticProvider {
    pub fn new(records: Vec<HealthRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    /// A provider whose initialization always fails with `error`
    pub fn failing_init(error: ProviderError) -> Self {
        Self {
            init_error: Some(error),
            ..Default::default()
        }
    }

    /// Make every subsequent fetch fail with `error`
    pub fn with_fetch_error(mut self, error: ProviderError) -> Self {
        self.fetch_error = Some(error);
        self
    }

    /// Add records, replacing any existing record with the same id
    pub fn upsert(&mut self, records: Vec<HealthRecord>) {
        for record in records {
            match self.records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => self.records.push(record),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl HealthDataProvider for StaticProvider {
    fn initialize(&mut self) -> Result<bool, ProviderError> {
        if let Some(error) = &self.init_error {
            return Err(error.clone());
        }
        self.initialized = true;
        Ok(true)
    }

    fn fetch_records(
        &self,
        metric: MetricKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HealthRecord>, ProviderError> {
        if !self.initialized {
            return Err(ProviderError::NotInitialized);
        }
        if let Some(error) = &self.fetch_error {
            return Err(error.clone());
        }

        Ok(self
            .records
            .iter()
            .filter(|r| r.metric() == metric)
            .filter(|r| start <= r.start_time && r.start_time <= end)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Measurement;
    use chrono::{Duration, TimeZone};

    fn records() -> Vec<HealthRecord> {
        let base = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
        vec![
            HealthRecord::instant("s1", base, Measurement::Steps { count: 10 }).unwrap(),
            HealthRecord::instant("s2", base + Duration::days(2), Measurement::Steps { count: 20 })
                .unwrap(),
            HealthRecord::instant(
                "h1",
                base,
                Measurement::HeartRate {
                    beats_per_minute: 60.0,
                },
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_fetch_requires_initialize() {
        let provider = StaticProvider::new(records());
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let result = provider.fetch_records(MetricKind::Steps, start, start + Duration::days(1));
        assert_eq!(result, Err(ProviderError::NotInitialized));
    }

    #[test]
    fn test_fetch_filters_metric_and_range() {
        let mut provider = StaticProvider::new(records());
        assert_eq!(provider.initialize(), Ok(true));

        let start = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let fetched = provider
            .fetch_records(MetricKind::Steps, start, start + Duration::days(1))
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, "s1");
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut provider = StaticProvider::new(records());
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        provider.upsert(vec![
            HealthRecord::instant("s1", at, Measurement::Steps { count: 99 }).unwrap(),
            HealthRecord::instant("s3", at, Measurement::Steps { count: 1 }).unwrap(),
        ]);
        assert_eq!(provider.len(), 4);
    }

    #[test]
    fn test_failing_provider() {
        let mut provider =
            StaticProvider::failing_init(ProviderError::PermissionDenied("steps".into()));
        assert!(provider.initialize().is_err());
        assert!(!provider.is_initialized());
    }
}
