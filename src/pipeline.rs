//! Pipeline orchestration
//!
//! This module provides the high-level API for Synheart Trends.
//! It wires the stages together: payload adapter → provider → view
//! (period, filter, series, summary) → report encoder.

use crate::adapters::{adapter_for, PayloadFormat};
use crate::config::ViewConfig;
use crate::encoder::{TrendEncoder, TrendReport};
use crate::error::ComputeError;
use crate::provider::StaticProvider;
use crate::types::{Direction, Granularity};
use crate::view::{FetchOutcome, MetricView};
use chrono::NaiveDate;

/// Build a trend report from a raw provider payload (stateless, one-shot).
///
/// # Arguments
/// * `raw_json` - Provider payload in `format`
/// * `format` - Payload shape (canonical or Health Connect)
/// * `config` - View configuration; `config.metric` selects the records
/// * `granularity` - Period size
/// * `reference_date` - Anchor date of the period
///
/// # Example
/// ```ignore
/// let report = records_to_report(
///     &json,
///     PayloadFormat::HealthConnect,
///     ViewConfig::for_metric(MetricKind::Steps),
///     Granularity::Week,
///     NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
/// )?;
/// ```
pub fn records_to_report(
    raw_json: &str,
    format: PayloadFormat,
    config: ViewConfig,
    granularity: Granularity,
    reference_date: NaiveDate,
) -> Result<TrendReport, ComputeError> {
    let mut processor = TrendProcessor::new(config, reference_date)?;
    processor.ingest(raw_json, format)?;
    processor.select_granularity(granularity, reference_date);
    processor.refresh();
    Ok(processor.report())
}

/// Same as `records_to_report`, encoded as pretty-printed JSON
pub fn records_to_report_json(
    raw_json: &str,
    format: PayloadFormat,
    config: ViewConfig,
    granularity: Granularity,
    reference_date: NaiveDate,
) -> Result<String, ComputeError> {
    let report = records_to_report(raw_json, format, config, granularity, reference_date)?;
    serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
}

/// Stateful processor for a single trend screen.
///
/// Use this when the host keeps one view alive across user interactions and
/// feeds it payloads incrementally.
pub struct TrendProcessor {
    view: MetricView,
    provider: StaticProvider,
    encoder: TrendEncoder,
    skipped_records: usize,
}

impl TrendProcessor {
    /// Create a processor anchored on `today`
    pub fn new(config: ViewConfig, today: NaiveDate) -> Result<Self, ComputeError> {
        Ok(Self {
            view: MetricView::new(config, today)?,
            provider: StaticProvider::default(),
            encoder: TrendEncoder::new(),
            skipped_records: 0,
        })
    }

    pub fn view(&self) -> &MetricView {
        &self.view
    }

    /// Parse a payload and add its records. Returns the number accepted.
    pub fn ingest(&mut self, raw_json: &str, format: PayloadFormat) -> Result<usize, ComputeError> {
        let outcome = adapter_for(format).parse(raw_json, self.view.metric())?;
        let accepted = outcome.records.len();
        self.skipped_records += outcome.skipped.len();
        self.provider.upsert(outcome.records);
        tracing::debug!(
            metric = self.view.metric().as_str(),
            accepted,
            skipped = outcome.skipped.len(),
            "payload ingested"
        );
        Ok(accepted)
    }

    pub fn select_granularity(&mut self, granularity: Granularity, today: NaiveDate) {
        self.view.select_granularity(granularity, today);
    }

    pub fn navigate(&mut self, direction: Direction) {
        self.view.navigate(direction);
    }

    pub fn pick_date(&mut self, date: NaiveDate) {
        self.view.pick_date(date);
    }

    /// Re-fetch the current period from the ingested records
    pub fn refresh(&mut self) -> FetchOutcome {
        self.view.refresh(&mut self.provider)
    }

    pub fn report(&self) -> TrendReport {
        let mut report = self.encoder.encode(&self.view);
        report.quality.skipped_records = self.skipped_records;
        report
    }

    pub fn report_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(&self.report()).map_err(ComputeError::JsonError)
    }

    pub fn dispose(&mut self) {
        self.view.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_steps_json() -> &'static str {
        r#"{
            "records": [
                { "startTime": "2024-03-03T10:00:00Z", "endTime": "2024-03-03T11:00:00Z", "count": 1000, "metadata": { "id": "d0" } },
                { "startTime": "2024-03-04T10:00:00Z", "endTime": "2024-03-04T11:00:00Z", "count": 1200, "metadata": { "id": "d1" } },
                { "startTime": "2024-03-05T10:00:00Z", "endTime": "2024-03-05T11:00:00Z", "count": 900, "metadata": { "id": "d2" } },
                { "startTime": "2024-03-06T10:00:00Z", "endTime": "2024-03-06T11:00:00Z", "count": 1500, "metadata": { "id": "d3" } },
                { "startTime": "2024-03-07T10:00:00Z", "endTime": "2024-03-07T11:00:00Z", "count": 800, "metadata": { "id": "d4" } },
                { "startTime": "2024-03-08T10:00:00Z", "endTime": "2024-03-08T11:00:00Z", "count": 2000, "metadata": { "id": "d5" } },
                { "startTime": "2024-03-09T10:00:00Z", "endTime": "2024-03-09T11:00:00Z", "count": 600, "metadata": { "id": "d6" } },
                { "startTime": "2024-03-09T12:00:00Z", "count": 5 }
            ]
        }"#
    }

    #[test]
    fn test_records_to_report() {
        let report = records_to_report(
            sample_steps_json(),
            PayloadFormat::HealthConnect,
            ViewConfig::for_metric(MetricKind::Steps),
            Granularity::Week,
            date(2024, 3, 6),
        )
        .unwrap();

        assert_eq!(report.summary.total, 8000.0);
        assert_eq!(report.summary.rounded(2).average, 1142.86);
        assert_eq!(report.summary.max, 2000.0);
        assert_eq!(report.summary.min, 600.0);
        assert_eq!(report.series.len(), 7);
        assert_eq!(report.quality.skipped_records, 1);
    }

    #[test]
    fn test_processor_navigation() {
        let mut processor =
            TrendProcessor::new(ViewConfig::for_metric(MetricKind::Steps), date(2024, 3, 9))
                .unwrap();
        assert_eq!(
            processor
                .ingest(sample_steps_json(), PayloadFormat::HealthConnect)
                .unwrap(),
            7
        );

        assert_eq!(processor.refresh(), FetchOutcome::Applied { records: 1 });
        assert_eq!(processor.report().summary.total, 600.0);

        processor.navigate(Direction::Prev);
        processor.refresh();
        assert_eq!(processor.report().summary.total, 2000.0);

        processor.select_granularity(Granularity::Month, date(2024, 3, 9));
        processor.refresh();
        assert_eq!(processor.report().summary.total, 8000.0);

        processor.navigate(Direction::Next);
        processor.refresh();
        let report = processor.report();
        assert!(report.quality.empty);
        assert_eq!(report.reference_date, "2024-04-08");
    }

    #[test]
    fn test_ingest_keeps_records_without_ids() {
        let mut processor =
            TrendProcessor::new(ViewConfig::for_metric(MetricKind::Steps), date(2024, 3, 6))
                .unwrap();
        let monday = r#"[
            { "startTime": "2024-03-04T10:00:00Z", "endTime": "2024-03-04T11:00:00Z", "count": 1000 }
        ]"#;
        let tuesday = r#"[
            { "startTime": "2024-03-05T10:00:00Z", "endTime": "2024-03-05T11:00:00Z", "count": 500 }
        ]"#;

        assert_eq!(processor.ingest(monday, PayloadFormat::HealthConnect).unwrap(), 1);
        assert_eq!(processor.ingest(tuesday, PayloadFormat::HealthConnect).unwrap(), 1);

        processor.select_granularity(Granularity::Week, date(2024, 3, 6));
        processor.refresh();
        let report = processor.report();
        assert_eq!(report.summary.total, 1500.0);
        assert_eq!(report.summary.count, 2);
    }

    #[test]
    fn test_ingest_replaces_resent_record() {
        let mut processor =
            TrendProcessor::new(ViewConfig::for_metric(MetricKind::Steps), date(2024, 3, 4))
                .unwrap();
        let original = r#"[
            { "startTime": "2024-03-04T10:00:00Z", "endTime": "2024-03-04T11:00:00Z", "count": 1000, "metadata": { "id": "x" } }
        ]"#;
        let corrected = r#"[
            { "startTime": "2024-03-04T10:00:00Z", "endTime": "2024-03-04T11:00:00Z", "count": 1100, "metadata": { "id": "x" } }
        ]"#;

        processor.ingest(original, PayloadFormat::HealthConnect).unwrap();
        processor.ingest(corrected, PayloadFormat::HealthConnect).unwrap();
        processor.refresh();
        assert_eq!(processor.report().summary.total, 1100.0);
    }

    #[test]
    fn test_processor_dispose() {
        let mut processor =
            TrendProcessor::new(ViewConfig::for_metric(MetricKind::Steps), date(2024, 3, 9))
                .unwrap();
        processor.dispose();
        assert_eq!(processor.refresh(), FetchOutcome::Disposed);
    }

    #[test]
    fn test_invalid_json() {
        let result = records_to_report(
            "not valid json",
            PayloadFormat::HealthConnect,
            ViewConfig::default(),
            Granularity::Day,
            date(2024, 3, 6),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_payload_without_valid_records_gives_empty_report() {
        let payload = r#"[{ "startTime": "2024-03-04T10:00:00Z", "count": 5 }]"#;
        let report = records_to_report(
            payload,
            PayloadFormat::HealthConnect,
            ViewConfig::for_metric(MetricKind::Steps),
            Granularity::Week,
            date(2024, 3, 6),
        )
        .unwrap();

        assert!(report.quality.empty);
        assert_eq!(report.quality.skipped_records, 1);
        assert!(report.series.is_empty());
        assert_eq!(report.summary.count, 0);
    }

    #[test]
    fn test_report_json() {
        let json = records_to_report_json(
            sample_steps_json(),
            PayloadFormat::HealthConnect,
            ViewConfig::for_metric(MetricKind::Steps).with_fill_empty_days(true),
            Granularity::Month,
            date(2024, 3, 6),
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["series"].as_array().unwrap().len(), 31);
        assert_eq!(value["summary"]["total"], 8000.0);
    }
}
