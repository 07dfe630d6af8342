//! Trend report encoding
//!
//! This module encodes the derived state of a `MetricView` into a chart-ready
//! JSON report. Every field is always present so hosts never branch on
//! missing statistics.

use crate::error::ComputeError;
use crate::period::Interval;
use crate::sleep::SleepBreakdown;
use crate::types::{Bucket, Granularity, MetricKind, Reduction, Summary};
use crate::view::MetricView;
use crate::{PRODUCER_NAME, TRENDS_VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Report producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Where and when the report was computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub view_instance_id: String,
    pub computed_at_utc: String,
}

/// Data quality of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportQuality {
    /// Records held by the view
    pub record_count: usize,
    /// Records inside the selected period
    pub filtered_count: usize,
    /// Malformed records dropped while parsing
    pub skipped_records: usize,
    pub loading: bool,
    pub error: Option<String>,
    /// No data in the selected period
    pub empty: bool,
}

/// Sleep stage section of a sleep report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepReport {
    pub breakdown: SleepBreakdown,
    pub efficiency: Option<f64>,
    pub deep_ratio: Option<f64>,
    pub rem_ratio: Option<f64>,
    pub light_ratio: Option<f64>,
    pub average_sleep_minutes: f64,
}

impl From<SleepBreakdown> for SleepReport {
    fn from(breakdown: SleepBreakdown) -> Self {
        Self {
            efficiency: breakdown.efficiency(),
            deep_ratio: breakdown.deep_ratio(),
            rem_ratio: breakdown.rem_ratio(),
            light_ratio: breakdown.light_ratio(),
            average_sleep_minutes: breakdown.average_sleep_minutes(),
            breakdown,
        }
    }
}

/// Complete trend report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub metric: MetricKind,
    pub unit: String,
    pub granularity: Granularity,
    /// Reference date (YYYY-MM-DD)
    pub reference_date: String,
    pub period: Interval,
    pub reduction: Reduction,
    pub accent_color: String,
    pub series: Vec<Bucket>,
    pub summary: Summary,
    pub goal_progress: Option<f64>,
    pub sleep: Option<SleepReport>,
    pub quality: ReportQuality,
}

/// Encoder for trend reports
pub struct TrendEncoder {
    instance_id: String,
}

impl Default for TrendEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode the current state of `view`
    pub fn encode(&self, view: &MetricView) -> TrendReport {
        let config = view.config();
        let filtered_count = view.filtered().len();
        let summary = view.summary();

        TrendReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: TRENDS_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: ReportProvenance {
                view_instance_id: view.instance_id().to_string(),
                computed_at_utc: Utc::now().to_rfc3339(),
            },
            metric: view.metric(),
            unit: view.metric().unit().to_string(),
            granularity: view.granularity(),
            reference_date: view.reference_date().format("%Y-%m-%d").to_string(),
            period: view.interval(),
            reduction: config.reduction(),
            accent_color: config.accent_color.clone(),
            series: view.series(),
            summary,
            goal_progress: view.goal_progress(),
            sleep: view.sleep_breakdown().map(SleepReport::from),
            quality: ReportQuality {
                record_count: view.records().len(),
                filtered_count,
                skipped_records: 0,
                loading: view.is_loading(),
                error: view.last_error().map(|e| e.to_string()),
                empty: summary.is_empty(),
            },
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(&self, view: &MetricView) -> Result<String, ComputeError> {
        let report = self.encode(view);
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::provider::StaticProvider;
    use crate::types::{HealthRecord, Measurement};
    use chrono::{NaiveDate, TimeZone};

    fn heart_rate_view() -> MetricView {
        let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let mut view =
            MetricView::new(ViewConfig::for_metric(MetricKind::HeartRate), today).unwrap();
        let records = [(8, 58.0), (12, 74.0), (18, 66.0)]
            .iter()
            .map(|(h, bpm)| {
                HealthRecord::instant(
                    format!("hr-{h}"),
                    Utc.with_ymd_and_hms(2024, 3, 4, *h, 0, 0).unwrap(),
                    Measurement::HeartRate {
                        beats_per_minute: *bpm,
                    },
                )
                .unwrap()
            })
            .collect();
        view.refresh(&mut StaticProvider::new(records));
        view
    }

    #[test]
    fn test_encode_report() {
        let view = heart_rate_view();
        let encoder = TrendEncoder::with_instance_id("encoder-1".to_string());
        let report = encoder.encode(&view);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.instance_id, "encoder-1");
        assert_eq!(report.provenance.view_instance_id, view.instance_id().to_string());
        assert_eq!(report.unit, "bpm");
        assert_eq!(report.reduction, Reduction::Mean);
        assert_eq!(report.series.len(), 3);
        assert_eq!(report.summary.average, 66.0);
        assert!(report.sleep.is_none());
        assert!(!report.quality.empty);
        assert_eq!(report.quality.filtered_count, 3);
    }

    #[test]
    fn test_report_json_fields() {
        let view = heart_rate_view();
        let json = TrendEncoder::new().encode_to_json(&view).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["producer"]["name"], PRODUCER_NAME);
        assert_eq!(value["metric"], "heart_rate");
        assert_eq!(value["granularity"], "day");
        assert_eq!(value["reference_date"], "2024-03-04");
        assert_eq!(value["series"][0]["label"], "08:00");
        assert_eq!(value["summary"]["max"], 74.0);
        assert!(value["goal_progress"].is_null());
    }

    #[test]
    fn test_empty_report() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let view = MetricView::new(ViewConfig::for_metric(MetricKind::Sleep), today).unwrap();
        let report = TrendEncoder::new().encode(&view);

        assert!(report.quality.empty);
        assert_eq!(report.summary, Summary::default());
        let sleep = report.sleep.unwrap();
        assert_eq!(sleep.efficiency, None);
        assert_eq!(sleep.average_sleep_minutes, 0.0);
    }
}
