//! Health Connect adapter
//!
//! Parses `readRecords` results from the Android Health Connect bridge and
//! maps them to typed health records.

use crate::error::ComputeError;
use crate::sleep::stage_from_code;
use crate::types::{CalorieKind, HealthRecord, Measurement, MetricKind, SleepStageSpan};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{ParseOutcome, RecordPayloadAdapter};

/// Health Connect payload adapter
pub struct HealthConnectAdapter;

impl RecordPayloadAdapter for HealthConnectAdapter {
    fn parse(&self, raw_json: &str, metric: MetricKind) -> Result<ParseOutcome, ComputeError> {
        let payload: HcPayload = serde_json::from_str(raw_json)?;
        let values = match payload {
            HcPayload::Wrapped { records } => records,
            HcPayload::Bare(records) => records,
        };

        let mut outcome = ParseOutcome::default();
        for (index, value) in values.into_iter().enumerate() {
            let record: HcRecord = match serde_json::from_value(value) {
                Ok(r) => r,
                Err(e) => {
                    outcome.skip(index, None, e.to_string());
                    continue;
                }
            };
            let id = record
                .metadata
                .as_ref()
                .and_then(|m| m.id.clone())
                .unwrap_or_else(|| fallback_id(metric));
            let origin = record.metadata.as_ref().and_then(|m| m.data_origin.clone());

            match convert_record(&record, &id, metric) {
                Ok(records) => {
                    for mut converted in records {
                        converted.origin = origin.clone();
                        outcome.accept(index, converted);
                    }
                }
                Err(reason) => outcome.skip(index, Some(id), reason),
            }
        }

        Ok(outcome)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HcPayload {
    Wrapped { records: Vec<Value> },
    Bare(Vec<Value>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcRecord {
    start_time: Option<String>,
    end_time: Option<String>,
    time: Option<String>,
    count: Option<f64>,
    distance: Option<HcLength>,
    energy: Option<HcEnergy>,
    samples: Option<Vec<HcHeartRateSample>>,
    percentage: Option<HcPercentage>,
    stages: Option<Vec<HcSleepStage>>,
    metadata: Option<HcMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcLength {
    in_meters: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcEnergy {
    in_kilocalories: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcHeartRateSample {
    time: String,
    beats_per_minute: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HcPercentage {
    Plain(f64),
    Wrapped { value: f64 },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcSleepStage {
    start_time: String,
    end_time: String,
    stage: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcMetadata {
    id: Option<String>,
    data_origin: Option<String>,
}

/// Id for a record the provider sent without one. Unique across payloads so
/// id-less records never replace each other.
fn fallback_id(metric: MetricKind) -> String {
    format!("{}-{}", metric.as_str(), Uuid::new_v4())
}

/// Parse an RFC 3339 timestamp into UTC
fn parse_hc_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn required_time(value: Option<&String>, field: &str) -> Result<DateTime<Utc>, String> {
    let raw = value.ok_or_else(|| format!("missing {field}"))?;
    parse_hc_time(raw).ok_or_else(|| format!("unparseable {field}: {raw}"))
}

fn session_bounds(record: &HcRecord) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
    Ok((
        required_time(record.start_time.as_ref(), "startTime")?,
        required_time(record.end_time.as_ref(), "endTime")?,
    ))
}

fn convert_record(
    record: &HcRecord,
    id: &str,
    metric: MetricKind,
) -> Result<Vec<HealthRecord>, String> {
    let single = |start: DateTime<Utc>, end: DateTime<Utc>, measurement: Measurement| {
        vec![HealthRecord {
            id: id.to_string(),
            start_time: start,
            end_time: end,
            origin: None,
            measurement,
        }]
    };

    match metric {
        MetricKind::Steps => {
            let (start, end) = session_bounds(record)?;
            let count = record.count.ok_or("missing count")?;
            if !count.is_finite() || count < 0.0 {
                return Err(format!("invalid step count: {count}"));
            }
            Ok(single(start, end, Measurement::Steps {
                count: count.round() as u64,
            }))
        }
        MetricKind::Distance => {
            let (start, end) = session_bounds(record)?;
            let meters = record
                .distance
                .as_ref()
                .and_then(|d| d.in_meters)
                .ok_or("missing distance.inMeters")?;
            Ok(single(start, end, Measurement::Distance { meters }))
        }
        MetricKind::Calories | MetricKind::ActiveCalories => {
            let (start, end) = session_bounds(record)?;
            let kilocalories = record
                .energy
                .as_ref()
                .and_then(|e| e.in_kilocalories)
                .ok_or("missing energy.inKilocalories")?;
            let kind = if metric == MetricKind::ActiveCalories {
                CalorieKind::Active
            } else {
                CalorieKind::Total
            };
            Ok(single(start, end, Measurement::Calories { kilocalories, kind }))
        }
        MetricKind::HeartRate => {
            let samples = record.samples.as_ref().ok_or("missing samples")?;
            let mut out = Vec::with_capacity(samples.len());
            for (i, sample) in samples.iter().enumerate() {
                let at = parse_hc_time(&sample.time)
                    .ok_or_else(|| format!("unparseable sample time: {}", sample.time))?;
                out.push(HealthRecord {
                    id: format!("{id}-{i}"),
                    start_time: at,
                    end_time: at,
                    origin: None,
                    measurement: Measurement::HeartRate {
                        beats_per_minute: sample.beats_per_minute,
                    },
                });
            }
            Ok(out)
        }
        MetricKind::Spo2 => {
            let at = required_time(record.time.as_ref(), "time")?;
            let percentage = match record.percentage.as_ref().ok_or("missing percentage")? {
                HcPercentage::Plain(v) => *v,
                HcPercentage::Wrapped { value } => *value,
            };
            Ok(single(at, at, Measurement::Spo2 { percentage }))
        }
        MetricKind::Sleep => {
            let (start, end) = session_bounds(record)?;
            let stages = record
                .stages
                .iter()
                .flatten()
                .map(|s| {
                    Ok(SleepStageSpan {
                        start_time: required_time(Some(&s.start_time), "stage startTime")?,
                        end_time: required_time(Some(&s.end_time), "stage endTime")?,
                        stage: stage_from_code(s.stage),
                    })
                })
                .collect::<Result<Vec<_>, String>>()?;
            Ok(single(start, end, Measurement::Sleep { stages }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SleepStage;

    #[test]
    fn test_parse_steps() {
        let json = r#"{
            "records": [
                {
                    "startTime": "2024-03-04T08:00:00.000Z",
                    "endTime": "2024-03-04T09:00:00.000Z",
                    "count": 1543,
                    "metadata": { "id": "abc", "dataOrigin": "com.google.android.apps.fitness" }
                },
                { "endTime": "2024-03-04T10:00:00.000Z", "count": 10 }
            ]
        }"#;

        let outcome = HealthConnectAdapter.parse(json, MetricKind::Steps).unwrap();
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.id, "abc");
        assert_eq!(
            record.origin.as_deref(),
            Some("com.google.android.apps.fitness")
        );
        assert_eq!(record.measurement, Measurement::Steps { count: 1543 });
        assert_eq!(outcome.skipped.len(), 1);
        let fallback = outcome.skipped[0].id.as_deref().unwrap();
        assert!(fallback.starts_with("steps-"));
    }

    #[test]
    fn test_fallback_ids_differ_across_payloads() {
        let json = r#"[
            { "startTime": "2024-03-04T08:00:00Z", "endTime": "2024-03-04T09:00:00Z", "count": 10 }
        ]"#;

        let first = HealthConnectAdapter.parse(json, MetricKind::Steps).unwrap();
        let second = HealthConnectAdapter.parse(json, MetricKind::Steps).unwrap();
        assert_ne!(first.records[0].id, second.records[0].id);
    }

    #[test]
    fn test_heart_rate_samples_expand() {
        let json = r#"[
            {
                "startTime": "2024-03-04T08:00:00Z",
                "endTime": "2024-03-04T08:05:00Z",
                "samples": [
                    { "time": "2024-03-04T08:00:00Z", "beatsPerMinute": 64 },
                    { "time": "2024-03-04T08:05:00Z", "beatsPerMinute": 70 }
                ],
                "metadata": { "id": "hr" }
            }
        ]"#;

        let outcome = HealthConnectAdapter.parse(json, MetricKind::HeartRate).unwrap();
        let ids: Vec<&str> = outcome.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["hr-0", "hr-1"]);
        assert_eq!(MetricKind::HeartRate.value_of(&outcome.records[1]), Some(70.0));
    }

    #[test]
    fn test_spo2_percentage_shapes() {
        let json = r#"[
            { "time": "2024-03-04T03:00:00Z", "percentage": 97.5 },
            { "time": "2024-03-04T04:00:00Z", "percentage": { "value": 95 } },
            { "time": "yesterday", "percentage": 96 }
        ]"#;

        let outcome = HealthConnectAdapter.parse(json, MetricKind::Spo2).unwrap();
        let values: Vec<f64> = outcome
            .records
            .iter()
            .filter_map(|r| MetricKind::Spo2.value_of(r))
            .collect();
        assert_eq!(values, vec![97.5, 95.0]);
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[test]
    fn test_active_calories() {
        let json = r#"[
            {
                "startTime": "2024-03-04T08:00:00Z",
                "endTime": "2024-03-04T09:00:00Z",
                "energy": { "inKilocalories": 210.5 }
            }
        ]"#;

        let outcome = HealthConnectAdapter
            .parse(json, MetricKind::ActiveCalories)
            .unwrap();
        assert_eq!(
            outcome.records[0].measurement,
            Measurement::Calories {
                kilocalories: 210.5,
                kind: CalorieKind::Active
            }
        );
    }

    #[test]
    fn test_sleep_stages() {
        let json = r#"[
            {
                "startTime": "2024-03-04T22:00:00Z",
                "endTime": "2024-03-05T06:00:00Z",
                "stages": [
                    { "startTime": "2024-03-04T22:00:00Z", "endTime": "2024-03-04T22:20:00Z", "stage": 1 },
                    { "startTime": "2024-03-04T22:20:00Z", "endTime": "2024-03-05T02:00:00Z", "stage": 4 },
                    { "startTime": "2024-03-05T02:00:00Z", "endTime": "2024-03-05T06:00:00Z", "stage": 6 }
                ]
            }
        ]"#;

        let outcome = HealthConnectAdapter.parse(json, MetricKind::Sleep).unwrap();
        let record = &outcome.records[0];
        match &record.measurement {
            Measurement::Sleep { stages } => {
                let kinds: Vec<SleepStage> = stages.iter().map(|s| s.stage).collect();
                assert_eq!(
                    kinds,
                    vec![SleepStage::Awake, SleepStage::Light, SleepStage::Rem]
                );
            }
            other => panic!("unexpected measurement {other:?}"),
        }
        assert_eq!(MetricKind::Sleep.value_of(record), Some(460.0));
    }

    #[test]
    fn test_non_json_payload() {
        assert!(HealthConnectAdapter
            .parse("not valid json", MetricKind::Steps)
            .is_err());
    }
}
