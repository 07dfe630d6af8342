//! Core types for the Synheart Trends engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: health records, granularity and navigation selectors, chart buckets
//! and summary statistics.

use crate::error::ComputeError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Calendar bucket size for a trend view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

/// Direction of a date navigation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Prev,
    Next,
}

/// How several records on the same calendar day collapse into one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Cumulative metrics (steps, distance, calories)
    Sum,
    /// Rate metrics (heart rate, SPO2)
    Mean,
}

impl Reduction {
    /// Reduce a group of values. An empty group reduces to 0.
    pub fn reduce(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let sum: f64 = values.iter().sum();
        match self {
            Reduction::Sum => sum,
            Reduction::Mean => sum / values.len() as f64,
        }
    }
}

/// Sleep stage classification (provider-agnostic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepStage {
    Awake,
    Light,
    Deep,
    Rem,
    Unknown,
}

/// One contiguous stage span inside a sleep session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepStageSpan {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub stage: SleepStage,
}

impl SleepStageSpan {
    pub fn minutes(&self) -> f64 {
        let seconds = (self.end_time - self.start_time).num_seconds().max(0);
        seconds as f64 / 60.0
    }
}

/// Calorie sub-category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalorieKind {
    Active,
    Total,
}

/// Metric-specific payload of a health record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum Measurement {
    Steps {
        count: u64,
    },
    Distance {
        meters: f64,
    },
    HeartRate {
        beats_per_minute: f64,
    },
    Calories {
        kilocalories: f64,
        kind: CalorieKind,
    },
    Spo2 {
        percentage: f64,
    },
    Sleep {
        #[serde(default)]
        stages: Vec<SleepStageSpan>,
    },
}

/// A timestamped health record as delivered by the health-data provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Opaque identifier, unique within a fetch batch
    pub id: String,
    pub start_time: DateTime<Utc>,
    /// Equal to `start_time` for instantaneous metrics
    pub end_time: DateTime<Utc>,
    /// Data origin (source application)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(flatten)]
    pub measurement: Measurement,
}

impl HealthRecord {
    /// Create a validated record
    pub fn new(
        id: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        measurement: Measurement,
    ) -> Result<Self, ComputeError> {
        let record = Self {
            id: id.into(),
            start_time,
            end_time,
            origin: None,
            measurement,
        };
        record.validate()?;
        Ok(record)
    }

    /// Create an instantaneous record (`start_time == end_time`)
    pub fn instant(
        id: impl Into<String>,
        at: DateTime<Utc>,
        measurement: Measurement,
    ) -> Result<Self, ComputeError> {
        Self::new(id, at, at, measurement)
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn metric(&self) -> MetricKind {
        match &self.measurement {
            Measurement::Steps { .. } => MetricKind::Steps,
            Measurement::Distance { .. } => MetricKind::Distance,
            Measurement::HeartRate { .. } => MetricKind::HeartRate,
            Measurement::Calories {
                kind: CalorieKind::Active,
                ..
            } => MetricKind::ActiveCalories,
            Measurement::Calories { .. } => MetricKind::Calories,
            Measurement::Spo2 { .. } => MetricKind::Spo2,
            Measurement::Sleep { .. } => MetricKind::Sleep,
        }
    }

    /// Check the record invariants: ordered timestamps and finite values
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.start_time > self.end_time {
            return Err(self.invalid("start_time is after end_time"));
        }

        let value = match &self.measurement {
            Measurement::Steps { .. } | Measurement::Sleep { .. } => None,
            Measurement::Distance { meters } => Some(*meters),
            Measurement::HeartRate { beats_per_minute } => Some(*beats_per_minute),
            Measurement::Calories { kilocalories, .. } => Some(*kilocalories),
            Measurement::Spo2 { percentage } => Some(*percentage),
        };
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(self.invalid("value is not a finite number"));
            }
        }

        if let Measurement::Sleep { stages } = &self.measurement {
            if stages.iter().any(|s| s.start_time > s.end_time) {
                return Err(self.invalid("sleep stage ends before it starts"));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> ComputeError {
        ComputeError::InvalidRecord {
            id: self.id.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Health metric shown by a trend screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Steps,
    Distance,
    HeartRate,
    Calories,
    ActiveCalories,
    Spo2,
    Sleep,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Steps => "steps",
            MetricKind::Distance => "distance",
            MetricKind::HeartRate => "heart_rate",
            MetricKind::Calories => "calories",
            MetricKind::ActiveCalories => "active_calories",
            MetricKind::Spo2 => "spo2",
            MetricKind::Sleep => "sleep",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::Steps => "count",
            MetricKind::Distance => "meters",
            MetricKind::HeartRate => "bpm",
            MetricKind::Calories | MetricKind::ActiveCalories => "kcal",
            MetricKind::Spo2 => "percent",
            MetricKind::Sleep => "minutes",
        }
    }

    /// Reduction used when several records share a calendar day
    pub fn default_reduction(&self) -> Reduction {
        match self {
            MetricKind::HeartRate | MetricKind::Spo2 => Reduction::Mean,
            _ => Reduction::Sum,
        }
    }

    /// Value extractor: the numeric field this metric reads from a record.
    ///
    /// Returns `None` for records of another metric and for non-finite values.
    pub fn value_of(&self, record: &HealthRecord) -> Option<f64> {
        let value = match (self, &record.measurement) {
            (MetricKind::Steps, Measurement::Steps { count }) => *count as f64,
            (MetricKind::Distance, Measurement::Distance { meters }) => *meters,
            (MetricKind::HeartRate, Measurement::HeartRate { beats_per_minute }) => {
                *beats_per_minute
            }
            (
                MetricKind::Calories,
                Measurement::Calories {
                    kilocalories,
                    kind: CalorieKind::Total,
                },
            ) => *kilocalories,
            (
                MetricKind::ActiveCalories,
                Measurement::Calories {
                    kilocalories,
                    kind: CalorieKind::Active,
                },
            ) => *kilocalories,
            (MetricKind::Spo2, Measurement::Spo2 { percentage }) => *percentage,
            (MetricKind::Sleep, Measurement::Sleep { .. }) => {
                crate::sleep::SleepBreakdown::from_record(record)?.total_sleep_minutes
            }
            _ => return None,
        };
        value.is_finite().then_some(value)
    }
}

/// One aggregated point in a chart series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub value: f64,
    /// Representative local time of the bucket
    pub sort_key: NaiveDateTime,
    /// Number of records that contributed to the bucket
    pub count: usize,
}

/// Summary statistics over a record set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: f64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub count: usize,
}
