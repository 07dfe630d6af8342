//! Sleep stage classification
//!
//! Splits sleep sessions into per-stage minutes and derives efficiency and
//! stage ratios. Ratios are `None` when their denominator is zero.

use crate::types::{HealthRecord, Measurement, SleepStage};
use serde::{Deserialize, Serialize};

/// Map a Health Connect sleep stage code onto a `SleepStage`.
///
/// Codes: 1 awake, 2 sleeping, 3 out of bed, 4 light, 5 deep, 6 REM,
/// 7 awake in bed. Generic "sleeping" counts as light sleep and "out of bed"
/// counts as awake.
pub fn stage_from_code(code: i64) -> SleepStage {
    match code {
        1 | 3 | 7 => SleepStage::Awake,
        2 | 4 => SleepStage::Light,
        5 => SleepStage::Deep,
        6 => SleepStage::Rem,
        _ => SleepStage::Unknown,
    }
}

/// Per-stage minutes for one or more sleep sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepBreakdown {
    pub time_in_bed_minutes: f64,
    pub total_sleep_minutes: f64,
    pub awake_minutes: f64,
    pub light_minutes: f64,
    pub deep_minutes: f64,
    pub rem_minutes: f64,
    pub unknown_minutes: f64,
    /// Number of sessions folded into this breakdown
    pub sessions: usize,
}

impl SleepBreakdown {
    /// Classify a sleep record. Returns `None` for non-sleep records.
    ///
    /// A session without stage data counts its whole span as sleep.
    pub fn from_record(record: &HealthRecord) -> Option<Self> {
        let stages = match &record.measurement {
            Measurement::Sleep { stages } => stages,
            _ => return None,
        };

        let span_seconds = (record.end_time - record.start_time).num_seconds().max(0);
        let mut breakdown = SleepBreakdown {
            time_in_bed_minutes: span_seconds as f64 / 60.0,
            sessions: 1,
            ..Default::default()
        };

        if stages.is_empty() {
            breakdown.total_sleep_minutes = breakdown.time_in_bed_minutes;
            return Some(breakdown);
        }

        for span in stages {
            let minutes = span.minutes();
            match span.stage {
                SleepStage::Awake => breakdown.awake_minutes += minutes,
                SleepStage::Light => breakdown.light_minutes += minutes,
                SleepStage::Deep => breakdown.deep_minutes += minutes,
                SleepStage::Rem => breakdown.rem_minutes += minutes,
                SleepStage::Unknown => breakdown.unknown_minutes += minutes,
            }
        }
        breakdown.total_sleep_minutes =
            breakdown.light_minutes + breakdown.deep_minutes + breakdown.rem_minutes;

        Some(breakdown)
    }

    /// Fold every sleep record in `records` into one breakdown
    pub fn from_records(records: &[HealthRecord]) -> Self {
        records
            .iter()
            .filter_map(Self::from_record)
            .fold(Self::default(), |acc, b| acc.combine(&b))
    }

    pub fn combine(&self, other: &Self) -> Self {
        Self {
            time_in_bed_minutes: self.time_in_bed_minutes + other.time_in_bed_minutes,
            total_sleep_minutes: self.total_sleep_minutes + other.total_sleep_minutes,
            awake_minutes: self.awake_minutes + other.awake_minutes,
            light_minutes: self.light_minutes + other.light_minutes,
            deep_minutes: self.deep_minutes + other.deep_minutes,
            rem_minutes: self.rem_minutes + other.rem_minutes,
            unknown_minutes: self.unknown_minutes + other.unknown_minutes,
            sessions: self.sessions + other.sessions,
        }
    }

    /// Sleep efficiency: time asleep / time in bed (0-1)
    pub fn efficiency(&self) -> Option<f64> {
        ratio(self.total_sleep_minutes, self.time_in_bed_minutes)
    }

    /// Deep sleep / total sleep (0-1)
    pub fn deep_ratio(&self) -> Option<f64> {
        ratio(self.deep_minutes, self.total_sleep_minutes)
    }

    /// REM sleep / total sleep (0-1)
    pub fn rem_ratio(&self) -> Option<f64> {
        ratio(self.rem_minutes, self.total_sleep_minutes)
    }

    /// Light sleep / total sleep (0-1)
    pub fn light_ratio(&self) -> Option<f64> {
        ratio(self.light_minutes, self.total_sleep_minutes)
    }

    /// Average sleep per session in minutes, 0 without sessions
    pub fn average_sleep_minutes(&self) -> f64 {
        if self.sessions == 0 {
            0.0
        } else {
            self.total_sleep_minutes / self.sessions as f64
        }
    }
}

fn ratio(part: f64, whole: f64) -> Option<f64> {
    (whole > 0.0).then(|| (part / whole).clamp(0.0, 1.0))
}
