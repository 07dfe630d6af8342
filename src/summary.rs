//! Summary statistics
//!
//! Total, average, maximum and minimum over a filtered record set. An empty set
//! yields zeros across the board; callers never see NaN.

use crate::types::{HealthRecord, Summary};

/// Summarize the values selected by `value_of`.
///
/// Records for which the extractor returns `None` or a non-finite value are
/// skipped and do not count towards the average.
pub fn summarize<F>(records: &[HealthRecord], value_of: F) -> Summary
where
    F: Fn(&HealthRecord) -> Option<f64>,
{
    let values: Vec<f64> = records
        .iter()
        .filter_map(|r| value_of(r))
        .filter(|v| v.is_finite())
        .collect();

    summarize_values(&values)
}

/// Summarize plain values (e.g. bucket values)
pub fn summarize_values(values: &[f64]) -> Summary {
    if values.is_empty() {
        return Summary::default();
    }

    let total: f64 = values.iter().sum();
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);

    Summary {
        total,
        average: total / values.len() as f64,
        max,
        min,
        count: values.len(),
    }
}

impl Summary {
    /// Copy with every statistic rounded to `places` decimal places
    pub fn rounded(&self, places: u32) -> Summary {
        let factor = 10f64.powi(places as i32);
        let round = |v: f64| (v * factor).round() / factor;
        Summary {
            total: round(self.total),
            average: round(self.average),
            max: round(self.max),
            min: round(self.min),
            count: self.count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Fraction of `goal` reached by `total`, clamped to 0-1.
/// `None` when no positive goal is configured.
pub fn goal_progress(total: f64, goal: Option<f64>) -> Option<f64> {
    match goal {
        Some(goal) if goal > 0.0 && goal.is_finite() => Some((total / goal).clamp(0.0, 1.0)),
        _ => None,
    }
}
