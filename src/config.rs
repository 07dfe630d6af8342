//! Per-view configuration
//!
//! Each trend screen gets its own `ViewConfig` instead of reading
//! process-wide constants. Configs deserialize from JSON with every field
//! optional.

use crate::error::ComputeError;
use crate::period::{parse_utc_offset, Calendar, WeekStart};
use crate::types::{Granularity, MetricKind, Reduction};
use serde::{Deserialize, Serialize};

/// Configuration injected into a `MetricView`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Metric shown by the view
    pub metric: MetricKind,
    /// Reduction override; the metric's default applies when unset
    pub reduction: Option<Reduction>,
    /// Jump back to today whenever the granularity changes
    pub reset_on_granularity_change: bool,
    pub week_start: WeekStart,
    /// `"UTC"` or `"+HH:MM"`
    pub utc_offset: String,
    pub default_granularity: Granularity,
    /// Chart colour (`#RRGGBB`)
    pub accent_color: String,
    /// Daily goal in the metric's unit
    pub daily_goal: Option<f64>,
    /// Emit zero buckets for days without data
    pub fill_empty_days: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self::for_metric(MetricKind::Steps)
    }
}

impl ViewConfig {
    /// Default configuration for `metric`
    pub fn for_metric(metric: MetricKind) -> Self {
        Self {
            metric,
            reduction: None,
            reset_on_granularity_change: false,
            week_start: WeekStart::Sunday,
            utc_offset: "UTC".to_string(),
            default_granularity: Granularity::Day,
            accent_color: default_accent(metric).to_string(),
            daily_goal: None,
            fill_empty_days: false,
        }
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = Some(reduction);
        self
    }

    pub fn with_reset_on_granularity_change(mut self, reset: bool) -> Self {
        self.reset_on_granularity_change = reset;
        self
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn with_utc_offset(mut self, offset: impl Into<String>) -> Self {
        self.utc_offset = offset.into();
        self
    }

    pub fn with_daily_goal(mut self, goal: f64) -> Self {
        self.daily_goal = Some(goal);
        self
    }

    pub fn with_fill_empty_days(mut self, fill: bool) -> Self {
        self.fill_empty_days = fill;
        self
    }

    /// Effective reduction policy
    pub fn reduction(&self) -> Reduction {
        self.reduction.unwrap_or_else(|| self.metric.default_reduction())
    }

    /// Calendar built from the offset and week start
    pub fn calendar(&self) -> Result<Calendar, ComputeError> {
        let offset = parse_utc_offset(&self.utc_offset)?;
        Ok(Calendar::new(offset, self.week_start))
    }

    /// Check every field that can be invalid
    pub fn validate(&self) -> Result<(), ComputeError> {
        self.calendar()?;

        if let Some(goal) = self.daily_goal {
            if !goal.is_finite() || goal < 0.0 {
                return Err(ComputeError::ConfigError(format!(
                    "daily_goal must be a non-negative number, got {goal}"
                )));
            }
        }

        if !is_hex_color(&self.accent_color) {
            return Err(ComputeError::ConfigError(format!(
                "accent_color must look like #RRGGBB, got {}",
                self.accent_color
            )));
        }

        Ok(())
    }

    /// Load and validate a config from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: ViewConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(ComputeError::JsonError)
    }
}

/// Default chart colour for each metric
pub fn default_accent(metric: MetricKind) -> &'static str {
    match metric {
        MetricKind::Steps => "#4CAF50",
        MetricKind::Distance => "#2196F3",
        MetricKind::HeartRate => "#F44336",
        MetricKind::Calories => "#FF9800",
        MetricKind::ActiveCalories => "#FF5722",
        MetricKind::Spo2 => "#00BCD4",
        MetricKind::Sleep => "#673AB7",
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
