//! Synheart Trends - On-device period aggregation engine for health metrics
//!
//! Trends turns raw health records (steps, heart rate, calories, distance,
//! sleep, SpO2) into chart-ready series and summary statistics for a selected
//! period: payload adaptation → period resolution → filtering → bucketing
//! → summary → report encoding.
//!
//! ## Modules
//!
//! - **Core engine**: `period`, `filter`, `aggregate`, `summary`, `navigation`
//! - **Screen state**: `view` (selection state, fetch tickets) driven by a `provider`
//! - **Host surfaces**: `pipeline`, `encoder`, `ffi`

pub mod adapters;
pub mod aggregate;
pub mod config;
pub mod encoder;
pub mod error;
pub mod filter;
pub mod navigation;
pub mod period;
pub mod pipeline;
pub mod provider;
pub mod sleep;
pub mod summary;
pub mod types;
pub mod view;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::ViewConfig;
pub use encoder::{TrendEncoder, TrendReport};
pub use error::{ComputeError, ProviderError};
pub use pipeline::{records_to_report, records_to_report_json, TrendProcessor};
pub use provider::{HealthDataProvider, StaticProvider};
pub use view::{FetchOutcome, FetchTicket, MetricView};

// Engine exports
pub use aggregate::to_series;
pub use filter::filter_by_period;
pub use navigation::step;
pub use period::{resolve_period, Calendar, Interval, WeekStart};
pub use summary::summarize;
pub use types::{
    Bucket, Direction, Granularity, HealthRecord, Measurement, MetricKind, Reduction, Summary,
};

/// Trends version embedded in all reports
pub const TRENDS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "synheart-trends";
