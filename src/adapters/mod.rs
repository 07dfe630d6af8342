//! Provider payload adapters
//!
//! This module provides adapters that parse raw provider JSON payloads and map
//! them to typed `HealthRecord`s. Malformed records are skipped and reported
//! instead of aborting the whole batch.

mod canonical;
mod health_connect;

pub use canonical::CanonicalAdapter;
pub use health_connect::HealthConnectAdapter;

use crate::error::ComputeError;
use crate::types::{HealthRecord, MetricKind};
use serde::{Deserialize, Serialize};

/// Trait for provider payload adapters
pub trait RecordPayloadAdapter {
    /// Parse raw JSON into records of `metric`
    fn parse(&self, raw_json: &str, metric: MetricKind) -> Result<ParseOutcome, ComputeError>;
}

/// A record the adapter had to drop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// Position in the input (array index or zero-based line)
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

/// Records recovered from a payload plus the ones that were skipped
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub records: Vec<HealthRecord>,
    pub skipped: Vec<SkippedRecord>,
}

impl ParseOutcome {
    pub fn skip(&mut self, index: usize, id: Option<String>, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(
            index,
            id = id.as_deref().unwrap_or("unknown"),
            %reason,
            "skipping malformed record"
        );
        self.skipped.push(SkippedRecord { index, id, reason });
    }

    /// Keep a record only if it passes validation
    pub fn accept(&mut self, index: usize, record: HealthRecord) {
        match record.validate() {
            Ok(()) => self.records.push(record),
            Err(e) => self.skip(index, Some(record.id.clone()), e.to_string()),
        }
    }
}

/// Payload formats understood by `adapter_for`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
    /// Canonical records as a JSON array or NDJSON
    Canonical,
    /// Health Connect `readRecords` results
    HealthConnect,
}

pub fn adapter_for(format: PayloadFormat) -> Box<dyn RecordPayloadAdapter> {
    match format {
        PayloadFormat::Canonical => Box::new(CanonicalAdapter),
        PayloadFormat::HealthConnect => Box::new(HealthConnectAdapter),
    }
}
