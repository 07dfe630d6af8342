//! Canonical record adapter
//!
//! Parses records already in the crate's own JSON shape, either as a JSON
//! array or as NDJSON (one record per line).

use crate::error::ComputeError;
use crate::types::{HealthRecord, MetricKind};
use serde_json::Value;

use super::{ParseOutcome, RecordPayloadAdapter};

/// Adapter for canonical `HealthRecord` JSON
pub struct CanonicalAdapter;

impl RecordPayloadAdapter for CanonicalAdapter {
    fn parse(&self, raw_json: &str, metric: MetricKind) -> Result<ParseOutcome, ComputeError> {
        let mut outcome = if raw_json.trim_start().starts_with('[') {
            Self::parse_array(raw_json)?
        } else {
            Self::parse_ndjson(raw_json)
        };

        // Drop records of other metrics without flagging them as malformed
        outcome.records.retain(|r| metric.value_of(r).is_some());
        Ok(outcome)
    }
}

impl CanonicalAdapter {
    /// Parse a JSON array of records. Fails only if the document itself is
    /// not a JSON array.
    pub fn parse_array(json: &str) -> Result<ParseOutcome, ComputeError> {
        let values: Vec<Value> = serde_json::from_str(json)?;
        let mut outcome = ParseOutcome::default();
        for (index, value) in values.into_iter().enumerate() {
            Self::accept_value(&mut outcome, index, value);
        }
        Ok(outcome)
    }

    /// Parse NDJSON, skipping blank lines and lines that fail to parse
    pub fn parse_ndjson(ndjson: &str) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        for (index, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => Self::accept_value(&mut outcome, index, value),
                Err(e) => outcome.skip(index, None, format!("line {}: {}", index + 1, e)),
            }
        }
        outcome
    }

    fn accept_value(outcome: &mut ParseOutcome, index: usize, value: Value) {
        let id = value.get("id").and_then(Value::as_str).map(str::to_string);
        match serde_json::from_value::<HealthRecord>(value) {
            Ok(record) => outcome.accept(index, record),
            Err(e) => outcome.skip(index, id, e.to_string()),
        }
    }
}
