// Sentinel normalization: negative probe values mean "no reading".
// Runs before anything does arithmetic on a value.

use chrono::DateTime;

use crate::models::{ProbeRecord, RawSample, TimestampMs};

/// `None` for negative or non-finite readings; everything else passes through.
pub fn normalize_value(value: f64) -> Option<f64> {
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

pub fn normalize(sample: RawSample) -> RawSample {
    RawSample {
        value: sample.value.and_then(normalize_value),
        ..sample
    }
}

/// RFC 3339 → epoch milliseconds. Unparseable input yields `None`.
pub fn parse_timestamp(s: &str) -> Option<TimestampMs> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Parse and normalize a batch of wire records, ascending by time.
/// Records with unusable timestamps are dropped.
pub fn normalize_records(records: &[ProbeRecord]) -> Vec<RawSample> {
    let mut out: Vec<RawSample> = records
        .iter()
        .filter_map(|r| {
            let timestamp = parse_timestamp(&r.time)?;
            Some(RawSample {
                task_id: r.task_id,
                timestamp,
                value: normalize_value(r.value),
            })
        })
        .collect();

    let dropped = records.len() - out.len();
    if dropped > 0 {
        tracing::debug!(
            operation = "normalize_records",
            dropped,
            "dropped records with malformed timestamps"
        );
    }

    out.sort_by_key(|s| s.timestamp);
    out
}
