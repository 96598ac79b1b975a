// Chart rows: aligned multi-task rows and key/value grid rows

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::TaskId;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// Samples from several tasks grouped under one anchor timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub timestamp: TimestampMs,
    pub values: BTreeMap<TaskId, Option<f64>>,
}

impl AlignedRow {
    pub fn new(timestamp: TimestampMs) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Re-key by task id rendered as a string, the key used in chart rows.
    pub fn into_grid_row(self) -> GridRow {
        GridRow {
            timestamp: self.timestamp,
            values: self
                .values
                .into_iter()
                .map(|(id, v)| (id.to_string(), v))
                .collect(),
        }
    }
}

/// One chart row. Serializes flat: `{"timestamp": 1700000000000, "cpu": 12.5, "ram": null}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub timestamp: TimestampMs,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

/// A pushed live measurement: grid-row shaped, not aligned to any cadence.
pub type LiveSnapshot = GridRow;

impl GridRow {
    pub fn new(timestamp: TimestampMs) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Row with every key in `keys` marked missing.
    pub fn missing<'a>(timestamp: TimestampMs, keys: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            timestamp,
            values: keys.into_iter().map(|k| (k.clone(), None)).collect(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Option<f64>) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Known value for `key`; absent keys and missing values both read as `None`.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied().flatten()
    }

    /// Insert a missing marker for every key in `keys` not already present.
    pub fn ensure_keys<'a>(&mut self, keys: impl IntoIterator<Item = &'a String>) {
        for key in keys {
            self.values.entry(key.clone()).or_insert(None);
        }
    }
}
