// Ping probe records and the measurement tasks that produce them

use serde::{Deserialize, Serialize};

use super::TimestampMs;

pub type TaskId = u32;

/// One probe reading as delivered by the historical query (wire shape).
/// `time` is RFC 3339; a negative `value` means the probe failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRecord {
    #[serde(alias = "task_id")]
    pub task_id: TaskId,
    pub time: String,
    pub value: f64,
}

/// Probe reading after sentinel normalization. `value == None` is an explicit miss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub task_id: TaskId,
    pub timestamp: TimestampMs,
    pub value: Option<f64>,
}

/// Summary figures for one task over the queried range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAggregates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p50: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p99: Option<f64>,
    /// Loss rate in percent (missing readings / all readings).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// p99 / p50, shown as "volatility".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p99_p50_ratio: Option<f64>,
}

/// One independently sampled metric stream (e.g. one ping target).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementTask {
    pub id: TaskId,
    pub name: String,
    /// Sampling interval in seconds.
    pub interval: f64,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub aggregates: TaskAggregates,
}

impl MeasurementTask {
    pub fn new(id: TaskId, name: impl Into<String>, interval: f64) -> Self {
        Self {
            id,
            name: name.into(),
            interval,
            kind: None,
            aggregates: TaskAggregates::default(),
        }
    }

    /// Series key used in chart rows for this task.
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}
