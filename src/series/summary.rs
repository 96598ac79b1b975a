// Summary projections: latest reading per task, per-task aggregates, and
// zero-guarded usage ratios.

use serde::Serialize;

use crate::models::{
    GridRow, MeasurementTask, NodeInfo, RawSample, TaskAggregates, TaskId, TimestampMs,
    TrafficLimitType,
};

/// Most recent non-missing reading of one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestValue {
    pub task_id: TaskId,
    pub value: Option<f64>,
    pub timestamp: Option<TimestampMs>,
}

/// One entry per task, in task order. `samples` must be ascending.
pub fn latest_values(samples: &[RawSample], tasks: &[MeasurementTask]) -> Vec<LatestValue> {
    tasks
        .iter()
        .map(|task| {
            let hit = samples
                .iter()
                .rev()
                .find(|s| s.task_id == task.id && s.value.is_some());
            LatestValue {
                task_id: task.id,
                value: hit.and_then(|s| s.value),
                timestamp: hit.map(|s| s.timestamp),
            }
        })
        .collect()
}

/// Nearest-rank percentile of an ascending slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.clamp(1, sorted.len()) - 1;
    Some(sorted[idx])
}

/// Aggregates over every sample of `task_id`. Loss counts missing readings.
pub fn task_aggregates(samples: &[RawSample], task_id: TaskId) -> TaskAggregates {
    let readings: Vec<Option<f64>> = samples
        .iter()
        .filter(|s| s.task_id == task_id)
        .map(|s| s.value)
        .collect();
    if readings.is_empty() {
        return TaskAggregates::default();
    }

    let total = readings.len();
    let mut known: Vec<f64> = readings.iter().flatten().copied().collect();
    let latest = known.last().copied();
    let lost = total - known.len();
    known.sort_by(|a, b| a.total_cmp(b));

    let avg = (!known.is_empty()).then(|| known.iter().sum::<f64>() / known.len() as f64);
    let p50 = percentile(&known, 50.0);
    let p99 = percentile(&known, 99.0);
    let p99_p50_ratio = match (p99, p50) {
        (Some(hi), Some(mid)) if mid > 0.0 => Some(hi / mid),
        _ => None,
    };

    TaskAggregates {
        min: known.first().copied(),
        max: known.last().copied(),
        avg,
        p50,
        p99,
        loss: Some(lost as f64 * 100.0 / total as f64),
        latest,
        total: Some(total as u64),
        p99_p50_ratio,
    }
}

/// Tasks with their aggregates computed from `samples`.
pub fn with_aggregates(tasks: &[MeasurementTask], samples: &[RawSample]) -> Vec<MeasurementTask> {
    tasks
        .iter()
        .map(|t| MeasurementTask {
            aggregates: task_aggregates(samples, t.id),
            ..t.clone()
        })
        .collect()
}

/// `used / total * 100`, or 0 when there is no capacity to divide by.
pub fn ratio_percent(used: f64, total: f64) -> f64 {
    if total == 0.0 || !total.is_finite() || !used.is_finite() {
        return 0.0;
    }
    used / total * 100.0
}

/// Share of the traffic limit consumed, counted the way `kind` says.
pub fn traffic_percent(total_up: f64, total_down: f64, limit: f64, kind: TrafficLimitType) -> f64 {
    let counted = match kind {
        TrafficLimitType::Max => total_up.max(total_down),
        TrafficLimitType::Min => total_up.min(total_down),
        TrafficLimitType::Sum => total_up + total_down,
        TrafficLimitType::Up => total_up,
        TrafficLimitType::Down => total_down,
    };
    ratio_percent(counted, limit)
}

/// Add `ram_percent`, `swap_percent` and `disk_percent` columns derived from the
/// node's capacities. Missing byte counts stay missing.
pub fn project_usage(rows: &[GridRow], info: &NodeInfo) -> Vec<GridRow> {
    let columns = [
        ("ram", "ram_percent", info.mem_total),
        ("swap", "swap_percent", info.swap_total),
        ("disk", "disk_percent", info.disk_total),
    ];
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            for (src, dst, total) in columns {
                let pct = row.get(src).map(|used| ratio_percent(used, total as f64));
                row.values.insert(dst.to_string(), pct);
            }
            row
        })
        .collect()
}
