// Temporal anchor grouping: samples from independent tasks that land within a
// tolerance of each other share one row.
//
// Anchors are indexed by timestamp so each lookup is a bounded range scan; the
// chosen anchor is still the earliest-discovered one in range.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::models::{AlignedRow, MeasurementTask, RawSample, TimestampMs};

pub const DEFAULT_FALLBACK_INTERVAL_SECS: f64 = 60.0;
pub const MIN_TOLERANCE_MS: i64 = 800;
pub const MAX_TOLERANCE_MS: i64 = 6_000;
const TOLERANCE_FRACTION: f64 = 0.25;

/// Smallest positive task interval (seconds), or 60s when no task has one.
pub fn fallback_interval_secs(tasks: &[MeasurementTask]) -> f64 {
    tasks
        .iter()
        .map(|t| t.interval)
        .filter(|v| v.is_finite() && *v > 0.0)
        .reduce(f64::min)
        .unwrap_or(DEFAULT_FALLBACK_INTERVAL_SECS)
}

/// A quarter of the fastest sampling interval, clamped to [800ms, 6000ms].
pub fn tolerance_ms(tasks: &[MeasurementTask]) -> i64 {
    let raw = (fallback_interval_secs(tasks) * 1000.0 * TOLERANCE_FRACTION).floor() as i64;
    raw.clamp(MIN_TOLERANCE_MS, MAX_TOLERANCE_MS)
}

/// Group samples into rows by anchor. A task writes at most once per anchor (first wins).
/// Output is ascending by anchor timestamp.
pub fn group_by_anchor(samples: &[RawSample], tolerance_ms: i64) -> Vec<AlignedRow> {
    let tolerance = tolerance_ms.max(0);
    // anchor timestamp -> index into `rows` (discovery order)
    let mut anchors: BTreeMap<TimestampMs, usize> = BTreeMap::new();
    let mut rows: Vec<AlignedRow> = Vec::new();
    let mut duplicates = 0usize;

    for sample in samples {
        let ts = sample.timestamp;
        let found = anchors
            .range(ts.saturating_sub(tolerance)..=ts.saturating_add(tolerance))
            .map(|(_, &idx)| idx)
            .min();
        let idx = match found {
            Some(idx) => idx,
            None => {
                anchors.insert(ts, rows.len());
                rows.push(AlignedRow::new(ts));
                rows.len() - 1
            }
        };
        match rows[idx].values.entry(sample.task_id) {
            Entry::Vacant(slot) => {
                slot.insert(sample.value);
            }
            Entry::Occupied(_) => duplicates += 1,
        }
    }

    if duplicates > 0 {
        tracing::debug!(
            operation = "group_by_anchor",
            duplicates,
            "dropped repeat samples for an already populated anchor"
        );
    }

    rows.sort_by_key(|r| r.timestamp);
    rows
}

/// Group with the tolerance derived from `tasks`.
pub fn align_samples(samples: &[RawSample], tasks: &[MeasurementTask]) -> Vec<AlignedRow> {
    group_by_anchor(samples, tolerance_ms(tasks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(task_id: u32, timestamp: i64, value: f64) -> RawSample {
        RawSample {
            task_id,
            timestamp,
            value: Some(value),
        }
    }

    #[test]
    fn tolerance_follows_fastest_task() {
        assert_eq!(tolerance_ms(&[]), MAX_TOLERANCE_MS);
        let tasks = vec![
            MeasurementTask::new(1, "a", 60.0),
            MeasurementTask::new(2, "b", 4.0),
        ];
        assert_eq!(tolerance_ms(&tasks), 1_000);
        assert_eq!(tolerance_ms(&[MeasurementTask::new(1, "a", 1.0)]), MIN_TOLERANCE_MS);
        assert_eq!(tolerance_ms(&[MeasurementTask::new(1, "a", 0.0)]), MAX_TOLERANCE_MS);
    }

    #[test]
    fn samples_within_tolerance_share_a_row() {
        let rows = group_by_anchor(&[sample(1, 0, 10.0), sample(2, 900, 20.0)], 1_000);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, 0);
        assert_eq!(rows[0].values.get(&1), Some(&Some(10.0)));
        assert_eq!(rows[0].values.get(&2), Some(&Some(20.0)));
    }

    #[test]
    fn samples_beyond_tolerance_split() {
        let rows = group_by_anchor(&[sample(1, 0, 10.0), sample(2, 1_100, 20.0)], 1_000);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].timestamp, 1_100);
    }

    #[test]
    fn first_sample_wins_per_task_and_anchor() {
        let rows = group_by_anchor(&[sample(1, 0, 10.0), sample(1, 500, 99.0)], 1_000);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values.get(&1), Some(&Some(10.0)));
    }

    #[test]
    fn earliest_discovered_anchor_is_chosen() {
        // Anchors at 0 and 1500; a sample at 800 is within 1000 of both.
        let rows = group_by_anchor(
            &[sample(1, 0, 1.0), sample(1, 1_500, 2.0), sample(2, 800, 3.0)],
            1_000,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values.get(&2), Some(&Some(3.0)));
        assert!(rows[1].values.get(&2).is_none());
    }

    #[test]
    fn missing_values_still_occupy_the_slot() {
        let rows = group_by_anchor(
            &[
                RawSample {
                    task_id: 1,
                    timestamp: 0,
                    value: None,
                },
                sample(1, 100, 5.0),
            ],
            1_000,
        );
        assert_eq!(rows[0].values.get(&1), Some(&None));
    }

    #[test]
    fn empty_input_gives_no_rows() {
        assert!(group_by_anchor(&[], 1_000).is_empty());
    }
}
