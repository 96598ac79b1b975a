// Time-grid resampling: project rows onto a fixed cadence ending at the slot
// nearest the last data point. Slots with no row within half the gap cap stay missing.

use std::collections::BTreeSet;

use crate::models::GridRow;

use super::view::ViewWindow;

/// Resample `rows` onto the grid described by `window`.
///
/// The grid ends on the interval boundary nearest the newest row (ties go to the
/// earlier boundary) and spans
/// `window.duration_ms()` back from there. Slots before the oldest row's own slot
/// are cut. Every output row carries the union of input keys. No input, no output.
pub fn resample(rows: &[GridRow], window: &ViewWindow) -> Vec<GridRow> {
    let interval = window.interval_ms;
    if rows.is_empty() || interval <= 0 {
        return Vec::new();
    }

    let mut sorted: Vec<&GridRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);

    let keys: BTreeSet<String> = sorted
        .iter()
        .flat_map(|r| r.values.keys().cloned())
        .collect();

    let half_gap = window.max_gap_ms.max(0) / 2;
    let first_ts = sorted[0].timestamp;
    let last_ts = sorted[sorted.len() - 1].timestamp;

    let floor_end = last_ts.div_euclid(interval) * interval;
    let window_end = if floor_end + interval - last_ts < last_ts - floor_end {
        floor_end + interval
    } else {
        floor_end
    };
    let window_start = window_end - window.duration_ms().max(0);
    let lower = window_start.max(first_ts.div_euclid(interval) * interval);
    let slots = (window_end - lower).div_euclid(interval).max(0);

    let mut out = Vec::with_capacity(slots as usize + 1);
    for k in (0..=slots).rev() {
        let ts = window_end - k * interval;
        let row = match nearest(&sorted, ts, half_gap) {
            Some(src) => {
                let mut row = GridRow {
                    timestamp: ts,
                    values: src.values.clone(),
                };
                row.ensure_keys(&keys);
                row
            }
            None => GridRow::missing(ts, &keys),
        };
        out.push(row);
    }
    out
}

/// Row closest to `ts` within `reach` (inclusive); ties go to the earlier row.
fn nearest<'a>(sorted: &[&'a GridRow], ts: i64, reach: i64) -> Option<&'a GridRow> {
    let idx = sorted.partition_point(|r| r.timestamp < ts);
    let before = idx.checked_sub(1).map(|i| sorted[i]);
    let after = sorted.get(idx).copied();
    let best = match (before, after) {
        (Some(b), Some(a)) => {
            if ts - b.timestamp <= a.timestamp - ts {
                b
            } else {
                a
            }
        }
        (Some(b), None) => b,
        (None, Some(a)) => a,
        (None, None) => return None,
    };
    ((best.timestamp - ts).abs() <= reach).then_some(best)
}
