// Gap-bounded linear interpolation.
//
// A missing run is filled only when it has known values on both sides and the
// time between them is within the cap; longer runs are outages and stay missing.

use crate::models::GridRow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapParams {
    pub max_gap_multiplier: f64,
    pub min_cap_ms: i64,
    pub max_cap_ms: i64,
}

impl Default for GapParams {
    fn default() -> Self {
        Self {
            max_gap_multiplier: 6.0,
            min_cap_ms: 2 * 60_000,
            max_cap_ms: 30 * 60_000,
        }
    }
}

impl GapParams {
    /// `clamp(interval * multiplier, min_cap, max_cap)`.
    pub fn cap_ms(&self, interval_ms: i64) -> i64 {
        let raw = (interval_ms as f64 * self.max_gap_multiplier).round() as i64;
        raw.clamp(self.min_cap_ms, self.max_cap_ms.max(self.min_cap_ms))
    }
}

/// Median of the positive deltas between consecutive rows.
pub fn infer_interval_ms(rows: &[GridRow]) -> Option<i64> {
    let mut deltas: Vec<i64> = rows
        .windows(2)
        .map(|w| w[1].timestamp - w[0].timestamp)
        .filter(|d| *d > 0)
        .collect();
    if deltas.is_empty() {
        return None;
    }
    deltas.sort_unstable();
    Some(deltas[deltas.len() / 2])
}

/// Fill interior missing runs of each key in `keys`. Rows must be ascending.
/// `interval_ms` is the grid cadence; inferred from the rows when `None`.
pub fn interpolate_gaps(
    rows: &[GridRow],
    keys: &[String],
    interval_ms: Option<i64>,
    params: &GapParams,
) -> Vec<GridRow> {
    let mut out = rows.to_vec();
    let Some(interval) = interval_ms.or_else(|| infer_interval_ms(rows)) else {
        return out;
    };
    let cap = params.cap_ms(interval);

    for key in keys {
        let mut left: Option<usize> = None;
        for (j, row) in rows.iter().enumerate() {
            if row.get(key).is_none() {
                continue;
            }
            if let Some(i) = left
                && j > i + 1
            {
                fill_run(&mut out, key, i, j, cap);
            }
            left = Some(j);
        }
    }
    out
}

/// Linear fill of rows strictly between `i` and `j` if `ts[j] - ts[i] <= cap`.
fn fill_run(out: &mut [GridRow], key: &str, i: usize, j: usize, cap: i64) {
    let (t0, t1) = (out[i].timestamp, out[j].timestamp);
    let span = t1 - t0;
    if span <= 0 || span > cap {
        return;
    }
    let (Some(a), Some(b)) = (out[i].get(key), out[j].get(key)) else {
        return;
    };
    for row in &mut out[i + 1..j] {
        let fraction = (row.timestamp - t0) as f64 / span as f64;
        row.values.insert(key.to_string(), Some(a + (b - a) * fraction));
    }
}
