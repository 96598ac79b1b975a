// Peak suppression: damp single-sample spikes that tower over both neighbors.
//
// ceiling   = max(prev, next)
// threshold = ceiling + |ceiling| * (ratio - 1)
// v'        = threshold + (v - threshold) * damping   when v > threshold
//
// Continuous and monotonic in v. A level shift keeps one neighbor at the new level,
// so its ceiling rises with it and nothing is damped.

use crate::models::GridRow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakParams {
    /// How far above the higher neighbor a value may sit before it is damped.
    pub ratio: f64,
    /// Fraction of the excess over the threshold that survives.
    pub damping: f64,
}

impl Default for PeakParams {
    fn default() -> Self {
        Self {
            ratio: 1.5,
            damping: 0.2,
        }
    }
}

impl PeakParams {
    pub fn damp(&self, value: f64, prev: f64, next: f64) -> f64 {
        let ceiling = prev.max(next);
        let threshold = ceiling + ceiling.abs() * (self.ratio - 1.0).max(0.0);
        if value > threshold {
            threshold + (value - threshold) * self.damping.clamp(0.0, 1.0)
        } else {
            value
        }
    }
}

/// Suppress spikes in each of `keys` independently. Only interior points with both
/// neighbors known are considered; every other value is copied as is.
pub fn suppress_peaks(rows: &[GridRow], keys: &[String], params: &PeakParams) -> Vec<GridRow> {
    let mut out = rows.to_vec();
    if rows.len() < 3 {
        return out;
    }
    for key in keys {
        let original: Vec<Option<f64>> = rows.iter().map(|r| r.get(key)).collect();
        for i in 1..original.len() - 1 {
            let (Some(prev), Some(value), Some(next)) =
                (original[i - 1], original[i], original[i + 1])
            else {
                continue;
            };
            let damped = params.damp(value, prev, next);
            if damped != value {
                out[i].values.insert(key.clone(), Some(damped));
            }
        }
    }
    out
}
