// View windows: requested range -> grid cadence and gap cap, and which ranges a
// node's record retention allows.

use serde::Serialize;

pub const MS_PER_MINUTE: i64 = 60_000;
pub const MS_PER_HOUR: i64 = 3_600_000;

/// Load chart ranges, in hours. A real-time view always comes first.
pub const LOAD_PRESET_HOURS: [u32; 4] = [4, 24, 168, 720];
/// Ping chart ranges, in hours.
pub const PING_PRESET_HOURS: [u32; 4] = [1, 6, 12, 24];

/// Resolved display window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewWindow {
    pub requested_hours: f64,
    pub interval_ms: i64,
    pub max_gap_ms: i64,
}

impl ViewWindow {
    /// ≤ 4h: 1 min grid, 2 min gap. ≤ 120h: 15 min grid. Beyond: hourly. Gap is two slots.
    pub fn resolve(requested_hours: f64) -> Self {
        let hours = requested_hours.max(0.0);
        let interval_ms = if hours <= 4.0 {
            MS_PER_MINUTE
        } else if hours <= 120.0 {
            15 * MS_PER_MINUTE
        } else {
            MS_PER_HOUR
        };
        Self {
            requested_hours: hours,
            interval_ms,
            max_gap_ms: 2 * interval_ms,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.requested_hours * MS_PER_HOUR as f64).round() as i64
    }
}

/// One selectable range. `hours == None` is the live (real-time) view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewOption {
    pub hours: Option<u32>,
}

/// Presets that fit within `retention_hours`, plus the retention itself when it
/// exceeds every preset, or when it is above `dynamic_floor` and not a preset.
pub fn available_hours(retention_hours: u32, presets: &[u32], dynamic_floor: u32) -> Vec<u32> {
    if retention_hours == 0 {
        return Vec::new();
    }
    let mut out: Vec<u32> = presets
        .iter()
        .copied()
        .filter(|&h| retention_hours >= h)
        .collect();
    let largest = presets.iter().copied().max().unwrap_or(0);
    if retention_hours > largest
        || (retention_hours > dynamic_floor && !presets.contains(&retention_hours))
    {
        out.push(retention_hours);
    }
    out
}

pub fn load_views(retention_hours: u32) -> Vec<ViewOption> {
    std::iter::once(ViewOption { hours: None })
        .chain(
            available_hours(retention_hours, &LOAD_PRESET_HOURS, 4)
                .into_iter()
                .map(|h| ViewOption { hours: Some(h) }),
        )
        .collect()
}

pub fn ping_views(retention_hours: u32) -> Vec<ViewOption> {
    available_hours(retention_hours, &PING_PRESET_HOURS, 1)
        .into_iter()
        .map(|h| ViewOption { hours: Some(h) })
        .collect()
}
