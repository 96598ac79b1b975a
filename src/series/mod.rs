// Time-series normalization engine.
//
// probe records -> sentinel -> anchor grouping -> grid resample
//               -> [peak suppression] -> gap-bounded interpolation -> chart rows
//
// Every stage is a pure function over its input; a chart is rebuilt from scratch
// on each request.

pub mod grouping;
pub mod interpolate;
pub mod peak;
pub mod resample;
pub mod sentinel;
pub mod summary;
pub mod view;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{GridRow, MeasurementTask, ProbeRecord};

pub use interpolate::GapParams;
pub use peak::PeakParams;
pub use summary::LatestValue;
pub use view::ViewWindow;

/// Knobs shared by the ping and load pipelines.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChartOptions {
    pub gap: GapParams,
    /// Peak suppression is applied only when set.
    pub peak: Option<PeakParams>,
}

/// Chart-ready ping series plus the per-task projections shown beside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingChart {
    pub window: ViewWindow,
    pub rows: Vec<GridRow>,
    pub tasks: Vec<MeasurementTask>,
    pub latest: Vec<LatestValue>,
}

/// Build the ping chart for the last `hours` of `records`.
pub fn ping_chart(
    records: &[ProbeRecord],
    tasks: &[MeasurementTask],
    hours: f64,
    options: &ChartOptions,
) -> PingChart {
    let window = ViewWindow::resolve(hours);
    let samples = sentinel::normalize_records(records);
    let aligned = grouping::align_samples(&samples, tasks);
    let rows: Vec<GridRow> = aligned.into_iter().map(|r| r.into_grid_row()).collect();

    let mut keys: Vec<String> = tasks.iter().map(|t| t.key()).collect();
    if keys.is_empty() {
        keys = row_keys(&rows);
    }

    let rows = finish(&rows, &keys, &window, options);
    PingChart {
        window,
        rows,
        tasks: summary::with_aggregates(tasks, &samples),
        latest: summary::latest_values(&samples, tasks),
    }
}

/// Build a load chart (cpu, ram, network, ...) from flat historical rows.
pub fn load_chart(rows: &[GridRow], hours: f64, options: &ChartOptions) -> Vec<GridRow> {
    let window = ViewWindow::resolve(hours);
    let keys = row_keys(rows);
    finish(rows, &keys, &window, options)
}

/// Resample, optionally suppress peaks, then interpolate short gaps.
fn finish(
    rows: &[GridRow],
    keys: &[String],
    window: &ViewWindow,
    options: &ChartOptions,
) -> Vec<GridRow> {
    let mut grid = resample::resample(rows, window);
    if grid.is_empty() {
        return grid;
    }
    for row in &mut grid {
        row.ensure_keys(keys);
    }
    if let Some(peak) = &options.peak {
        grid = peak::suppress_peaks(&grid, keys, peak);
    }
    interpolate::interpolate_gaps(&grid, keys, Some(window.interval_ms), &options.gap)
}

fn row_keys(rows: &[GridRow]) -> Vec<String> {
    rows.iter()
        .flat_map(|r| r.values.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
