// Chart pipeline tests: probe records -> grid rows, end to end

mod common;

use common::probe;
use probechart::live_buffer::{LiveBuffer, concat_with_history};
use probechart::models::*;
use probechart::series::{self, ChartOptions, PeakParams};

const MIN: i64 = 60_000;
/// An hour boundary, so every grid cadence lines up with it.
const BASE: i64 = 1_699_999_200_000;

fn tasks() -> Vec<MeasurementTask> {
    vec![
        MeasurementTask::new(1, "frankfurt", 60.0),
        MeasurementTask::new(2, "tokyo", 60.0),
    ]
}

fn column(rows: &[GridRow], key: &str) -> Vec<Option<f64>> {
    rows.iter().map(|r| r.get(key)).collect()
}

/// One hour of two jittered tasks; task 1 reports a sentinel at minute 30 and
/// task 2 skips minute 40.
fn hour_of_records() -> Vec<ProbeRecord> {
    let mut out = Vec::new();
    for m in 0..=60 {
        let t = BASE + m * MIN;
        let v1 = if m == 30 { -1.0 } else { 10.0 + m as f64 };
        out.push(probe(1, t + 200, v1));
        if m != 40 {
            out.push(probe(2, t + 500, 50.0));
        }
    }
    out
}

#[test]
fn ping_chart_end_to_end() {
    let chart = series::ping_chart(&hour_of_records(), &tasks(), 1.0, &ChartOptions::default());

    assert_eq!(chart.window.interval_ms, MIN);
    assert_eq!(chart.rows.len(), 61);
    assert_eq!(chart.rows[0].timestamp, BASE);
    for pair in chart.rows.windows(2) {
        assert_eq!(pair[1].timestamp - pair[0].timestamp, MIN);
    }

    // Sentinel at minute 30 is bridged from its neighbors (39 and 41).
    assert_eq!(chart.rows[30].get("1"), Some(40.0));
    // Task 2's skipped sample is bridged too.
    assert_eq!(chart.rows[40].get("2"), Some(50.0));
    assert_eq!(chart.rows[60].get("1"), Some(70.0));

    let latest = &chart.latest;
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].value, Some(70.0));
    assert_eq!(latest[0].timestamp, Some(BASE + 60 * MIN + 200));

    let agg = &chart.tasks[0].aggregates;
    assert_eq!(agg.total, Some(61));
    let loss = agg.loss.unwrap();
    assert!((loss - 100.0 / 61.0).abs() < 1e-9);
    assert_eq!(chart.tasks[1].aggregates.loss, Some(0.0));
}

#[test]
fn outage_longer_than_cap_stays_missing() {
    let records: Vec<ProbeRecord> = (0..=10)
        .chain(30..=40)
        .map(|m| probe(1, BASE + m * MIN + 200, 20.0))
        .collect();
    let chart = series::ping_chart(&records, &tasks()[..1], 1.0, &ChartOptions::default());

    assert_eq!(chart.rows.len(), 41);
    let values = column(&chart.rows, "1");
    // Slot 11 still reaches the minute-10 sample (half a gap away); slot 29 does not
    // reach minute 30's.
    assert!(values[..=11].iter().all(|v| *v == Some(20.0)));
    assert!(values[12..30].iter().all(|v| v.is_none()));
    assert!(values[30..].iter().all(|v| *v == Some(20.0)));
}

#[test]
fn empty_records_give_empty_chart() {
    let chart = series::ping_chart(&[], &tasks(), 6.0, &ChartOptions::default());
    assert!(chart.rows.is_empty());
    assert_eq!(chart.latest.len(), 2);
    assert!(chart.latest.iter().all(|l| l.value.is_none()));
    assert_eq!(chart.tasks[0].aggregates, TaskAggregates::default());
}

#[test]
fn records_without_tasks_are_keyed_by_task_id() {
    let records = vec![probe(7, BASE, 5.0), probe(7, BASE + MIN, 6.0)];
    let chart = series::ping_chart(&records, &[], 1.0, &ChartOptions::default());
    assert_eq!(chart.rows.len(), 2);
    assert_eq!(chart.rows[1].get("7"), Some(6.0));
    assert!(chart.latest.is_empty());
}

#[test]
fn cut_peak_damps_only_the_spike() {
    let mut records = Vec::new();
    for m in 0..=10 {
        let v = if m == 5 { 200.0 } else { 20.0 };
        records.push(probe(1, BASE + m * MIN, v));
        records.push(probe(2, BASE + m * MIN, 20.0));
    }
    let plain = series::ping_chart(&records, &tasks(), 1.0, &ChartOptions::default());
    assert_eq!(plain.rows[5].get("1"), Some(200.0));

    let options = ChartOptions {
        peak: Some(PeakParams::default()),
        ..ChartOptions::default()
    };
    let cut = series::ping_chart(&records, &tasks(), 1.0, &options);
    // threshold 30, excess 170 * 0.2 = 34
    assert_eq!(cut.rows[5].get("1"), Some(64.0));
    assert_eq!(column(&cut.rows, "2"), column(&plain.rows, "2"));
    // Aggregates describe raw samples, not the display series.
    assert_eq!(cut.tasks[0].aggregates.max, Some(200.0));
}

fn minute_load_rows(minutes: i64) -> Vec<GridRow> {
    (0..=minutes)
        .map(|m| {
            let cpu = if m % 97 == 3 { None } else { Some((m % 50) as f64) };
            GridRow::new(BASE + m * MIN)
                .with("cpu", cpu)
                .with("ram", Some(100.0))
        })
        .collect()
}

#[test]
fn load_chart_day_view_uses_quarter_hour_grid() {
    let rows = series::load_chart(&minute_load_rows(1440), 24.0, &ChartOptions::default());
    assert_eq!(rows.len(), 97);
    assert_eq!(rows[0].timestamp, BASE);
    assert_eq!(rows[96].timestamp, BASE + 1440 * MIN);
    assert!(rows.iter().all(|r| r.get("ram") == Some(100.0)));
    assert_eq!(rows[1].get("cpu"), Some(15.0));
}

fn peak_options(cut_peak: bool) -> ChartOptions {
    ChartOptions {
        peak: cut_peak.then(PeakParams::default),
        ..ChartOptions::default()
    }
}

#[test]
fn ping_chart_same_input_same_output() {
    let mut records = hour_of_records();
    records.push(probe(2, BASE + 20 * MIN + 500, 400.0));
    for cut_peak in [false, true] {
        let options = peak_options(cut_peak);
        let first = series::ping_chart(&records, &tasks(), 1.0, &options);
        let second = series::ping_chart(&records, &tasks(), 1.0, &options);
        assert_eq!(first, second, "cut_peak = {cut_peak}");
        assert_eq!(first.rows.len(), 61);
    }
}

#[test]
fn load_chart_same_input_same_output() {
    let mut rows = minute_load_rows(240);
    // A gap long enough to survive interpolation.
    rows.retain(|r| !(100 * MIN..=130 * MIN).contains(&(r.timestamp - BASE)));
    for cut_peak in [false, true] {
        let options = peak_options(cut_peak);
        let first = series::load_chart(&rows, 4.0, &options);
        let second = series::load_chart(&rows, 4.0, &options);
        assert_eq!(first, second, "cut_peak = {cut_peak}");
        assert!(first.iter().any(|r| r.get("cpu").is_none()));
    }
}

#[test]
fn load_chart_output_is_a_fixed_point_without_peak_cut() {
    let mut rows = minute_load_rows(240);
    rows.retain(|r| !(100 * MIN..=130 * MIN).contains(&(r.timestamp - BASE)));
    let once = series::load_chart(&rows, 4.0, &ChartOptions::default());
    let twice = series::load_chart(&once, 4.0, &ChartOptions::default());
    assert_eq!(once, twice);
}

#[test]
fn live_buffer_holds_last_capacity_and_splices_with_history() {
    let capacity = 150;
    let mut buffer = LiveBuffer::new(capacity);
    for i in 0..=capacity as i64 {
        buffer.push(GridRow::new(BASE + i * 5_000).with("cpu", Some(i as f64)));
    }
    assert_eq!(buffer.len(), capacity);
    assert_eq!(buffer.iter().next().map(|r| r.timestamp), Some(BASE + 5_000));

    let history: Vec<GridRow> = (0..10)
        .map(|i| GridRow::new(BASE - 60_000 + i * 10_000).with("cpu", Some(0.0)))
        .collect();
    let spliced = concat_with_history(&history, &buffer);
    assert_eq!(spliced.len(), 7 + capacity);
    for pair in spliced.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }
}
