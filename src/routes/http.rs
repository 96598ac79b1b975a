// HTTP handlers: version, chart records, live rows, views, ingest

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;
use crate::live_buffer::{LiveBuffer, concat_with_history};
use crate::models::{GridRow, MeasurementTask, NodeReport, ProbeRecord};
use crate::series::{self, LatestValue, summary, view};
use crate::worker::IngestOutcome;

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": crate::version::NAME,
        "version": crate::version::VERSION,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RecordsQuery {
    pub uuid: String,
    /// Absent or 0 selects the real-time view (load only).
    pub hours: Option<f64>,
    #[serde(default)]
    pub cut_peak: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct LoadRecords {
    pub count: usize,
    /// Grid cadence in ms; `None` for real-time rows, which are not regridded.
    pub interval: Option<i64>,
    pub rows: Vec<GridRow>,
}

#[derive(Debug, Serialize)]
pub(super) struct PingRecords {
    pub count: usize,
    pub interval: i64,
    pub rows: Vec<GridRow>,
    pub tasks: Vec<MeasurementTask>,
    pub latest: Vec<LatestValue>,
}

fn requested_hours(hours: Option<f64>) -> Result<Option<f64>, ApiError> {
    match hours {
        None => Ok(None),
        Some(h) if !h.is_finite() || h < 0.0 => Err(ApiError::BadRequest(format!(
            "hours must be a non-negative number, got {}",
            h
        ))),
        Some(h) if h == 0.0 => Ok(None),
        Some(h) => Ok(Some(h)),
    }
}

/// Live buffer for `uuid`, seeded from the store on first use.
pub(super) async fn live_rows(state: &AppState, uuid: &str) -> Result<LiveBuffer, ApiError> {
    let live = state.ingest.live();
    if let Some(buffer) = live.get(uuid).await {
        return Ok(buffer.as_ref().clone());
    }
    let capacity = state.config.live.capacity;
    let recent = state
        .history_repo
        .get_recent_load_records(uuid, capacity as u32)
        .await?;
    Ok(live.seed(uuid, recent).await.as_ref().clone())
}

pub(super) async fn build_load_records(
    state: &AppState,
    uuid: &str,
    hours: Option<f64>,
) -> Result<LoadRecords, ApiError> {
    let info = state.config.node_info(uuid);
    let live = live_rows(state, uuid).await?;

    let Some(hours) = requested_hours(hours)? else {
        let rows = summary::project_usage(&live.rows(), &info);
        return Ok(LoadRecords {
            count: rows.len(),
            interval: None,
            rows,
        });
    };

    let window = series::ViewWindow::resolve(hours);
    let now = chrono::Utc::now().timestamp_millis();
    let from = now - window.duration_ms() - window.interval_ms;
    let history = state.history_repo.get_load_records(uuid, from, now + 1).await?;
    let merged: Vec<GridRow> = concat_with_history(&history, &live)
        .into_iter()
        .filter(|r| r.timestamp >= from)
        .collect();
    let projected = summary::project_usage(&merged, &info);
    let rows = series::load_chart(&projected, hours, &state.config.chart.options(false));
    Ok(LoadRecords {
        count: rows.len(),
        interval: Some(window.interval_ms),
        rows,
    })
}

pub(super) async fn build_ping_records(
    state: &AppState,
    uuid: &str,
    hours: Option<f64>,
    cut_peak: bool,
) -> Result<PingRecords, ApiError> {
    let hours = requested_hours(hours)?.unwrap_or(1.0);
    let window = series::ViewWindow::resolve(hours);
    let now = chrono::Utc::now().timestamp_millis();
    let from = now - window.duration_ms() - window.interval_ms;
    let tasks = state.history_repo.get_tasks().await?;
    // Records stamped ahead of the server clock would drag the grid into the future.
    let to = now + series::grouping::tolerance_ms(&tasks) + 1;
    let records = state.history_repo.get_probe_records(uuid, from, to).await?;
    let chart = series::ping_chart(
        &records,
        &tasks,
        hours,
        &state.config.chart.options(cut_peak),
    );
    Ok(PingRecords {
        count: chart.rows.len(),
        interval: chart.window.interval_ms,
        rows: chart.rows,
        tasks: chart.tasks,
        latest: chart.latest,
    })
}

/// GET /api/records/load?uuid=&hours=
pub(super) async fn load_records_handler(
    State(state): State<AppState>,
    Query(q): Query<RecordsQuery>,
) -> Result<Json<LoadRecords>, ApiError> {
    Ok(Json(build_load_records(&state, &q.uuid, q.hours).await?))
}

/// GET /api/records/ping?uuid=&hours=&cutPeak=
pub(super) async fn ping_records_handler(
    State(state): State<AppState>,
    Query(q): Query<RecordsQuery>,
) -> Result<Json<PingRecords>, ApiError> {
    Ok(Json(
        build_ping_records(&state, &q.uuid, q.hours, q.cut_peak).await?,
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RecentRows {
    pub count: usize,
    pub rows: Vec<GridRow>,
    /// Share of the node's traffic limit used, from the newest row's totals.
    pub traffic_percent: f64,
}

/// GET /api/recent/{uuid} — live buffer rows, oldest first.
pub(super) async fn recent_handler(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<RecentRows>, ApiError> {
    let live = live_rows(&state, &uuid).await?;
    let info = state.config.node_info(&uuid);
    let traffic_percent = live
        .latest()
        .map(|row| {
            summary::traffic_percent(
                row.get("net_total_up").unwrap_or(0.0),
                row.get("net_total_down").unwrap_or(0.0),
                info.traffic_limit as f64,
                info.traffic_limit_type,
            )
        })
        .unwrap_or(0.0);
    let rows = summary::project_usage(&live.rows(), &info);
    Ok(Json(RecentRows {
        count: rows.len(),
        rows,
        traffic_percent,
    }))
}

/// GET /api/views — selectable ranges for the load and ping charts.
pub(super) async fn views_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "load": view::load_views(state.config.database.retention_hours),
        "ping": view::ping_views(state.config.chart.ping_retention_hours),
    }))
}

/// POST /api/report/{uuid} — one live push from a node.
pub(super) async fn report_handler(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Json(report): Json<NodeReport>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.ingest.ingest(&uuid, &report).await?;
    let (status, accepted) = match outcome {
        IngestOutcome::Accepted => (StatusCode::ACCEPTED, true),
        IngestOutcome::Duplicate => (StatusCode::OK, false),
    };
    Ok((status, Json(serde_json::json!({ "accepted": accepted }))))
}

#[derive(Debug, Deserialize)]
pub(super) struct PingBatch {
    pub records: Vec<ProbeRecord>,
    #[serde(default)]
    pub tasks: Vec<MeasurementTask>,
}

/// POST /api/ping/{uuid} — probe results, optionally with task definitions.
pub(super) async fn ping_ingest_handler(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Json(batch): Json<PingBatch>,
) -> Result<impl IntoResponse, ApiError> {
    for task in &batch.tasks {
        if !(task.interval.is_finite() && task.interval > 0.0) {
            return Err(ApiError::BadRequest(format!(
                "task {} interval must be > 0, got {}",
                task.id, task.interval
            )));
        }
        state.history_repo.upsert_task(task).await?;
    }
    let accepted = state
        .history_repo
        .save_probe_records(&uuid, &batch.records)
        .await?;
    tracing::debug!(entity = %uuid, accepted, received = batch.records.len(), "ping batch stored");
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "accepted": accepted })),
    ))
}
