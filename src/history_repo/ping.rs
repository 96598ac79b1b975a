// Ping storage: probe records per node and the task catalog.
// Values are stored as received; sentinel handling happens in the chart pipeline.

use chrono::{DateTime, SecondsFormat};
use sqlx::{Row, SqlitePool};

use crate::models::{MeasurementTask, ProbeRecord, TimestampMs};

/// Creates ping_records and ping_tasks if not present.
pub async fn init_ping_tables(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ping_records (
            entity TEXT NOT NULL,
            task_id INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            value REAL NOT NULL,
            UNIQUE (entity, task_id, created_at)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ping_entity_created_at ON ping_records(entity, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ping_tasks (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            interval_secs REAL NOT NULL,
            type TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// RFC 3339 in UTC with millisecond precision, the shape probe records arrive in.
pub fn format_time(ts: TimestampMs) -> Option<String> {
    DateTime::from_timestamp_millis(ts).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub(super) fn parse_record_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<ProbeRecord> {
    let task_id: i64 = row.try_get("task_id")?;
    let created_at: i64 = row.try_get("created_at")?;
    let value: f64 = row.try_get("value")?;
    let time = format_time(created_at)
        .ok_or_else(|| anyhow::anyhow!("created_at out of range: {}", created_at))?;
    Ok(ProbeRecord {
        task_id: u32::try_from(task_id)?,
        time,
        value,
    })
}

pub(super) fn parse_task_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<MeasurementTask> {
    let id: i64 = row.try_get("id")?;
    let name: String = row.try_get("name")?;
    let interval: f64 = row.try_get("interval_secs")?;
    let kind: Option<String> = row.try_get("type")?;
    let mut task = MeasurementTask::new(u32::try_from(id)?, name, interval);
    task.kind = kind;
    Ok(task)
}
