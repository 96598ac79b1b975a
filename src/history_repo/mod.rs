// SQLite history. load_records holds one flat row per node per push; ping data lives
// in its own tables (see ping).

pub mod ping;

use std::path::Path;
use std::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::instrument;

use crate::models::{
    EntitySnapshot, GridRow, LOAD_KEYS, MeasurementTask, ProbeRecord, TimestampMs,
};
use crate::series::sentinel::parse_timestamp;

const MS_PER_HOUR: i64 = 60 * 60 * 1000;

pub struct HistoryRepo {
    pool: SqlitePool,
    retention_ms: i64,
    ping_retention_ms: i64,
}

impl HistoryRepo {
    pub async fn connect(
        path: &str,
        retention_hours: u32,
        ping_retention_hours: u32,
    ) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        Ok(Self {
            pool,
            retention_ms: retention_hours as i64 * MS_PER_HOUR,
            ping_retention_ms: ping_retention_hours as i64 * MS_PER_HOUR,
        })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        let columns = LOAD_KEYS
            .iter()
            .map(|k| format!("{} REAL", k))
            .collect::<Vec<_>>()
            .join(", ");
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS load_records (
                entity TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                {},
                UNIQUE (entity, created_at)
            )",
            columns
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_load_entity_created_at ON load_records(entity, created_at)",
        )
        .execute(&self.pool)
        .await?;

        ping::init_ping_tables(&self.pool).await?;

        Ok(())
    }

    /// Persist live snapshots. Redelivered (entity, timestamp) pairs are ignored.
    #[instrument(skip(self, snapshots), fields(repo = "history", operation = "save_load_records", snapshots_count = snapshots.len()))]
    pub async fn save_load_records(&self, snapshots: &[EntitySnapshot]) -> anyhow::Result<()> {
        if snapshots.is_empty() {
            return Ok(());
        }
        let placeholders = (3..3 + LOAD_KEYS.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT OR IGNORE INTO load_records (entity, created_at, {}) VALUES ($1, $2, {})",
            LOAD_KEYS.join(", "),
            placeholders
        );

        let mut tx = self.pool.begin().await?;
        for s in snapshots {
            let mut query = sqlx::query(&sql)
                .bind(&s.entity)
                .bind(s.snapshot.timestamp);
            for key in LOAD_KEYS {
                query = query.bind(s.snapshot.get(key));
            }
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Load rows for `entity` in [from_ts, to_ts), ascending.
    #[instrument(skip(self), fields(repo = "history", operation = "get_load_records"))]
    pub async fn get_load_records(
        &self,
        entity: &str,
        from_ts: TimestampMs,
        to_ts: TimestampMs,
    ) -> anyhow::Result<Vec<GridRow>> {
        let rows = sqlx::query(&format!(
            "SELECT created_at, {} FROM load_records
             WHERE entity = $1 AND created_at >= $2 AND created_at < $3
             ORDER BY created_at ASC",
            LOAD_KEYS.join(", ")
        ))
        .bind(entity)
        .bind(from_ts)
        .bind(to_ts)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_load_row).collect()
    }

    /// Newest `limit` load rows for `entity`, returned ascending (live buffer seed).
    #[instrument(skip(self), fields(repo = "history", operation = "get_recent_load_records"))]
    pub async fn get_recent_load_records(
        &self,
        entity: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<GridRow>> {
        let rows = sqlx::query(&format!(
            "SELECT created_at, {} FROM load_records
             WHERE entity = $1 ORDER BY created_at DESC LIMIT $2",
            LOAD_KEYS.join(", ")
        ))
        .bind(entity)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = rows
            .iter()
            .map(parse_load_row)
            .collect::<anyhow::Result<Vec<_>>>()?;
        out.reverse();
        Ok(out)
    }

    /// Persist probe records; records whose time does not parse are skipped.
    /// Returns how many were accepted.
    #[instrument(skip(self, records), fields(repo = "history", operation = "save_probe_records", records_count = records.len()))]
    pub async fn save_probe_records(
        &self,
        entity: &str,
        records: &[ProbeRecord],
    ) -> anyhow::Result<usize> {
        let mut accepted = 0;
        let mut tx = self.pool.begin().await?;
        for r in records {
            let Some(created_at) = parse_timestamp(&r.time) else {
                tracing::debug!(task_id = r.task_id, time = %r.time, "dropping probe record with malformed time");
                continue;
            };
            sqlx::query(
                "INSERT OR IGNORE INTO ping_records (entity, task_id, created_at, value) VALUES ($1, $2, $3, $4)",
            )
            .bind(entity)
            .bind(r.task_id as i64)
            .bind(created_at)
            .bind(r.value)
            .execute(&mut *tx)
            .await?;
            accepted += 1;
        }
        tx.commit().await?;
        Ok(accepted)
    }

    /// Probe records for `entity` in `[from_ts, to_ts)`, ascending.
    #[instrument(skip(self), fields(repo = "history", operation = "get_probe_records"))]
    pub async fn get_probe_records(
        &self,
        entity: &str,
        from_ts: TimestampMs,
        to_ts: TimestampMs,
    ) -> anyhow::Result<Vec<ProbeRecord>> {
        let rows = sqlx::query(
            "SELECT task_id, created_at, value FROM ping_records
             WHERE entity = $1 AND created_at >= $2 AND created_at < $3
             ORDER BY created_at ASC, task_id ASC",
        )
        .bind(entity)
        .bind(from_ts)
        .bind(to_ts)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(ping::parse_record_row).collect()
    }

    #[instrument(skip(self, task), fields(repo = "history", operation = "upsert_task", task_id = task.id))]
    pub async fn upsert_task(&self, task: &MeasurementTask) -> anyhow::Result<()> {
        anyhow::ensure!(
            task.interval.is_finite() && task.interval > 0.0,
            "task {} interval must be > 0, got {}",
            task.id,
            task.interval
        );
        sqlx::query(
            "INSERT INTO ping_tasks (id, name, interval_secs, type) VALUES ($1, $2, $3, $4)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, interval_secs = excluded.interval_secs, type = excluded.type",
        )
        .bind(task.id as i64)
        .bind(&task.name)
        .bind(task.interval)
        .bind(&task.kind)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_tasks(&self) -> anyhow::Result<Vec<MeasurementTask>> {
        let rows = sqlx::query("SELECT id, name, interval_secs, type FROM ping_tasks ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(ping::parse_task_row).collect()
    }

    /// Delete load rows past retention_hours and ping rows past the ping retention.
    /// Returns (load rows, ping rows) removed.
    #[instrument(skip(self), fields(repo = "history", operation = "prune_old_data"))]
    pub async fn prune_old_data(&self) -> anyhow::Result<(u64, u64)> {
        let now = chrono::Utc::now().timestamp_millis();
        self.prune_before(now - self.retention_ms, now - self.ping_retention_ms)
            .await
    }

    /// Delete load rows older than `load_cutoff` and ping rows older than `ping_cutoff`.
    pub async fn prune_before(
        &self,
        load_cutoff: TimestampMs,
        ping_cutoff: TimestampMs,
    ) -> anyhow::Result<(u64, u64)> {
        let load = sqlx::query("DELETE FROM load_records WHERE created_at < $1")
            .bind(load_cutoff)
            .execute(&self.pool)
            .await?;
        let ping = sqlx::query("DELETE FROM ping_records WHERE created_at < $1")
            .bind(ping_cutoff)
            .execute(&self.pool)
            .await?;
        Ok((load.rows_affected(), ping.rows_affected()))
    }
}

fn parse_load_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<GridRow> {
    let created_at: i64 = row.try_get("created_at")?;
    let mut out = GridRow::new(created_at);
    for key in LOAD_KEYS {
        let value: Option<f64> = row.try_get(key)?;
        out.values.insert(key.to_string(), value);
    }
    Ok(out)
}
