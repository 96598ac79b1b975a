// Live ingest and background maintenance.
// Pushed reports fan out to the live buffer, the /ws/live broadcast and a dedicated
// history writer task (channel); a maintenance loop prunes old records.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, Instant, interval};

use crate::history_repo::HistoryRepo;
use crate::live_buffer::LiveStore;
use crate::models::{EntitySnapshot, NodeReport};

/// Rate limit for the "no receivers" log (avoid logging every push when no one is on /ws/live).
const NO_RECEIVERS_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Channel capacity for the history writer (backpressure if it falls behind).
pub fn writer_channel_capacity(flush_rate: u64) -> usize {
    (flush_rate as usize * 2).max(32)
}

/// Result of applying one pushed report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Accepted,
    /// Same node and timestamp as a snapshot already held, or older than a full
    /// live window.
    Duplicate,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("unparseable updated_at: {0:?}")]
    BadTimestamp(String),
}

/// Fan-out for live pushes.
pub struct LiveIngest {
    live: Arc<LiveStore>,
    tx: broadcast::Sender<EntitySnapshot>,
    write_tx: mpsc::Sender<EntitySnapshot>,
    last_no_receivers_warn: Mutex<Option<Instant>>,
}

impl LiveIngest {
    pub fn new(
        live: Arc<LiveStore>,
        tx: broadcast::Sender<EntitySnapshot>,
        write_tx: mpsc::Sender<EntitySnapshot>,
    ) -> Self {
        Self {
            live,
            tx,
            write_tx,
            last_no_receivers_warn: Mutex::new(None),
        }
    }

    pub fn live(&self) -> &LiveStore {
        &self.live
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EntitySnapshot> {
        self.tx.subscribe()
    }

    pub async fn ingest(
        &self,
        entity: &str,
        report: &NodeReport,
    ) -> Result<IngestOutcome, IngestError> {
        let snapshot = report
            .to_snapshot()
            .ok_or_else(|| IngestError::BadTimestamp(report.updated_at.clone()))?;

        if !self.live.record(entity, snapshot.clone()).await {
            tracing::debug!(entity, timestamp = snapshot.timestamp, "duplicate or stale live report ignored");
            return Ok(IngestOutcome::Duplicate);
        }

        let tagged = EntitySnapshot {
            entity: entity.to_string(),
            snapshot,
        };
        if self.tx.send(tagged.clone()).is_err() {
            self.log_no_receivers();
        }
        if self.write_tx.send(tagged).await.is_err() {
            tracing::debug!("History writer channel closed");
        }
        Ok(IngestOutcome::Accepted)
    }

    fn log_no_receivers(&self) {
        let mut last = self
            .last_no_receivers_warn
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if last.is_none_or(|t| t.elapsed() >= NO_RECEIVERS_WARN_INTERVAL) {
            tracing::debug!(
                operation = "broadcast_snapshot",
                "No active WebSocket clients; broadcast channel has no receivers"
            );
            *last = Some(Instant::now());
        }
    }
}

/// Writer config: batching for the dedicated history writer task.
pub struct HistoryWriterConfig {
    pub flush_rate: u64,
    pub flush_interval_secs: u64,
}

/// Spawns the task that receives snapshots and flushes them to the DB.
/// Flushes when buffer len >= flush_rate, every flush_interval_secs, or when the channel closes.
pub fn spawn_history_writer(
    mut write_rx: mpsc::Receiver<EntitySnapshot>,
    history_repo: Arc<HistoryRepo>,
    config: HistoryWriterConfig,
    snapshots_saved_total: Arc<AtomicU64>,
) -> tokio::task::JoinHandle<()> {
    let flush_interval = Duration::from_secs(config.flush_interval_secs);
    tokio::spawn(async move {
        let mut buffer: Vec<EntitySnapshot> = Vec::new();
        let mut flush_tick = interval(flush_interval);
        flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = write_rx.recv() => {
                    match result {
                        Some(snapshot) => {
                            buffer.push(snapshot);
                            if buffer.len() >= config.flush_rate as usize
                                && let Err(e) = flush_buffer(&history_repo, &mut buffer, &snapshots_saved_total).await
                            {
                                tracing::warn!(error = %e, "history writer: save_load_records failed");
                            }
                        }
                        None => break,
                    }
                }
                _ = flush_tick.tick() => {
                    if let Err(e) = flush_buffer(&history_repo, &mut buffer, &snapshots_saved_total).await {
                        tracing::warn!(error = %e, "history writer: save_load_records failed");
                    }
                }
            }
        }
        if let Err(e) = flush_buffer(&history_repo, &mut buffer, &snapshots_saved_total).await {
            tracing::warn!(error = %e, "history writer: final flush failed");
        }
        tracing::debug!("History writer shutting down");
    })
}

async fn flush_buffer(
    history_repo: &HistoryRepo,
    buffer: &mut Vec<EntitySnapshot>,
    snapshots_saved_total: &AtomicU64,
) -> anyhow::Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    let n = buffer.len();
    history_repo.save_load_records(buffer).await?;
    snapshots_saved_total.fetch_add(n as u64, Ordering::Relaxed);
    buffer.clear();
    tracing::debug!(
        operation = "save_load_records",
        snapshots_count = n,
        "Snapshots saved"
    );
    Ok(())
}

/// Repos, counters, and shutdown for the maintenance loop.
pub struct WorkerDeps {
    pub history_repo: Arc<HistoryRepo>,
    pub ws_live_connections: Arc<AtomicUsize>,
    pub snapshots_saved_total: Arc<AtomicU64>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

pub struct WorkerConfig {
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
    /// How often to prune old data (real seconds).
    pub prune_interval_secs: u64,
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        history_repo,
        ws_live_connections,
        snapshots_saved_total,
        mut shutdown_rx,
    } = deps;

    tokio::spawn(async move {
        let mut stats_log_tick = interval(Duration::from_secs(config.stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut prune_tick = interval(Duration::from_secs(config.prune_interval_secs));
        prune_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut rows_pruned_total: u64 = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        ws_live_clients = ws_live_connections.load(Ordering::Relaxed),
                        snapshots_saved_total = snapshots_saved_total.load(Ordering::Relaxed),
                        rows_pruned_total,
                        "app stats"
                    );
                }
                _ = prune_tick.tick() => {
                    match history_repo.prune_old_data().await {
                        Ok((load, ping)) => {
                            rows_pruned_total += load + ping;
                            tracing::debug!(
                                operation = "prune_old_data",
                                load_rows = load,
                                ping_rows = ping,
                                "Old data pruned"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                operation = "prune_old_data",
                                "Failed to prune old data"
                            );
                        }
                    }
                }
            }
        }
    })
}
