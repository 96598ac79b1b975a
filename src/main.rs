use anyhow::Result;
use probechart::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize};
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

/// How often the maintenance loop logs app stats.
const STATS_LOG_INTERVAL_SECS: u64 = 300;
const WRITER_DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let (tx, _) =
        broadcast::channel::<models::EntitySnapshot>(app_config.live.broadcast_capacity);

    let history_repo = Arc::new(
        history_repo::HistoryRepo::connect(
            &app_config.database.path,
            app_config.database.retention_hours,
            app_config.chart.ping_retention_hours,
        )
        .await?,
    );
    history_repo.init().await?;

    let snapshots_saved_total = Arc::new(AtomicU64::new(0));
    let (write_tx, write_rx) =
        mpsc::channel(worker::writer_channel_capacity(app_config.database.flush_rate));
    let writer_handle = worker::spawn_history_writer(
        write_rx,
        history_repo.clone(),
        worker::HistoryWriterConfig {
            flush_rate: app_config.database.flush_rate,
            flush_interval_secs: app_config.database.flush_interval_secs,
        },
        snapshots_saved_total.clone(),
    );

    let live = Arc::new(live_buffer::LiveStore::new(app_config.live.capacity));
    let ingest = Arc::new(worker::LiveIngest::new(live, tx, write_tx));

    let ws_live_connections = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            history_repo: history_repo.clone(),
            ws_live_connections: ws_live_connections.clone(),
            snapshots_saved_total,
            shutdown_rx,
        },
        worker::WorkerConfig {
            stats_log_interval_secs: STATS_LOG_INTERVAL_SECS,
            prune_interval_secs: app_config.database.prune_interval_secs,
        },
    );

    let app = routes::app(
        history_repo,
        ingest,
        ws_live_connections,
        app_config.clone(),
    );
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
        }
    }

    // Dropping the router releases the writer's sender; the writer drains and exits.
    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer_handle)
        .await
        .is_err()
    {
        tracing::warn!("History writer did not drain before shutdown");
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
