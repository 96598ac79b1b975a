// HTTP + WebSocket routes

mod error;
mod http;
mod ws;

pub use error::ApiError;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::history_repo::HistoryRepo;
use crate::worker::LiveIngest;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) history_repo: Arc<HistoryRepo>,
    pub(crate) ingest: Arc<LiveIngest>,
    pub(crate) ws_live_connections: Arc<AtomicUsize>,
    pub(crate) config: Arc<AppConfig>,
}

pub fn app(
    history_repo: Arc<HistoryRepo>,
    ingest: Arc<LiveIngest>,
    ws_live_connections: Arc<AtomicUsize>,
    config: AppConfig,
) -> Router {
    let state = AppState {
        history_repo,
        ingest,
        ws_live_connections,
        config: Arc::new(config),
    };
    Router::new()
        .route("/", get(|| async { "probechart: node load and ping charts" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/records/load", get(http::load_records_handler)) // GET /api/records/load?uuid=&hours=
        .route("/api/records/ping", get(http::ping_records_handler)) // GET /api/records/ping?uuid=&hours=&cutPeak=
        .route("/api/recent/{uuid}", get(http::recent_handler)) // GET /api/recent/{uuid}
        .route("/api/views", get(http::views_handler)) // GET /api/views
        .route("/api/report/{uuid}", post(http::report_handler)) // POST /api/report/{uuid}
        .route("/api/ping/{uuid}", post(http::ping_ingest_handler)) // POST /api/ping/{uuid}
        .route("/ws/live/{uuid}", get(ws::ws_live)) // WS /ws/live/{uuid}
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
