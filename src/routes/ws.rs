// WebSocket /ws/live/{uuid}: live snapshots for one node, plus on-demand chart
// fetches where only the newest request is answered.

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, timeout};

use super::AppState;
use super::http::{build_load_records, build_ping_records};
use crate::models::{EntitySnapshot, LiveSnapshot};
use crate::session::LatestRequest;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements the ws_live connection count on drop (connect = +1, drop = -1).
struct WsLiveGuard(Arc<AtomicUsize>);

impl Drop for WsLiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Client -> server: select the chart shown next to the live view.
#[derive(Debug, Deserialize)]
#[serde(tag = "chart", rename_all = "lowercase")]
enum ChartRequest {
    Load {
        hours: Option<f64>,
    },
    Ping {
        hours: Option<f64>,
        #[serde(default, rename = "cutPeak")]
        cut_peak: bool,
    },
}

/// Server -> client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Outgoing<'a> {
    Live { snapshot: &'a LiveSnapshot },
    History { chart: &'static str, data: serde_json::Value },
    Error { error: String },
}

pub(super) async fn ws_live(
    ws: WebSocketUpgrade,
    Path(uuid): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let mut rx = state.ingest.subscribe();
        if let Err(e) = stream_live(socket, &mut rx, uuid, state).await {
            tracing::info!("Live stream error: {}", e);
        }
    })
}

async fn send_json<T: Serialize>(socket: &mut WebSocket, msg: &T) -> anyhow::Result<bool> {
    let json = serde_json::to_string(msg)?;
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    Ok(matches!(r, Ok(Ok(()))))
}

async fn stream_live(
    mut socket: WebSocket,
    rx: &mut broadcast::Receiver<EntitySnapshot>,
    uuid: String,
    state: AppState,
) -> anyhow::Result<()> {
    let conn_count = state.ws_live_connections.clone();
    conn_count.fetch_add(1, Ordering::Relaxed);
    let _guard = WsLiveGuard(conn_count);
    tracing::info!(entity = %uuid, "Client connected to live stream");

    let session = LatestRequest::new();
    let (result_tx, mut result_rx) = mpsc::channel::<Outgoing<'static>>(4);

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(tagged) if tagged.entity == uuid => {
                        if !send_json(&mut socket, &Outgoing::Live { snapshot: &tagged.snapshot }).await? {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket /ws/live client lagged, skipped {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ChartRequest>(text.as_str()) {
                            Ok(request) => spawn_fetch(&session, request, &uuid, &state, &result_tx),
                            Err(e) => {
                                let msg = Outgoing::Error { error: format!("bad request: {}", e) };
                                if !send_json(&mut socket, &msg).await? {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
            Some(reply) = result_rx.recv() => {
                if !send_json(&mut socket, &reply).await? {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    session.cancel();
    Ok(())
}

/// Start a chart fetch, superseding any fetch this client still has in flight.
fn spawn_fetch(
    session: &LatestRequest,
    request: ChartRequest,
    uuid: &str,
    state: &AppState,
    result_tx: &mpsc::Sender<Outgoing<'static>>,
) {
    let state = state.clone();
    let uuid = uuid.to_string();
    let handle = session.spawn(async move {
        let (chart, data) = match request {
            ChartRequest::Load { hours } => (
                "load",
                build_load_records(&state, &uuid, hours)
                    .await
                    .map(serde_json::to_value),
            ),
            ChartRequest::Ping { hours, cut_peak } => (
                "ping",
                build_ping_records(&state, &uuid, hours, cut_peak)
                    .await
                    .map(serde_json::to_value),
            ),
        };
        match data {
            Ok(Ok(data)) => Outgoing::History { chart, data },
            Ok(Err(e)) => Outgoing::Error { error: e.to_string() },
            Err(e) => Outgoing::Error { error: e.to_string() },
        }
    });

    let result_tx = result_tx.clone();
    tokio::spawn(async move {
        // Aborted or superseded fetches produce nothing.
        if let Ok(Some(reply)) = handle.await {
            let _ = result_tx.send(reply).await;
        }
    });
}
