// WebSocket live stream: one poll task + one render loop per socket

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::fetch::now_epoch_ms;
use crate::live::{self, LiveSession};

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) async fn ws_live(
    ws: WebSocketUpgrade,
    Path(device_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_live(socket, state, device_id).await {
            tracing::info!("Live stream error: {}", e);
        }
    })
}

async fn stream_live(
    mut socket: WebSocket,
    state: AppState,
    device_id: String,
) -> anyhow::Result<()> {
    tracing::info!(device_id = %device_id, "Client connected to live stream");

    // Poll period comes from the device registry; fall back to config when
    // the registry is unreachable or has no entry for this device.
    let poll_interval_ms = match state.client.devices().await {
        Ok(devices) => devices
            .iter()
            .find(|d| d.device_id == device_id)
            .map(|d| d.poll_interval_ms().max(1) as u64)
            .unwrap_or(state.config.live.fallback_poll_interval_ms),
        Err(e) => {
            tracing::warn!(error = %e, "device registry unavailable; using fallback poll interval");
            state.config.live.fallback_poll_interval_ms
        }
    };

    let (writer, reader) = live::handoff();
    let poll_task = live::spawn_poll_task(
        state.client.clone(),
        device_id.clone(),
        poll_interval_ms,
        writer,
    );
    let mut session = LiveSession::new(device_id, state.config.live.window_secs, reader);

    let mut render_tick =
        tokio::time::interval(Duration::from_millis(state.config.live.render_interval_ms));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = render_tick.tick() => {
                let frame = session.render_tick(now_epoch_ms());
                let json = serde_json::to_string(&frame)?;
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
        }
    }
    poll_task.abort();
    Ok(())
}
