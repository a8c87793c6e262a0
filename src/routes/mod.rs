// HTTP + WebSocket routes

mod http;
mod ws;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::client::DataClient;
use crate::config::AppConfig;
use crate::fetch::ChartFetcher;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) client: Arc<DataClient>,
    pub(crate) fetcher: Arc<ChartFetcher>,
    pub(crate) config: AppConfig,
}

pub fn app(client: Arc<DataClient>, fetcher: Arc<ChartFetcher>, config: AppConfig) -> Router {
    let state = AppState {
        client,
        fetcher,
        config,
    };
    Router::new()
        .route("/", get(|| async { "wattline: chart data engine" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/devices", get(http::devices_handler)) // GET /api/devices
        .route("/api/devices/{device_id}/stats", get(http::stats_handler)) // GET stats
        .route("/api/chart", post(http::chart_handler)) // POST /api/chart
        .route("/ws/live/{device_id}", get(ws::ws_live)) // WS /ws/live/{id}
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
