//! Public routes that don't require authentication

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::state::StateStore;
use crate::websocket::ViewerRegistry;

#[derive(Clone)]
pub struct PublicState {
    pub store: Arc<StateStore>,
    pub viewers: Arc<ViewerRegistry>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
struct PingResponse {
    status: String,
    version: String,
    viewers: usize,
    containers: usize,
    images: usize,
    uptime_secs: i64,
}

pub fn public_router(state: PublicState) -> Router {
    Router::new()
        .route("/api/v1/public/ping", get(ping))
        .with_state(state)
}

async fn ping(State(state): State<PublicState>) -> Response {
    let (images, containers) = state.store.counts().await;
    let uptime = chrono::Utc::now() - state.started_at;

    (StatusCode::OK, Json(PingResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        viewers: state.viewers.len().await,
        containers,
        images,
        uptime_secs: uptime.num_seconds(),
    })).into_response()
}
