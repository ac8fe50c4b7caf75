use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub gateway: &'static str,
    pub cached_queries: usize,
    pub vote_polling: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let cached_queries = state.forum.cache().keys().await.len();
    Json(HealthResponse {
        status: "ok",
        gateway: state.gateway_mode.as_str(),
        cached_queries,
        vote_polling: state.config.vote_poll_interval.as_secs() > 0,
    })
}
