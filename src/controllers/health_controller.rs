use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn health_db(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "store: ok".to_string()),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, format!("store error: {e}")),
    }
}
