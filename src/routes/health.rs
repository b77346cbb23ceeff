use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> crate::error::Result<impl IntoResponse> {
    let body = json!({
        "status": "ok",
        "sessions": state.sessions.len()?,
    });
    Ok((StatusCode::OK, Json(body)))
}
