use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::session_dto::{AnswerRequest, CreateSessionRequest, SessionView};
use crate::error::Result;
use crate::services::result_service::ResultReport;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse> {
    req.validate()?;
    let (test_id, employee_id) = req.ids();
    let view = state.sessions.create_session(test_id, employee_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    Ok(Json(state.sessions.view(id)?))
}

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    Ok(Json(state.sessions.start(id)?))
}

#[axum::debug_handler]
pub async fn answer_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<SessionView>> {
    req.validate()?;
    Ok(Json(state.sessions.answer(id, &req)?))
}

#[axum::debug_handler]
pub async fn next_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    Ok(Json(state.sessions.next(id)?))
}

#[axum::debug_handler]
pub async fn previous_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    Ok(Json(state.sessions.previous(id)?))
}

/// Submits the attempt, or retries a delivery that failed earlier.
#[axum::debug_handler]
pub async fn submit_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResultReport>> {
    tracing::info!(session_id = %id, "Submit requested");
    Ok(Json(state.sessions.submit(id).await?))
}

#[axum::debug_handler]
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    Ok(Json(state.sessions.cancel(id)?))
}

#[axum::debug_handler]
pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResultReport>> {
    Ok(Json(state.sessions.result(id)?))
}
