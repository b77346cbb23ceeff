use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::AppState;

pub mod health;
pub mod sessions;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/sessions", post(sessions::create_session))
        .route("/api/sessions/:id", get(sessions::get_session))
        .route("/api/sessions/:id/start", post(sessions::start_session))
        .route("/api/sessions/:id/answer", patch(sessions::answer_question))
        .route("/api/sessions/:id/next", post(sessions::next_question))
        .route("/api/sessions/:id/previous", post(sessions::previous_question))
        .route("/api/sessions/:id/submit", post(sessions::submit_session))
        .route("/api/sessions/:id/cancel", post(sessions::cancel_session))
        .route("/api/sessions/:id/result", get(sessions::get_result))
}
