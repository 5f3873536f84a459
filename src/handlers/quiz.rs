// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        question::PublicQuestion,
        session::{AnswerRequest, OpenSessionRequest, OpenSessionResponse, SessionId},
    },
    services::catalog::QuestionCatalog,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CategoryParams {
    pub q: Option<String>,
}

/// Lists categories matching the typed prefix (autocomplete).
pub async fn list_categories(
    State(catalog): State<Arc<QuestionCatalog>>,
    Query(params): Query<CategoryParams>,
) -> impl IntoResponse {
    Json(catalog.suggest_categories(params.q.as_deref().unwrap_or_default()))
}

/// Picks a random question for the user and opens a timed session.
///
/// * 404 when no question matches the filters.
/// * 409 when the user still has a session open.
pub async fn open_session(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let question = state
        .catalog
        .select_random(req.category.as_deref(), req.difficulty.as_deref())
        .ok_or_else(|| {
            AppError::NotFound("No questions available with those filters".to_string())
        })?;

    let handle = state
        .arbiter
        .open(question, &req.user_id, state.config.answer_timeout)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OpenSessionResponse {
            session_id: handle.id(),
            question: PublicQuestion::from(handle.question().as_ref()),
            expires_at: handle.expires_at(),
            timeout_secs: state.config.answer_timeout.as_secs(),
        }),
    ))
}

/// Returns the message as currently rendered for the session, open or
/// finished.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Result<impl IntoResponse, AppError> {
    let message = state
        .board
        .message(&session_id)
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    Ok(Json(message))
}

/// Applies a selection to an open session.
///
/// Late, foreign and out-of-range selections are reported in the body, not
/// as errors.
pub async fn answer(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state
        .arbiter
        .find(&session_id)
        .ok_or_else(|| AppError::NotFound("Session not found or already finished".to_string()))?;

    let submission = state
        .arbiter
        .submit(&handle, &req.user_id, req.selected_index)
        .await;

    Ok(Json(submission))
}

/// Re-reads the question pack without restarting.
pub async fn reload(State(catalog): State<Arc<QuestionCatalog>>) -> impl IntoResponse {
    Json(catalog.reload().await)
}
