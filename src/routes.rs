// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{health, quiz, ranking},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Keep-alive probe at `/`.
/// * Quiz sessions, categories and reload under `/api/quiz`.
/// * Leaderboard and per-user standings under `/api/quiz`.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/categories", get(quiz::list_categories))
        .route("/sessions", post(quiz::open_session))
        .route("/sessions/{id}", get(quiz::get_session))
        .route("/sessions/{id}/answer", post(quiz::answer))
        .route("/reload", post(quiz::reload))
        .route("/leaderboard", get(ranking::get_leaderboard))
        .route("/rank/{user_id}", get(ranking::get_rank));

    Router::new()
        .route("/", get(health::keep_alive))
        .nest("/api/quiz", quiz_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
