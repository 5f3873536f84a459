// src/handlers/ranking.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use std::sync::Arc;

use serde::Deserialize;

use crate::{config::Config, error::AppError, services::ranking::RankingProjector};

/// Upper bound on `limit` to keep responses small.
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct RankingParams {
    pub limit: Option<usize>,
}

impl RankingParams {
    fn limit_or(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).min(MAX_LIMIT)
    }
}

/// Retrieves the top players.
pub async fn get_leaderboard(
    State(ranking): State<Arc<RankingProjector>>,
    State(config): State<Config>,
    Query(params): Query<RankingParams>,
) -> Result<impl IntoResponse, AppError> {
    let k = params.limit_or(config.max_ranking_players);
    let leaderboard = ranking.top_k(k).await.map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(leaderboard))
}

/// Top players plus the given user's own position, even outside the top.
pub async fn get_rank(
    State(ranking): State<Arc<RankingProjector>>,
    State(config): State<Config>,
    Path(user_id): Path<String>,
    Query(params): Query<RankingParams>,
) -> Result<impl IntoResponse, AppError> {
    let k = params.limit_or(config.max_ranking_players);
    let standings = ranking.standings(&user_id, k).await?;

    Ok(Json(standings))
}
