// src/models/score.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'quiz_scores' table, and one entry of the JSON score file.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub user_id: String,
    pub score: i64,
}

/// A row of a ranking snapshot. `position` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub position: usize,
    pub user_id: String,
    pub score: i64,
}

/// Where a user stands in the full ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Rank {
    Ranked { position: usize, score: i64 },
    /// The user has no score record at all.
    NotRanked,
}

/// Top of the leaderboard plus the requesting user's own rank.
#[derive(Debug, Clone, Serialize)]
pub struct Standings {
    pub top: Vec<RankedEntry>,
    pub viewer: Rank,
}
