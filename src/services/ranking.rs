// src/services/ranking.rs

use std::sync::Arc;

use crate::{
    models::score::{Rank, RankedEntry, ScoreRecord, Standings},
    services::ledger::{LedgerError, ScoreLedger},
};

/// Orders records by score, highest first. The sort is stable, so equal
/// scores keep the ledger's first-seen order.
pub fn rank_records(mut records: Vec<ScoreRecord>) -> Vec<RankedEntry> {
    records.sort_by(|a, b| b.score.cmp(&a.score));
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| RankedEntry {
            position: i + 1,
            user_id: record.user_id,
            score: record.score,
        })
        .collect()
}

/// Read-only leaderboard views derived from the ledger.
pub struct RankingProjector {
    ledger: Arc<ScoreLedger>,
}

impl RankingProjector {
    pub fn new(ledger: Arc<ScoreLedger>) -> Self {
        Self { ledger }
    }

    /// The complete ranking.
    pub async fn snapshot(&self) -> Result<Vec<RankedEntry>, LedgerError> {
        Ok(rank_records(self.ledger.all().await?))
    }

    /// First `k` entries; fewer when the ledger holds fewer users.
    pub async fn top_k(&self, k: usize) -> Result<Vec<RankedEntry>, LedgerError> {
        let mut ranking = self.snapshot().await?;
        ranking.truncate(k);
        Ok(ranking)
    }

    /// Position of `user_id` in the full ranking, or `NotRanked` if the user
    /// has no record.
    pub async fn rank_of(&self, user_id: &str) -> Result<Rank, LedgerError> {
        Ok(find_rank(&self.snapshot().await?, user_id))
    }

    /// Top `k` plus the viewer's own rank, from one consistent snapshot.
    pub async fn standings(&self, user_id: &str, k: usize) -> Result<Standings, LedgerError> {
        let mut ranking = self.snapshot().await?;
        let viewer = find_rank(&ranking, user_id);
        ranking.truncate(k);
        Ok(Standings {
            top: ranking,
            viewer,
        })
    }
}

fn find_rank(ranking: &[RankedEntry], user_id: &str) -> Rank {
    ranking
        .iter()
        .find(|e| e.user_id == user_id)
        .map(|e| Rank::Ranked {
            position: e.position,
            score: e.score,
        })
        .unwrap_or(Rank::NotRanked)
}
