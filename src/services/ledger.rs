// src/services/ledger.rs

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::score::ScoreRecord;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("score store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("score database failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for cumulative scores, keyed by user id.
///
/// `add` must be durable before it returns. `all` returns records in
/// first-seen order, which is the tie-break order of the ranking.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<i64>, LedgerError>;

    /// Adds `points` to the user's score, creating the record at 0 first if
    /// needed. Returns the new total.
    async fn add(&self, user_id: &str, points: u32) -> Result<i64, LedgerError>;

    async fn all(&self) -> Result<Vec<ScoreRecord>, LedgerError>;
}

/// Cumulative per-user scores. All mutation goes through [`ScoreLedger::increment`].
pub struct ScoreLedger {
    store: Arc<dyn ScoreStore>,
    writer: Mutex<()>,
}

impl ScoreLedger {
    pub fn new(store: Arc<dyn ScoreStore>) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    /// Atomically adds `points` and returns the committed total.
    ///
    /// Increments are serialized in-process so read-modify-write stores never
    /// lose an update, whichever user they belong to.
    pub async fn increment(&self, user_id: &str, points: u32) -> Result<i64, LedgerError> {
        let _guard = self.writer.lock().await;
        let total = self.store.add(user_id, points).await?;
        tracing::info!("Score for {} is now {} (+{})", user_id, total, points);
        Ok(total)
    }

    /// Current score; 0 when the user has no record.
    pub async fn get(&self, user_id: &str) -> Result<i64, LedgerError> {
        Ok(self.store.get(user_id).await?.unwrap_or(0))
    }

    /// Whether the user has ever been recorded, as opposed to holding 0.
    pub async fn contains(&self, user_id: &str) -> Result<bool, LedgerError> {
        Ok(self.store.get(user_id).await?.is_some())
    }

    /// Snapshot of every record, in first-seen order.
    pub async fn all(&self) -> Result<Vec<ScoreRecord>, LedgerError> {
        self.store.all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::score_store::MemoryScoreStore;

    fn ledger() -> Arc<ScoreLedger> {
        Arc::new(ScoreLedger::new(Arc::new(MemoryScoreStore::default())))
    }

    #[tokio::test]
    async fn test_absent_user_scores_zero() {
        let ledger = ledger();
        assert_eq!(ledger.get("nobody").await.unwrap(), 0);
        assert!(!ledger.contains("nobody").await.unwrap());
    }

    #[tokio::test]
    async fn test_increment_returns_running_total() {
        let ledger = ledger();
        assert_eq!(ledger.increment("u1", 2).await.unwrap(), 2);
        assert_eq!(ledger.increment("u1", 5).await.unwrap(), 7);
        assert_eq!(ledger.get("u1").await.unwrap(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let ledger = ledger();
        let mut tasks = Vec::new();
        for i in 0..40_u32 {
            let ledger = Arc::clone(&ledger);
            let user = format!("u{}", i % 4);
            tasks.push(tokio::spawn(async move {
                ledger.increment(&user, 1 + i % 3).await.unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let mut expected = [0_i64; 4];
        for i in 0..40_u32 {
            expected[(i % 4) as usize] += i64::from(1 + i % 3);
        }
        for (n, want) in expected.iter().enumerate() {
            assert_eq!(ledger.get(&format!("u{}", n)).await.unwrap(), *want);
        }
    }
}
